//! Types for a build run: options, per-target results, the run report,
//! progress events and errors.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::artifact::{Compression, ProcessedArtifact};
use crate::config::{BuildConfig, BuildStrategy};
use crate::consts::{DEFAULT_OUTPUT_DIR, NOT_AVAILABLE};
use crate::platform::{Target, default_matrix};
use crate::project::ProjectError;
use crate::util::size::size_label;
use crate::version::VersionSource;

/// Outcome of one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildStatus {
  Success,
  Failed,
  /// Never started because the run was halted (stop-on-error or cancellation).
  Skipped,
}

/// The single result row produced for each target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildResult {
  pub target: Target,
  /// Final artifact file name, including any compression suffix.
  pub file_name: String,
  pub size: Option<u64>,
  pub sha256: Option<String>,
  pub status: BuildStatus,
  /// Full diagnostic text for failed targets.
  pub error: Option<String>,
}

impl BuildResult {
  pub fn succeeded(target: Target, artifact: ProcessedArtifact) -> Self {
    Self {
      target,
      file_name: artifact.file_name,
      size: artifact.size,
      sha256: artifact.digests.map(|d| d.sha256),
      status: BuildStatus::Success,
      error: None,
    }
  }

  pub fn failed(target: Target, file_name: String, error: impl Into<String>) -> Self {
    Self {
      target,
      file_name,
      size: None,
      sha256: None,
      status: BuildStatus::Failed,
      error: Some(error.into()),
    }
  }

  pub fn skipped(target: Target, file_name: String) -> Self {
    Self {
      target,
      file_name,
      size: None,
      sha256: None,
      status: BuildStatus::Skipped,
      error: None,
    }
  }

  pub fn is_success(&self) -> bool {
    self.status == BuildStatus::Success
  }

  /// `"<human> (<bytes>)"` or `n/a`.
  pub fn size_display(&self) -> String {
    self.size.map(size_label).unwrap_or_else(|| NOT_AVAILABLE.to_string())
  }

  /// Full SHA-256 hex or `n/a`.
  pub fn sha256_display(&self) -> &str {
    self.sha256.as_deref().unwrap_or(NOT_AVAILABLE)
  }
}

/// Everything a run needs, assembled once by the caller.
#[derive(Debug, Clone)]
pub struct BuildOptions {
  /// Directory the user pointed at; the project root is discovered from here.
  pub target_dir: PathBuf,
  /// Build the full default matrix instead of the host platform only.
  pub all: bool,
  /// Explicit matrix, overriding `all`.
  pub targets: Option<Vec<Target>>,
  /// Project name override.
  pub name: Option<String>,
  /// Output root; relative paths are resolved against the project root.
  pub output_dir: PathBuf,
  /// Version tag override, used verbatim.
  pub version_override: Option<String>,
  pub config: BuildConfig,
  /// Keep an existing `<output-dir>/<tag>` instead of removing it first.
  pub skip_cleanup: bool,
  /// Stop starting new targets after the first failure.
  pub stop_on_error: bool,
  /// Worker count; 0 is treated as 1.
  pub parallelism: usize,
  pub compression: Option<Compression>,
  pub checksums: bool,
  /// Raw flag snapshot recorded in the metadata document.
  pub flags: serde_json::Value,
}

impl Default for BuildOptions {
  fn default() -> Self {
    Self {
      target_dir: PathBuf::from("."),
      all: false,
      targets: None,
      name: None,
      output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
      version_override: None,
      config: BuildConfig::default(),
      skip_cleanup: false,
      stop_on_error: false,
      parallelism: default_parallelism(),
      compression: None,
      checksums: true,
      flags: serde_json::Value::Object(Default::default()),
    }
  }
}

impl BuildOptions {
  /// Targets to build, in submission order.
  pub fn matrix(&self) -> Vec<Target> {
    match &self.targets {
      Some(targets) => targets.clone(),
      None if self.all => default_matrix(),
      None => vec![Target::current()],
    }
  }

  pub fn worker_count(&self) -> usize {
    self.parallelism.max(1)
  }
}

/// Number of CPUs, used as the default worker count.
pub fn default_parallelism() -> usize {
  std::thread::available_parallelism().map(|p| p.get()).unwrap_or(4)
}

/// Aggregated outcome of a run.
#[derive(Debug, Clone)]
pub struct BuildReport {
  pub project_name: String,
  pub version: String,
  /// `<output-dir>/<version>`
  pub version_dir: PathBuf,
  /// Configuration after escalation and defaults were applied.
  pub config: BuildConfig,
  pub started_at: DateTime<Utc>,
  pub duration: Duration,
  /// One row per target, in completion order.
  pub results: Vec<BuildResult>,
  /// Where the metadata document was written, if it was.
  pub metadata_path: Option<PathBuf>,
}

impl BuildReport {
  pub fn total(&self) -> usize {
    self.results.len()
  }

  pub fn success_count(&self) -> usize {
    self.results.iter().filter(|r| r.is_success()).count()
  }

  /// Failed and skipped targets.
  pub fn fail_count(&self) -> usize {
    self.total() - self.success_count()
  }

  pub fn is_success(&self) -> bool {
    self.fail_count() == 0
  }

  /// File names of successful artifacts.
  pub fn artifacts(&self) -> Vec<String> {
    self
      .results
      .iter()
      .filter(|r| r.is_success())
      .map(|r| r.file_name.clone())
      .collect()
  }
}

/// Progress notifications emitted during a run.
#[derive(Debug, Clone)]
pub enum BuildEvent {
  /// Setup is done and dispatch is about to start.
  Prepared {
    project_name: String,
    version: String,
    version_source: VersionSource,
    version_dir: PathBuf,
    config: BuildConfig,
    targets: Vec<Target>,
    workers: usize,
  },
  /// A position-independent build forced native interop on.
  StrategyEscalated { from: BuildStrategy, to: BuildStrategy },
  /// A worker picked up a target.
  TargetStarted {
    worker: usize,
    target: Target,
    output: PathBuf,
    command: String,
  },
  /// A worker finished a target.
  TargetFinished { worker: usize, result: BuildResult },
}

/// Receives [`BuildEvent`]s. Called concurrently from every worker.
pub trait BuildObserver: Send + Sync {
  fn notify(&self, event: &BuildEvent);
}

/// Observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl BuildObserver for NoopObserver {
  fn notify(&self, _event: &BuildEvent) {}
}

pub type SharedObserver = Arc<dyn BuildObserver>;

/// Fatal errors that abort a run before any result is produced.
#[derive(Debug, Error)]
pub enum RunError {
  #[error("failed to resolve target directory: {0}")]
  TargetDir(#[source] ProjectError),

  #[error("failed to resolve output directory {}: {source}", path.display())]
  OutputDirPath {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to create output directory {}: {source}", path.display())]
  CreateOutputDir {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// The tag would not name a single directory below the output root.
  #[error("version tag {tag:?} is not usable as a directory name")]
  InvalidVersionTag { tag: String },

  #[error("refusing to clear {}: it resolves outside {}", path.display(), root.display())]
  OutputOutsideRoot { path: PathBuf, root: PathBuf },
}
