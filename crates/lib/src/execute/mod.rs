//! Build orchestration.
//!
//! [`run`] drives one multi-target build through its phases:
//! init, gitignore check, version resolution, output preparation, dispatch to
//! the worker pool, collection, and persisting the metadata document.
//!
//! Only setup failures abort a run ([`RunError`]). Per-target failures end up
//! in the report; best-effort steps log a warning and carry on.

pub mod metadata;
mod pool;
pub mod types;

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::artifact::PostProcessOptions;
use crate::config::ModuleMode;
use crate::consts::{FALLBACK_PROJECT_NAME, FALLBACK_VERSION, MODULE_DESCRIPTOR};
use crate::project::{
  GitignoreUpdate, absolute_dir, ensure_gitignore_entry, find_project_root, find_vcs_root, infer_project_name,
};
use crate::toolchain::Toolchain;
use crate::version::{ResolvedVersion, VersionSource, compose_version_tag, resolve_version_tag};

use pool::{Job, WorkerContext};

pub use metadata::{BuildMetadata, MetadataError, read_metadata, write_metadata};
pub use types::{
  BuildEvent, BuildObserver, BuildOptions, BuildReport, BuildResult, BuildStatus, NoopObserver, RunError,
  SharedObserver, default_parallelism,
};

/// Execute a full build run.
///
/// `cancel` covers the whole run: it is handed to every toolchain invocation
/// and stops new targets from starting. Targets that never started are
/// reported as [`BuildStatus::Skipped`].
pub async fn run<T: Toolchain>(
  options: &BuildOptions,
  toolchain: Arc<T>,
  observer: SharedObserver,
  cancel: CancellationToken,
) -> Result<BuildReport, RunError> {
  let started_at = Utc::now();
  let clock = Instant::now();

  // init
  let target_dir = absolute_dir(&options.target_dir).map_err(RunError::TargetDir)?;
  let project_root = find_project_root(&target_dir).unwrap_or_else(|| target_dir.clone());
  let vcs_root = find_vcs_root(&project_root).unwrap_or_else(|| project_root.clone());
  let module_mode = if project_root.join(MODULE_DESCRIPTOR).is_file() {
    ModuleMode::Module
  } else {
    ModuleMode::Legacy
  };
  let project_name = options
    .name
    .clone()
    .filter(|name| !name.trim().is_empty())
    .or_else(|| infer_project_name(&project_root))
    .unwrap_or_else(|| FALLBACK_PROJECT_NAME.to_string());
  debug!(
    project = %project_name,
    root = %project_root.display(),
    vcs_root = %vcs_root.display(),
    module_mode = ?module_mode,
    "project resolved"
  );

  let output_root = output_root(&project_root, &options.output_dir);

  // gitignore
  check_gitignore(&project_root, &options.output_dir);

  // version; the build's own output and gitignore edit do not make the tree dirty
  let dirty_exclusions = vec![output_root.clone(), project_root.join(".gitignore")];
  let version = resolve_version(
    options.version_override.clone(),
    project_root.clone(),
    vcs_root,
    dirty_exclusions,
  )
  .await;
  info!(version = %version.tag, source = ?version.source, "version resolved");

  // output
  let version_dir = prepare_output_dir(&output_root, &version.tag, options.skip_cleanup)?;

  // escalation happens once, before any plan is resolved
  let requested = options.config.strategy;
  let (config, escalated) = options.config.clone().escalate();
  if escalated {
    info!(from = %requested, to = %config.strategy, "position-independent build mode requires native interop");
    observer.notify(&BuildEvent::StrategyEscalated {
      from: requested,
      to: config.strategy,
    });
  }
  let config = config.with_default_ldflags(&version.tag).with_module_mode(module_mode);

  // dispatch
  let matrix = options.matrix();
  let workers = options.worker_count();
  observer.notify(&BuildEvent::Prepared {
    project_name: project_name.clone(),
    version: version.tag.clone(),
    version_source: version.source,
    version_dir: version_dir.clone(),
    config: config.clone(),
    targets: matrix.clone(),
    workers,
  });

  let jobs = matrix
    .iter()
    .enumerate()
    .map(|(index, target)| Job {
      index,
      target: target.clone(),
      output_name: target.output_name(&project_name),
    })
    .collect();
  let ctx = Arc::new(WorkerContext {
    toolchain,
    config: config.clone(),
    work_dir: project_root,
    version_dir: version_dir.clone(),
    post: PostProcessOptions {
      compression: options.compression,
      checksums: options.checksums,
    },
    observer,
    stop_on_error: options.stop_on_error,
    halt: cancel.child_token(),
    cancel,
  });
  info!(targets = matrix.len(), workers, "dispatching targets");

  // collect
  let results = pool::dispatch(ctx, jobs, workers).await;

  // report
  let mut report = BuildReport {
    project_name,
    version: version.tag,
    version_dir,
    config,
    started_at,
    duration: clock.elapsed(),
    results,
    metadata_path: None,
  };
  info!(
    total = report.total(),
    success = report.success_count(),
    failed = report.fail_count(),
    "build run complete"
  );

  // persist
  let metadata = BuildMetadata::from_report(&report, matrix, options.flags.clone());
  match write_metadata(&report.version_dir, &metadata) {
    Ok(path) => {
      debug!(path = %path.display(), "build metadata written");
      report.metadata_path = Some(path);
    }
    Err(e) => warn!(error = %e, "failed to write build metadata"),
  }

  Ok(report)
}

fn check_gitignore(project_root: &Path, output_dir: &Path) {
  if output_dir.is_absolute() {
    return;
  }
  let entry = format!("{}/", output_dir.to_string_lossy().trim_end_matches(['/', '\\']));
  match ensure_gitignore_entry(project_root, &entry) {
    Ok(GitignoreUpdate::Added) => info!(entry = %entry, "added output directory to .gitignore"),
    Ok(outcome) => debug!(?outcome, "gitignore unchanged"),
    Err(e) => warn!(error = %e, "failed to check .gitignore"),
  }
}

async fn resolve_version(
  version_override: Option<String>,
  project_root: PathBuf,
  vcs_root: PathBuf,
  dirty_exclusions: Vec<PathBuf>,
) -> ResolvedVersion {
  let resolved = tokio::task::spawn_blocking(move || {
    resolve_version_tag(version_override.as_deref(), &project_root, &vcs_root, &dirty_exclusions)
  })
  .await;
  match resolved {
    Ok(version) => version,
    Err(e) => {
      warn!(error = %e, "version resolution aborted, using fallback");
      ResolvedVersion {
        tag: compose_version_tag(FALLBACK_VERSION, None, false),
        source: VersionSource::Fallback,
      }
    }
  }
}

/// `<output-dir>`, resolved against the project root when relative.
fn output_root(project_root: &Path, output_dir: &Path) -> PathBuf {
  if output_dir.is_absolute() {
    output_dir.to_path_buf()
  } else {
    project_root.join(output_dir)
  }
}

/// A tag must be exactly one normal path segment.
fn validate_version_tag(tag: &str) -> Result<(), RunError> {
  let mut components = Path::new(tag).components();
  match (components.next(), components.next()) {
    (Some(Component::Normal(_)), None) => Ok(()),
    _ => Err(RunError::InvalidVersionTag { tag: tag.to_string() }),
  }
}

/// Create `<root>/<tag>`, clearing it first unless `skip_cleanup`.
fn prepare_output_dir(root: &Path, tag: &str, skip_cleanup: bool) -> Result<PathBuf, RunError> {
  validate_version_tag(tag)?;
  let version_dir = root.join(tag);

  if !skip_cleanup && version_dir.exists() {
    ensure_within(root, &version_dir)?;
    if let Err(e) = std::fs::remove_dir_all(&version_dir) {
      warn!(path = %version_dir.display(), error = %e, "failed to clear previous output");
    }
  }

  std::fs::create_dir_all(&version_dir).map_err(|e| RunError::CreateOutputDir {
    path: version_dir.clone(),
    source: e,
  })?;

  dunce::canonicalize(&version_dir).map_err(|e| RunError::OutputDirPath {
    path: version_dir,
    source: e,
  })
}

/// Fail unless `dir` resolves to a directory strictly below `root`.
fn ensure_within(root: &Path, dir: &Path) -> Result<(), RunError> {
  let resolved_root = dunce::canonicalize(root).map_err(|e| RunError::OutputDirPath {
    path: root.to_path_buf(),
    source: e,
  })?;
  let resolved = dunce::canonicalize(dir).map_err(|e| RunError::OutputDirPath {
    path: dir.to_path_buf(),
    source: e,
  })?;
  if resolved.starts_with(&resolved_root) && resolved != resolved_root {
    Ok(())
  } else {
    Err(RunError::OutputOutsideRoot {
      path: dir.to_path_buf(),
      root: root.to_path_buf(),
    })
  }
}
