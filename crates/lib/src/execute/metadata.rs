//! The run-level metadata document, written once after all targets finish.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::BuildConfig;
use crate::consts::{METADATA_FILENAME, NOT_AVAILABLE};
use crate::platform::Target;

use super::types::BuildReport;

#[derive(Debug, Error)]
pub enum MetadataError {
  #[error("failed to serialize build metadata: {0}")]
  Serialize(#[from] serde_json::Error),

  #[error("failed to write {}: {source}", path.display())]
  Write {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to read {}: {source}", path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// Contents of `build-metadata.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildMetadata {
  pub project_name: String,
  pub version: String,
  pub build_time: DateTime<Utc>,
  pub build_duration: String,
  pub tool_version: String,
  pub build_host: String,
  pub build_user: String,
  pub build_os: String,
  pub build_arch: String,
  pub targets: Vec<Target>,
  pub build_config: BuildConfig,
  pub flags: serde_json::Value,
  pub artifacts: Vec<String>,
  pub success_count: usize,
  pub fail_count: usize,
}

impl BuildMetadata {
  /// Assemble the document for a finished run.
  pub fn from_report(report: &BuildReport, targets: Vec<Target>, flags: serde_json::Value) -> Self {
    let host = Target::current();
    Self {
      project_name: report.project_name.clone(),
      version: report.version.clone(),
      build_time: report.started_at,
      build_duration: humantime::format_duration(report.duration).to_string(),
      tool_version: env!("CARGO_PKG_VERSION").to_string(),
      build_host: whoami::fallible::hostname().unwrap_or_else(|_| NOT_AVAILABLE.to_string()),
      build_user: whoami::username(),
      build_os: host.os,
      build_arch: host.arch,
      targets,
      build_config: report.config.clone(),
      flags,
      artifacts: report.artifacts(),
      success_count: report.success_count(),
      fail_count: report.fail_count(),
    }
  }
}

/// Write `metadata` as pretty JSON into `dir`; returns the file path.
pub fn write_metadata(dir: &Path, metadata: &BuildMetadata) -> Result<PathBuf, MetadataError> {
  let path = dir.join(METADATA_FILENAME);
  let json = serde_json::to_string_pretty(metadata)?;
  std::fs::write(&path, json).map_err(|e| MetadataError::Write {
    path: path.clone(),
    source: e,
  })?;
  Ok(path)
}

pub fn read_metadata(path: &Path) -> Result<BuildMetadata, MetadataError> {
  let content = std::fs::read_to_string(path).map_err(|e| MetadataError::Read {
    path: path.to_path_buf(),
    source: e,
  })?;
  Ok(serde_json::from_str(&content)?)
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use super::*;
  use crate::execute::types::{BuildResult, BuildStatus};
  use tempfile::tempdir;

  fn report() -> BuildReport {
    BuildReport {
      project_name: "widget".to_string(),
      version: "1.2.3-abc1234".to_string(),
      version_dir: PathBuf::from("/out/1.2.3-abc1234"),
      config: BuildConfig::default(),
      started_at: Utc::now(),
      duration: Duration::from_millis(1500),
      results: vec![
        BuildResult {
          target: Target::new("linux", "amd64"),
          file_name: "widget".to_string(),
          size: Some(10),
          sha256: Some("ab".to_string()),
          status: BuildStatus::Success,
          error: None,
        },
        BuildResult::failed(Target::new("darwin", "arm64"), "widget-arm64-darwin".to_string(), "boom"),
      ],
      metadata_path: None,
    }
  }

  #[test]
  fn document_summarizes_report() {
    let targets = vec![Target::new("linux", "amd64"), Target::new("darwin", "arm64")];
    let metadata = BuildMetadata::from_report(&report(), targets.clone(), serde_json::json!({"all": true}));

    assert_eq!(metadata.project_name, "widget");
    assert_eq!(metadata.build_duration, "1s 500ms");
    assert_eq!(metadata.targets, targets);
    assert_eq!(metadata.artifacts, vec!["widget".to_string()]);
    assert_eq!(metadata.success_count, 1);
    assert_eq!(metadata.fail_count, 1);
    assert!(!metadata.build_user.is_empty());
  }

  #[test]
  fn written_document_uses_snake_case_fields() {
    let temp = tempdir().unwrap();
    let metadata = BuildMetadata::from_report(&report(), vec![], serde_json::json!({}));

    let path = write_metadata(temp.path(), &metadata).unwrap();
    assert_eq!(path, temp.path().join("build-metadata.json"));

    let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    for key in [
      "project_name",
      "version",
      "build_time",
      "build_duration",
      "tool_version",
      "build_host",
      "build_user",
      "build_os",
      "build_arch",
      "targets",
      "build_config",
      "flags",
      "artifacts",
      "success_count",
      "fail_count",
    ] {
      assert!(raw.get(key).is_some(), "missing {key}");
    }
    assert_eq!(raw["build_config"]["strategy"], "purego");

    assert_eq!(read_metadata(&path).unwrap(), metadata);
  }

  #[test]
  fn write_into_missing_dir_fails() {
    let temp = tempdir().unwrap();
    let metadata = BuildMetadata::from_report(&report(), vec![], serde_json::json!({}));
    let err = write_metadata(&temp.path().join("gone"), &metadata).unwrap_err();
    assert!(matches!(err, MetadataError::Write { .. }));
  }
}
