//! Version tag resolution.
//!
//! A tag is `<base>-<revision>[-dirty]`, where the base comes from the first
//! available of: an explicit override (used verbatim, no suffixes), a version
//! literal embedded in the Go sources, or [`FALLBACK_VERSION`].

mod embedded;
mod git;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::consts::{DIRTY_SUFFIX, FALLBACK_VERSION, UNKNOWN_REVISION};

pub use embedded::{discover_embedded_version, scan_source};
pub use git::{is_working_tree_dirty, resolve_revision};

/// Where the base of a version tag came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionSource {
  Override,
  Embedded,
  Fallback,
}

/// A resolved version tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVersion {
  pub tag: String,
  pub source: VersionSource,
}

/// Join base, revision and dirty marker.
pub fn compose_version_tag(base: &str, revision: Option<&str>, dirty: bool) -> String {
  let revision = revision.filter(|r| !r.is_empty()).unwrap_or(UNKNOWN_REVISION);
  let mut tag = format!("{base}-{revision}");
  if dirty {
    tag.push_str(DIRTY_SUFFIX);
  }
  tag
}

/// Resolve the version tag for a project.
///
/// `dirty_exclusions` are paths the dirty check skips (build output and files
/// the build touches). Blocking: walks the source tree and may run `git`.
pub fn resolve_version_tag(
  version_override: Option<&str>,
  project_root: &Path,
  vcs_root: &Path,
  dirty_exclusions: &[PathBuf],
) -> ResolvedVersion {
  if let Some(tag) = version_override.map(str::trim).filter(|t| !t.is_empty()) {
    return ResolvedVersion {
      tag: tag.to_string(),
      source: VersionSource::Override,
    };
  }

  let (base, source) = match discover_embedded_version(project_root) {
    Some(found) => (found, VersionSource::Embedded),
    None => {
      debug!(root = %project_root.display(), "no embedded version found, using fallback");
      (FALLBACK_VERSION.to_string(), VersionSource::Fallback)
    }
  };

  let revision = resolve_revision(vcs_root);
  let dirty = is_working_tree_dirty(vcs_root, dirty_exclusions);
  debug!(base = %base, revision = ?revision, dirty, "version components resolved");

  ResolvedVersion {
    tag: compose_version_tag(&base, revision.as_deref(), dirty),
    source,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::util::testutil::{git, git_available, init_repo};
  use tempfile::tempdir;

  #[test]
  fn compose_clean_and_dirty() {
    assert_eq!(compose_version_tag("1.1.19", Some("abc1234"), false), "1.1.19-abc1234");
    assert_eq!(compose_version_tag("1.1.19", Some("abc1234"), true), "1.1.19-abc1234-dirty");
  }

  #[test]
  fn compose_without_revision() {
    assert_eq!(compose_version_tag("2.0.0", None, false), "2.0.0-unknown");
    assert_eq!(compose_version_tag("2.0.0", Some(""), true), "2.0.0-unknown-dirty");
  }

  #[test]
  fn override_is_used_verbatim() {
    let temp = tempdir().unwrap();

    let resolved = resolve_version_tag(Some("v9.9.9"), temp.path(), temp.path(), &[]);
    assert_eq!(resolved.tag, "v9.9.9");
    assert_eq!(resolved.source, VersionSource::Override);
  }

  #[test]
  fn blank_override_is_ignored() {
    let temp = tempdir().unwrap();
    let resolved = resolve_version_tag(Some("  "), temp.path(), temp.path(), &[]);
    assert_eq!(resolved.source, VersionSource::Fallback);
  }

  #[test]
  fn fallback_with_revision_on_clean_tree() {
    if !git_available() {
      return;
    }
    let temp = tempdir().unwrap();
    let full = init_repo(temp.path());

    let resolved = resolve_version_tag(None, temp.path(), temp.path(), &[]);
    assert_eq!(resolved.tag, format!("{FALLBACK_VERSION}-{}", &full[..crate::consts::SHORT_REVISION_LEN]));
    assert_eq!(resolved.source, VersionSource::Fallback);
  }

  #[test]
  fn embedded_version_wins_over_fallback() {
    let temp = tempdir().unwrap();
    std::fs::write(temp.path().join("main.go"), "package main\n\nvar appVersion = \"3.4.5\"\n").unwrap();

    let resolved = resolve_version_tag(None, temp.path(), temp.path(), &[]);
    assert_eq!(resolved.tag, "3.4.5-unknown");
    assert_eq!(resolved.source, VersionSource::Embedded);
  }

  #[test]
  fn dirty_tree_gets_suffix() {
    if !git_available() {
      return;
    }
    let temp = tempdir().unwrap();
    git(temp.path(), &["init", "-q"]);
    std::fs::write(temp.path().join("README"), "hello\n").unwrap();
    git(temp.path(), &["add", "."]);
    git(temp.path(), &["commit", "-q", "-m", "init"]);
    std::fs::write(temp.path().join("README"), "changed\n").unwrap();

    let revision = resolve_revision(temp.path()).unwrap();
    let resolved = resolve_version_tag(None, temp.path(), temp.path(), &[]);
    assert_eq!(resolved.tag, format!("{FALLBACK_VERSION}-{revision}-dirty"));
  }
}
