//! Project discovery: module root, VCS root, project name and `.gitignore` upkeep.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::consts::MODULE_DESCRIPTOR;

/// Errors from project discovery.
#[derive(Debug, Error)]
pub enum ProjectError {
  #[error("failed to resolve path {}: {source}", path.display())]
  Resolve {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to read {}: {source}", path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to update {}: {source}", path.display())]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Outcome of [`ensure_gitignore_entry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitignoreUpdate {
  /// The project has no `.gitignore`; nothing was touched.
  NoGitignore,
  /// The entry was already listed.
  AlreadyPresent,
  /// The entry was appended.
  Added,
}

/// Resolve `path` to an absolute, canonical directory.
pub fn absolute_dir(path: &Path) -> Result<PathBuf, ProjectError> {
  dunce::canonicalize(path).map_err(|e| ProjectError::Resolve {
    path: path.to_path_buf(),
    source: e,
  })
}

/// Nearest ancestor of `start` (inclusive) holding a `go.mod`.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
  start
    .ancestors()
    .find(|dir| dir.join(MODULE_DESCRIPTOR).is_file())
    .map(Path::to_path_buf)
}

/// Nearest ancestor of `start` (inclusive) holding a `.git` entry.
///
/// Linked worktrees and submodules have a `.git` file pointing at the real
/// git directory; it counts too.
pub fn find_vcs_root(start: &Path) -> Option<PathBuf> {
  start
    .ancestors()
    .find(|dir| dir.join(".git").exists())
    .map(Path::to_path_buf)
}

/// Last path segment of the `module` directive in `<root>/go.mod`.
pub fn module_name(root: &Path) -> Option<String> {
  let content = std::fs::read_to_string(root.join(MODULE_DESCRIPTOR)).ok()?;
  content.lines().find_map(|line| {
    let rest = line.trim().strip_prefix("module")?;
    if !rest.starts_with(char::is_whitespace) {
      return None;
    }
    let module = rest.split("//").next()?.trim().trim_matches('"');
    module
      .rsplit('/')
      .next()
      .filter(|segment| !segment.is_empty())
      .map(str::to_string)
  })
}

/// Project name from the module directive, falling back to the directory name.
pub fn infer_project_name(root: &Path) -> Option<String> {
  module_name(root).or_else(|| root.file_name().map(|name| name.to_string_lossy().to_string()))
}

/// Make sure `<root>/.gitignore` lists `entry` on a line of its own.
pub fn ensure_gitignore_entry(root: &Path, entry: &str) -> Result<GitignoreUpdate, ProjectError> {
  let path = root.join(".gitignore");
  if !path.is_file() {
    return Ok(GitignoreUpdate::NoGitignore);
  }

  let content = std::fs::read_to_string(&path).map_err(|e| ProjectError::Read {
    path: path.clone(),
    source: e,
  })?;
  if content.lines().any(|line| line.trim() == entry) {
    return Ok(GitignoreUpdate::AlreadyPresent);
  }

  let mut addition = String::new();
  if !content.is_empty() && !content.ends_with('\n') {
    addition.push('\n');
  }
  addition.push_str(entry);
  addition.push('\n');

  let write_err = |e| ProjectError::Write {
    path: path.clone(),
    source: e,
  };
  let mut file = OpenOptions::new().append(true).open(&path).map_err(write_err)?;
  file.write_all(addition.as_bytes()).map_err(write_err)?;

  Ok(GitignoreUpdate::Added)
}
