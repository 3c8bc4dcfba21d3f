//! Repository metadata: short revision and working-tree state.

use std::path::{Component, Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::debug;

use crate::consts::SHORT_REVISION_LEN;

/// Abbreviated revision of `HEAD` in the repository at `vcs_root`.
///
/// `None` when there is no repository or `HEAD` does not point at a commit yet.
pub fn resolve_revision(vcs_root: &Path) -> Option<String> {
  let repo = gix::open(vcs_root)
    .map_err(|e| debug!(root = %vcs_root.display(), error = %e, "no readable repository"))
    .ok()?;
  let id = repo
    .head_id()
    .map_err(|e| debug!(root = %vcs_root.display(), error = %e, "failed to resolve HEAD"))
    .ok()?;

  Some(id.to_string().chars().take(SHORT_REVISION_LEN).collect())
}

/// Whether the working tree at `vcs_root` has uncommitted changes (untracked
/// files included) or its branch is behind its upstream.
///
/// Paths in `excluded` are left out of the change scan; pass the build output
/// directory and any file the build itself edits. Entries outside `vcs_root`
/// are ignored. Any failure to run `git` counts as clean.
pub fn is_working_tree_dirty(vcs_root: &Path, excluded: &[PathBuf]) -> bool {
  let mut args = vec!["status".to_string(), "--porcelain".to_string(), "--".to_string(), ":/".to_string()];
  args.extend(exclude_pathspecs(vcs_root, excluded));

  let status = match git_stdout(vcs_root, &args[..]) {
    Some(out) => out,
    None => return false,
  };
  if !status.trim().is_empty() {
    debug!(root = %vcs_root.display(), "working tree has uncommitted changes");
    return true;
  }

  let behind = git_stdout(vcs_root, &["rev-list", "--count", "HEAD..@{upstream}"])
    .and_then(|out| out.trim().parse::<u64>().ok())
    .unwrap_or(0);
  if behind > 0 {
    debug!(root = %vcs_root.display(), behind, "branch is behind upstream");
  }
  behind > 0
}

/// `:(top,exclude)<path>` for every excluded path inside the work tree.
fn exclude_pathspecs(vcs_root: &Path, excluded: &[PathBuf]) -> Vec<String> {
  excluded
    .iter()
    .filter_map(|path| {
      let relative = path.strip_prefix(vcs_root).ok()?;
      let segments = relative
        .components()
        .map(|c| match c {
          Component::Normal(segment) => Some(segment.to_string_lossy()),
          _ => None,
        })
        .collect::<Option<Vec<_>>>()?;
      if segments.is_empty() {
        return None;
      }
      Some(format!(":(top,exclude){}", segments.join("/")))
    })
    .collect()
}

/// Run git against exactly the repository at `vcs_root`; stdout on success.
fn git_stdout<S: AsRef<std::ffi::OsStr>>(vcs_root: &Path, args: &[S]) -> Option<String> {
  let output = Command::new("git")
    .arg("-C")
    .arg(vcs_root)
    .arg("--git-dir")
    .arg(vcs_root.join(".git"))
    .arg("--work-tree")
    .arg(vcs_root)
    .args(args)
    .stdin(Stdio::null())
    .output()
    .map_err(|e| debug!(error = %e, "failed to execute git"))
    .ok()?;

  if !output.status.success() {
    debug!(
      stderr = %String::from_utf8_lossy(&output.stderr).trim(),
      "git command failed"
    );
    return None;
  }
  Some(String::from_utf8_lossy(&output.stdout).into_owned())
}
