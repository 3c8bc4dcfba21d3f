//! Test utilities for pbuild-lib.
//!
//! Fake toolchains (in-process and as shell scripts) and repository fixtures.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::platform::Target;
use crate::resolve::BuildPlan;
use crate::toolchain::{Toolchain, ToolchainError};

/// In-process toolchain: writes the target label to the output path and
/// fails for any target whose arch is listed in `failing`.
pub struct FakeToolchain {
  failing: Vec<&'static str>,
  delay: Duration,
  calls: AtomicUsize,
  plans: Mutex<Vec<(Target, BuildPlan)>>,
}

impl FakeToolchain {
  pub fn new(failing: Vec<&'static str>) -> Self {
    Self {
      failing,
      delay: Duration::ZERO,
      calls: AtomicUsize::new(0),
      plans: Mutex::new(Vec::new()),
    }
  }

  pub fn with_delay(mut self, delay: Duration) -> Self {
    self.delay = delay;
    self
  }

  pub fn call_count(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }

  /// Plans received so far, in call order.
  pub fn plans(&self) -> Vec<(Target, BuildPlan)> {
    self.plans.lock().unwrap().clone()
  }
}

impl Toolchain for FakeToolchain {
  fn program(&self) -> &str {
    "fake-go"
  }

  async fn invoke(
    &self,
    cancel: &CancellationToken,
    work_dir: &Path,
    target: &Target,
    output: &Path,
    plan: &BuildPlan,
  ) -> Result<(), ToolchainError> {
    if cancel.is_cancelled() {
      return Err(ToolchainError::Cancelled { target: target.clone() });
    }
    self.calls.fetch_add(1, Ordering::SeqCst);
    self.plans.lock().unwrap().push((target.clone(), plan.clone()));
    if !self.delay.is_zero() {
      tokio::time::sleep(self.delay).await;
    }
    if self.failing.contains(&target.arch.as_str()) {
      return Err(ToolchainError::Failed {
        target: target.clone(),
        work_dir: work_dir.to_path_buf(),
        reason: "exit status: 1".to_string(),
        output: "undefined: foo".to_string(),
      });
    }
    std::fs::write(output, target.label()).unwrap();
    Ok(())
  }
}

/// Shell body of a fake toolchain.
///
/// `clean` exits 0. `build` writes a small file to the path following `-o`,
/// recording the target environment so tests can check it was passed through.
#[cfg(unix)]
pub const FAKE_TOOLCHAIN: &str = r#"#!/bin/sh
if [ "$1" = "clean" ]; then
  exit 0
fi
out=""
while [ $# -gt 0 ]; do
  if [ "$1" = "-o" ]; then
    out="$2"
    shift
  fi
  shift
done
printf 'GOOS=%s GOARCH=%s CGO_ENABLED=%s\n' "$GOOS" "$GOARCH" "$CGO_ENABLED" > "$out"
"#;

/// Write an executable shell script into `dir` and return its path.
#[cfg(unix)]
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
  use std::os::unix::fs::PermissionsExt;

  let path = dir.join(name);
  std::fs::write(&path, body).unwrap();
  std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
  path
}

/// Initialise a git repository at `root` with one commit holding `main.go`.
///
/// Returns the full revision of `HEAD`.
pub fn init_repo(root: &Path) -> String {
  git(root, &["init", "-q"]);
  if !root.join("main.go").exists() {
    std::fs::write(root.join("main.go"), "package main\n").unwrap();
  }
  git(root, &["add", "."]);
  git(root, &["commit", "-q", "-m", "init"]);
  git_output(root, &["rev-parse", "HEAD"])
}

/// Whether a usable `git` binary is on PATH.
pub fn git_available() -> bool {
  std::process::Command::new("git")
    .arg("--version")
    .output()
    .map(|o| o.status.success())
    .unwrap_or(false)
}

fn git_command(dir: &Path, args: &[&str]) -> std::process::Command {
  let mut command = std::process::Command::new("git");
  command
    .args(args)
    .current_dir(dir)
    .env("GIT_AUTHOR_NAME", "test")
    .env("GIT_AUTHOR_EMAIL", "test@example.com")
    .env("GIT_COMMITTER_NAME", "test")
    .env("GIT_COMMITTER_EMAIL", "test@example.com");
  command
}

/// Run git in `dir`, panicking on failure.
pub fn git(dir: &Path, args: &[&str]) {
  let status = git_command(dir, args).status().unwrap();
  assert!(status.success(), "git {:?} failed", args);
}

/// Run git in `dir` and return its trimmed stdout, panicking on failure.
pub fn git_output(dir: &Path, args: &[&str]) -> String {
  let output = git_command(dir, args).output().unwrap();
  assert!(output.status.success(), "git {:?} failed", args);
  String::from_utf8_lossy(&output.stdout).trim().to_string()
}
