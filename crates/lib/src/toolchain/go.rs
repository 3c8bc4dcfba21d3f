//! Process-backed toolchain.
//!
//! Runs `<program> build ...` with the plan's environment layered over the
//! inherited one. The child is killed when the run's cancellation token fires.

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{Toolchain, ToolchainError, build_args};
use crate::platform::Target;
use crate::resolve::BuildPlan;

/// Default compiler program.
pub const DEFAULT_PROGRAM: &str = "go";

/// The Go compiler, or anything that accepts the same command line.
#[derive(Debug)]
pub struct GoToolchain {
  program: String,
  /// Cache cleaning happens at most once per toolchain instance.
  cache_cleaned: OnceCell<()>,
}

impl Default for GoToolchain {
  fn default() -> Self {
    Self::new(DEFAULT_PROGRAM)
  }
}

impl GoToolchain {
  pub fn new(program: impl Into<String>) -> Self {
    Self {
      program: program.into(),
      cache_cleaned: OnceCell::new(),
    }
  }

  /// Clear the persistent build cache, once.
  ///
  /// Best effort: every failure is logged and swallowed. Concurrent callers
  /// wait for the first one to finish.
  async fn clean_cache(&self, cancel: &CancellationToken, work_dir: &Path) {
    self
      .cache_cleaned
      .get_or_init(|| async {
        info!(program = %self.program, "cleaning build cache");
        let mut command = Command::new(&self.program);
        command
          .args(["clean", "-cache"])
          .current_dir(work_dir)
          .stdin(Stdio::null())
          .stdout(Stdio::null())
          .stderr(Stdio::null())
          .kill_on_drop(true);

        let status = tokio::select! {
          _ = cancel.cancelled() => return,
          status = command.status() => status,
        };
        match status {
          Ok(status) if status.success() => debug!("build cache cleaned"),
          Ok(status) => warn!(status = %status, "cache clean exited unsuccessfully"),
          Err(e) => warn!(error = %e, "failed to run cache clean"),
        }
      })
      .await;
  }
}

impl Toolchain for GoToolchain {
  fn program(&self) -> &str {
    &self.program
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

    if plan.clean_cache {
      self.clean_cache(cancel, work_dir).await;
    }

    let args = build_args(plan, output);
    let mut command = Command::new(&self.program);
    command
      .args(&args)
      .current_dir(work_dir)
      .envs(&plan.env)
      .stdin(Stdio::null())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .kill_on_drop(true);

    debug!(program = %self.program, platform = %target, args = ?args, "spawning toolchain");

    let child = command.spawn().map_err(|e| ToolchainError::Spawn {
      program: self.program.clone(),
      target: target.clone(),
      work_dir: work_dir.to_path_buf(),
      source: e,
    })?;

    // Dropping the wait future drops the child, which kills it.
    let result = tokio::select! {
      biased;
      _ = cancel.cancelled() => {
        warn!(platform = %target, "toolchain cancelled");
        return Err(ToolchainError::Cancelled { target: target.clone() });
      }
      result = child.wait_with_output() => result,
    };

    let out = result.map_err(|e| ToolchainError::Failed {
      target: target.clone(),
      work_dir: work_dir.to_path_buf(),
      reason: e.to_string(),
      output: String::new(),
    })?;

    if !out.status.success() {
      // stdout first, then stderr
      let mut combined = String::from_utf8_lossy(&out.stdout).to_string();
      combined.push_str(&String::from_utf8_lossy(&out.stderr));
      return Err(ToolchainError::Failed {
        target: target.clone(),
        work_dir: work_dir.to_path_buf(),
        reason: out.status.to_string(),
        output: combined,
      });
    }

    debug!(platform = %target, output = %output.display(), "toolchain finished");
    Ok(())
  }
}
