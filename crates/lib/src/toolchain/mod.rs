//! External toolchain invocation.
//!
//! The orchestrator talks to the compiler only through the [`Toolchain`]
//! trait; [`GoToolchain`] is the process-backed implementation.

pub mod go;

use std::future::Future;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::platform::Target;
use crate::resolve::BuildPlan;

pub use go::GoToolchain;

/// Errors from a single toolchain invocation.
#[derive(Debug, Error)]
pub enum ToolchainError {
  /// The compiler process could not be started.
  #[error("failed to start {program} for {target} in {}: {source}", work_dir.display())]
  Spawn {
    program: String,
    target: Target,
    work_dir: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// The compiler ran and reported failure.
  ///
  /// `output` is the captured stdout followed by the captured stderr, each
  /// verbatim. The two streams are read separately, so lines written to both
  /// are not interleaved in the order the compiler produced them.
  #[error("build failed for {target} in {}: {reason}\n{output}", work_dir.display())]
  Failed {
    target: Target,
    work_dir: PathBuf,
    reason: String,
    output: String,
  },

  /// The run was cancelled before or during the compile.
  #[error("build cancelled for {target}")]
  Cancelled { target: Target },
}

impl ToolchainError {
  pub fn is_cancelled(&self) -> bool {
    matches!(self, Self::Cancelled { .. })
  }

  /// Captured compiler output, if the compiler got far enough to produce any.
  pub fn output(&self) -> Option<&str> {
    match self {
      Self::Failed { output, .. } => Some(output),
      _ => None,
    }
  }
}

/// Compiles the project for one target.
///
/// Implementations must be safe to share between workers. A call either
/// leaves the artifact at `output` and returns `Ok`, or returns an error
/// describing why not; callers never retry.
pub trait Toolchain: Send + Sync + 'static {
  /// Program name shown in verbose command lines.
  fn program(&self) -> &str;

  fn invoke(
    &self,
    cancel: &CancellationToken,
    work_dir: &Path,
    target: &Target,
    output: &Path,
    plan: &BuildPlan,
  ) -> impl Future<Output = Result<(), ToolchainError>> + Send;
}

/// Full argument list for a build: `build <flags...> -o <output> .`
pub fn build_args(plan: &BuildPlan, output: &Path) -> Vec<String> {
  let mut args = Vec::with_capacity(plan.flags.len() + 4);
  args.push("build".to_string());
  args.extend(plan.flags.iter().cloned());
  args.push("-o".to_string());
  args.push(output.to_string_lossy().to_string());
  args.push(".".to_string());
  args
}

/// Human-readable command line, for verbose output.
pub fn command_line(program: &str, plan: &BuildPlan, output: &Path) -> String {
  let args = build_args(plan, output)
    .into_iter()
    .map(|arg| if arg.contains(' ') { format!("\"{}\"", arg) } else { arg })
    .collect::<Vec<_>>();
  format!("{} {}", program, args.join(" "))
}
