//! Build targets and artifact naming.
//!
//! A [`Target`] is an immutable (os, arch) pair expressed in the toolchain's own
//! vocabulary (`darwin`, `amd64`, ...), not Rust's.

pub mod arch;
pub mod os;

use std::fmt;

use serde::{Deserialize, Serialize};

/// One (operating system, CPU architecture) pair to build for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
  pub os: String,
  pub arch: String,
}

impl Target {
  pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
    Self {
      os: os.into(),
      arch: arch.into(),
    }
  }

  /// The platform this process runs on, in toolchain vocabulary.
  ///
  /// Falls back to Rust's own identifiers when the toolchain has no name for them;
  /// the toolchain then reports the unsupported pair itself.
  pub fn current() -> Self {
    Self::new(
      os::host_os().unwrap_or(std::env::consts::OS),
      arch::host_arch().unwrap_or(std::env::consts::ARCH),
    )
  }

  /// `"os/arch"` label used in reports.
  pub fn label(&self) -> String {
    format!("{}/{}", self.os, self.arch)
  }

  /// Whether artifacts for this target keep the bare project name.
  fn is_primary(&self) -> bool {
    self.arch == "amd64" && (self.os == "linux" || self.os == os::WINDOWS)
  }

  /// File name of the artifact produced for this target.
  ///
  /// Primary targets (linux/amd64, windows/amd64) use the bare project name;
  /// everything else is `<project>-<arch>-<os>`. Windows artifacts get `.exe`.
  pub fn output_name(&self, project: &str) -> String {
    let suffix = os::exe_suffix(&self.os);
    if self.is_primary() {
      format!("{}{}", project, suffix)
    } else {
      format!("{}-{}-{}{}", project, self.arch, self.os, suffix)
    }
  }
}

impl fmt::Display for Target {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}", self.os, self.arch)
  }
}

/// The predefined matrix used by `--all`.
const DEFAULT_MATRIX: &[(&str, &str)] = &[
  ("linux", "amd64"),
  ("linux", "arm64"),
  ("linux", "riscv64"),
  ("windows", "amd64"),
  ("windows", "arm64"),
  ("darwin", "amd64"),
  ("darwin", "arm64"),
  ("freebsd", "amd64"),
  ("freebsd", "arm64"),
  ("freebsd", "riscv64"),
  ("openbsd", "amd64"),
  ("openbsd", "arm64"),
  ("openbsd", "riscv64"),
  ("netbsd", "amd64"),
  ("netbsd", "arm64"),
];

/// Returns the default target matrix.
pub fn default_matrix() -> Vec<Target> {
  DEFAULT_MATRIX.iter().map(|(os, arch)| Target::new(*os, *arch)).collect()
}
