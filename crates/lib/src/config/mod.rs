//! Build configuration.
//!
//! [`BuildConfig`] is the global, immutable configuration snapshot for one run.
//! It is assembled once by the caller, adjusted once by the orchestrator
//! (strategy escalation, default link flags, module mode) and then cloned into
//! every worker.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Sentinel build mode resolved to [`BUILD_MODE_EXE`].
pub const BUILD_MODE_AUTO: &str = "auto";

/// Plain executable build mode.
pub const BUILD_MODE_EXE: &str = "exe";

/// Position-independent executable build mode. Requires native interop.
pub const BUILD_MODE_PIE: &str = "pie";

/// Policy controlling whether native interop is permitted and how static
/// linking is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BuildStrategy {
  /// Interop stays enabled; network and user lookups are forced to pure implementations.
  #[serde(rename = "flexible")]
  PermissiveNativeInterop,
  /// Interop disabled and every pure-implementation tag set.
  #[default]
  #[serde(rename = "purego")]
  FullyStatic,
  /// Interop disabled through the environment only, without tags.
  #[serde(rename = "traditional")]
  EnvironmentDisabledInterop,
}

impl BuildStrategy {
  /// Parse a strategy name.
  ///
  /// Never fails: unrecognized names resolve to [`BuildStrategy::FullyStatic`].
  pub fn parse(name: &str) -> Self {
    match name.trim().to_ascii_lowercase().as_str() {
      "flexible" => Self::PermissiveNativeInterop,
      "purego" => Self::FullyStatic,
      "traditional" => Self::EnvironmentDisabledInterop,
      other => {
        debug!(strategy = %other, "unrecognized strategy, using purego");
        Self::FullyStatic
      }
    }
  }

  /// The user-facing name of this strategy.
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::PermissiveNativeInterop => "flexible",
      Self::FullyStatic => "purego",
      Self::EnvironmentDisabledInterop => "traditional",
    }
  }

  /// Build tags implied by the strategy, in order.
  pub fn tags(&self) -> &'static [&'static str] {
    match self {
      Self::PermissiveNativeInterop => &["netgo", "osusergo"],
      Self::FullyStatic => &["purego", "netgo", "osusergo"],
      Self::EnvironmentDisabledInterop => &[],
    }
  }

  /// Whether native interop must be switched off in the environment.
  pub fn disables_interop(&self) -> bool {
    !matches!(self, Self::PermissiveNativeInterop)
  }
}

impl fmt::Display for BuildStrategy {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// CPU feature level per architecture family.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeatureLevels {
  pub amd64: String,
  pub arm64: String,
  pub arm: String,
  pub mips: String,
  pub ppc64: String,
  pub riscv64: String,
}

impl Default for FeatureLevels {
  fn default() -> Self {
    Self {
      amd64: "v2".to_string(),
      arm64: "v8.0".to_string(),
      arm: "7".to_string(),
      mips: "hardfloat".to_string(),
      ppc64: "power8".to_string(),
      riscv64: "rva20u64".to_string(),
    }
  }
}

/// How the toolchain resolves packages in the working directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleMode {
  /// A module descriptor is present.
  #[default]
  Module,
  /// No module descriptor; legacy path-based resolution is forced.
  Legacy,
}

/// Global build configuration for one run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildConfig {
  pub strategy: BuildStrategy,
  pub levels: FeatureLevels,
  /// Requested build mode, possibly [`BUILD_MODE_AUTO`].
  pub build_mode: String,
  /// Extra comma-separated build tags, appended after the strategy tags.
  pub tags: String,
  /// Link flags. Empty means "use the orchestrator default".
  pub ldflags: String,
  /// Extra whitespace-separated compiler flags. Empty means `-trimpath`.
  pub build_flags: String,
  pub verbose: bool,
  pub clean_cache: bool,
  pub module_mode: ModuleMode,
}

impl Default for BuildConfig {
  fn default() -> Self {
    Self {
      strategy: BuildStrategy::default(),
      levels: FeatureLevels::default(),
      build_mode: BUILD_MODE_AUTO.to_string(),
      tags: String::new(),
      ldflags: String::new(),
      build_flags: String::new(),
      verbose: false,
      clean_cache: false,
      module_mode: ModuleMode::default(),
    }
  }
}

/// Resolve the `auto` sentinel to a concrete build mode.
pub fn resolve_build_mode(requested: &str) -> &str {
  if requested == BUILD_MODE_AUTO {
    BUILD_MODE_EXE
  } else {
    requested
  }
}

impl BuildConfig {
  /// The build mode the toolchain will actually receive.
  pub fn effective_build_mode(&self) -> &str {
    resolve_build_mode(&self.build_mode)
  }

  /// Apply the build-mode/strategy escalation rule.
  ///
  /// A position-independent executable needs native interop, so a
  /// [`BuildStrategy::FullyStatic`] request is escalated to
  /// [`BuildStrategy::PermissiveNativeInterop`]. Returns the adjusted
  /// configuration and whether an escalation happened.
  pub fn escalate(mut self) -> (Self, bool) {
    let escalate =
      self.effective_build_mode() == BUILD_MODE_PIE && self.strategy == BuildStrategy::FullyStatic;
    if escalate {
      self.strategy = BuildStrategy::PermissiveNativeInterop;
    }
    (self, escalate)
  }

  /// Fill in the default link flags, stamping the version tag into the binary.
  pub fn with_default_ldflags(mut self, version_tag: &str) -> Self {
    if self.ldflags.trim().is_empty() {
      self.ldflags = format!("-s -w -X main.appVersion={}", version_tag);
    }
    self
  }

  pub fn with_module_mode(mut self, module_mode: ModuleMode) -> Self {
    self.module_mode = module_mode;
    self
  }
}
