//! Per-target build plan resolution.
//!
//! [`resolve`] turns a [`Target`] and a [`BuildConfig`] into a [`BuildPlan`]:
//! the compiler flags, merged build tags and environment overrides for one
//! invocation. It is a pure function; identical inputs give identical plans.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::{BuildConfig, FeatureLevels, ModuleMode};
use crate::platform::Target;

/// Environment variable selecting the target operating system.
pub const ENV_OS: &str = "GOOS";

/// Environment variable selecting the target architecture.
pub const ENV_ARCH: &str = "GOARCH";

/// Environment variable toggling native interop.
pub const ENV_INTEROP: &str = "CGO_ENABLED";

/// Environment variable forcing legacy (non-module) package resolution.
pub const ENV_MODULE_MODE: &str = "GO111MODULE";

/// Compiler flag used when no extra build flags are configured.
const DEFAULT_BUILD_FLAG: &str = "-trimpath";

/// Architecture family whose CPU feature level is configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FeatureFamily {
  Amd64,
  Arm64,
  Arm,
  Mips,
  Ppc64,
  Riscv64,
}

impl FeatureFamily {
  fn level(self, levels: &FeatureLevels) -> &str {
    match self {
      Self::Amd64 => &levels.amd64,
      Self::Arm64 => &levels.arm64,
      Self::Arm => &levels.arm,
      Self::Mips => &levels.mips,
      Self::Ppc64 => &levels.ppc64,
      Self::Riscv64 => &levels.riscv64,
    }
  }
}

/// Architecture -> (feature variable, family). Architectures not listed get no variable.
const ARCH_FEATURE_VARS: &[(&str, &str, FeatureFamily)] = &[
  ("amd64", "GOAMD64", FeatureFamily::Amd64),
  ("arm64", "GOARM64", FeatureFamily::Arm64),
  ("arm", "GOARM", FeatureFamily::Arm),
  ("mips", "GOMIPS", FeatureFamily::Mips),
  ("mipsle", "GOMIPS", FeatureFamily::Mips),
  ("ppc64", "GOPPC64", FeatureFamily::Ppc64),
  ("ppc64le", "GOPPC64", FeatureFamily::Ppc64),
  ("riscv64", "GORISCV64", FeatureFamily::Riscv64),
];

/// The CPU feature variable and its configured level for an architecture.
pub fn feature_variable<'a>(arch: &str, levels: &'a FeatureLevels) -> Option<(&'static str, &'a str)> {
  ARCH_FEATURE_VARS
    .iter()
    .find(|(name, _, _)| *name == arch)
    .map(|(_, var, family)| (*var, family.level(levels)))
}

/// Fully resolved toolchain invocation for one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildPlan {
  /// Compiler flags after the `build` subcommand, before `-o <output> <package>`.
  pub flags: Vec<String>,
  /// Concrete build mode (never `auto`).
  pub build_mode: String,
  /// Strategy tags followed by user tags, comma-joined. May be empty.
  pub tags: String,
  pub ldflags: String,
  /// Environment overrides layered on top of the inherited environment.
  pub env: BTreeMap<String, String>,
  /// Clear the toolchain's build cache before compiling.
  pub clean_cache: bool,
}

impl BuildPlan {
  /// Render the environment overrides as `KEY=value` pairs.
  pub fn env_display(&self) -> String {
    self
      .env
      .iter()
      .map(|(k, v)| format!("{}={}", k, v))
      .collect::<Vec<_>>()
      .join(" ")
  }
}

/// Merge strategy tags with comma-separated user tags.
///
/// Order is preserved and duplicates keep their first position.
pub fn merge_tags(strategy_tags: &[&str], user_tags: &str) -> String {
  let mut merged: Vec<&str> = Vec::new();
  let user = user_tags.split(',').map(str::trim);
  for tag in strategy_tags.iter().copied().chain(user) {
    if !tag.is_empty() && !merged.contains(&tag) {
      merged.push(tag);
    }
  }
  merged.join(",")
}

/// Resolve the build plan for one target.
///
/// Callers must apply [`BuildConfig::escalate`] first; this function takes
/// the strategy as given.
pub fn resolve(target: &Target, config: &BuildConfig) -> BuildPlan {
  let build_mode = config.effective_build_mode().to_string();
  let tags = merge_tags(config.strategy.tags(), &config.tags);
  let ldflags = config.ldflags.trim().to_string();

  let mut flags: Vec<String> = config.build_flags.split_whitespace().map(str::to_string).collect();
  if flags.is_empty() {
    flags.push(DEFAULT_BUILD_FLAG.to_string());
  }
  flags.push(format!("-buildmode={}", build_mode));
  if !tags.is_empty() {
    flags.push("-tags".to_string());
    flags.push(tags.clone());
  }
  if !ldflags.is_empty() {
    flags.push("-ldflags".to_string());
    flags.push(ldflags.clone());
  }

  let mut env = BTreeMap::new();
  env.insert(ENV_OS.to_string(), target.os.clone());
  env.insert(ENV_ARCH.to_string(), target.arch.clone());
  if config.strategy.disables_interop() {
    env.insert(ENV_INTEROP.to_string(), "0".to_string());
  }
  if let Some((var, level)) = feature_variable(&target.arch, &config.levels) {
    env.insert(var.to_string(), level.to_string());
  }
  if config.module_mode == ModuleMode::Legacy {
    env.insert(ENV_MODULE_MODE.to_string(), "off".to_string());
  }

  BuildPlan {
    flags,
    build_mode,
    tags,
    ldflags,
    env,
    clean_cache: config.clean_cache,
  }
}
