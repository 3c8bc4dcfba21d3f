/// Version base used when neither an override nor an embedded version string is found.
pub const FALLBACK_VERSION: &str = "1.1.19";

/// Revision placeholder used when the VCS revision cannot be resolved.
pub const UNKNOWN_REVISION: &str = "unknown";

/// Suffix appended to the version tag when the working tree is dirty.
pub const DIRTY_SUFFIX: &str = "-dirty";

/// Default output directory, relative to the project root.
pub const DEFAULT_OUTPUT_DIR: &str = "builds";

/// File name of the run-level metadata document.
pub const METADATA_FILENAME: &str = "build-metadata.json";

/// Extension of the checksum sidecar written next to each artifact.
pub const HASH_SIDECAR_EXT: &str = "hash";

/// Sentinel shown for size or digest fields that could not be computed.
pub const NOT_AVAILABLE: &str = "n/a";

/// Module descriptor of the Go toolchain.
pub const MODULE_DESCRIPTOR: &str = "go.mod";

/// Length of the abbreviated VCS revision embedded in the version tag.
pub const SHORT_REVISION_LEN: usize = 7;

/// Project name used when neither `--name`, the module directive nor the directory name yields one.
pub const FALLBACK_PROJECT_NAME: &str = "app";
