//! Post-build artifact processing.
//!
//! After a successful compile, [`post_process`] marks the artifact executable,
//! optionally compresses it, measures it and optionally writes checksums.
//! Every step is best effort: failures are logged and the artifact is kept
//! in whatever state the last successful step left it.

pub mod compress;

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::util::hash::{ArtifactDigests, digest_file, write_sidecar};

pub use compress::{CompressError, Compression, compress_file};

/// What to do with a freshly built artifact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PostProcessOptions {
  pub compression: Option<Compression>,
  pub checksums: bool,
}

/// The artifact as it stands after post-processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedArtifact {
  /// Final path, including any compression suffix.
  pub path: PathBuf,
  /// Final base file name, including any compression suffix.
  pub file_name: String,
  /// Size of the final file, `None` if it could not be read.
  pub size: Option<u64>,
  /// Digests of the final file, `None` if disabled or failed.
  pub digests: Option<ArtifactDigests>,
}

/// Run the post-build pipeline on a successfully built artifact.
pub fn post_process(artifact: &Path, options: &PostProcessOptions) -> ProcessedArtifact {
  set_executable(artifact);

  let mut path = artifact.to_path_buf();
  if let Some(method) = options.compression {
    path = compress_in_place(artifact, method);
  }

  let size = match std::fs::metadata(&path) {
    Ok(meta) => Some(meta.len()),
    Err(e) => {
      warn!(path = %path.display(), error = %e, "failed to stat artifact");
      None
    }
  };

  let digests = if options.checksums {
    checksum(&path)
  } else {
    None
  };

  let file_name = path
    .file_name()
    .map(|n| n.to_string_lossy().to_string())
    .unwrap_or_default();

  ProcessedArtifact {
    path,
    file_name,
    size,
    digests,
  }
}

/// Compress `artifact` next to itself and remove the original.
///
/// Returns the path of whichever file survives: the compressed one on success,
/// the untouched original on failure.
fn compress_in_place(artifact: &Path, method: Compression) -> PathBuf {
  let compressed = method.compressed_path(artifact);
  match compress_file(artifact, &compressed, method) {
    Ok(()) => {
      if let Err(e) = std::fs::remove_file(artifact) {
        warn!(path = %artifact.display(), error = %e, "failed to remove uncompressed artifact");
      }
      debug!(path = %compressed.display(), method = method.as_str(), "artifact compressed");
      compressed
    }
    Err(e) => {
      warn!(path = %artifact.display(), error = %e, "compression failed, keeping uncompressed artifact");
      let _ = std::fs::remove_file(&compressed);
      artifact.to_path_buf()
    }
  }
}

fn checksum(path: &Path) -> Option<ArtifactDigests> {
  let digests = match digest_file(path) {
    Ok(digests) => digests,
    Err(e) => {
      warn!(error = %e, "checksum generation failed");
      return None;
    }
  };
  if let Err(e) = write_sidecar(path, &digests) {
    warn!(error = %e, "failed to write checksum file");
  }
  Some(digests)
}

#[cfg(unix)]
fn set_executable(path: &Path) {
  use std::os::unix::fs::PermissionsExt;

  if let Err(e) = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)) {
    debug!(path = %path.display(), error = %e, "failed to set executable bit");
  }
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) {}
