//! Artifact checksums.
//!
//! This module provides:
//! - `ArtifactDigests`: SHA-256 and SHA-512 of one file, computed in a single pass
//! - `digest_file()`: streaming digest computation
//! - `write_sidecar()`: the `<artifact>.hash` file next to an artifact

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256, Sha512};
use thiserror::Error;

use crate::consts::HASH_SIDECAR_EXT;

/// Error while hashing an artifact or writing its sidecar.
#[derive(Debug, Error)]
pub enum HashError {
  #[error("failed to read {}: {source}", path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to write checksum file {}: {source}", path.display())]
  WriteSidecar {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// Hex-encoded digests of one artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactDigests {
  pub sha256: String,
  pub sha512: String,
}

/// Hash a file's contents with both algorithms in one read pass.
pub fn digest_file(path: &Path) -> Result<ArtifactDigests, HashError> {
  let read_err = |e| HashError::Read {
    path: path.to_path_buf(),
    source: e,
  };
  let mut file = fs::File::open(path).map_err(read_err)?;

  let mut sha256 = Sha256::new();
  let mut sha512 = Sha512::new();
  let mut buffer = [0u8; 64 * 1024];

  loop {
    let bytes_read = file.read(&mut buffer).map_err(read_err)?;
    if bytes_read == 0 {
      break;
    }
    sha256.update(&buffer[..bytes_read]);
    sha512.update(&buffer[..bytes_read]);
  }

  Ok(ArtifactDigests {
    sha256: format!("{:x}", sha256.finalize()),
    sha512: format!("{:x}", sha512.finalize()),
  })
}

/// Path of the sidecar for an artifact: `<artifact>.hash`.
pub fn sidecar_path(artifact: &Path) -> PathBuf {
  let mut name = artifact.as_os_str().to_owned();
  name.push(".");
  name.push(HASH_SIDECAR_EXT);
  PathBuf::from(name)
}

/// Sidecar content, labelled by algorithm and base file name.
pub fn sidecar_content(file_name: &str, digests: &ArtifactDigests) -> String {
  format!(
    "SHA256 ({name}) = {}\nSHA512 ({name}) = {}\n",
    digests.sha256,
    digests.sha512,
    name = file_name
  )
}

/// Write the checksum sidecar next to `artifact` and return its path.
pub fn write_sidecar(artifact: &Path, digests: &ArtifactDigests) -> Result<PathBuf, HashError> {
  let file_name = artifact
    .file_name()
    .map(|n| n.to_string_lossy().to_string())
    .unwrap_or_default();
  let path = sidecar_path(artifact);
  fs::write(&path, sidecar_content(&file_name, digests)).map_err(|e| HashError::WriteSidecar {
    path: path.clone(),
    source: e,
  })?;
  Ok(path)
}
