//! Streaming artifact compression.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Supported compression methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
  Gzip,
  Zstd,
}

impl Compression {
  /// Parse a method name. Unknown names yield `None`.
  pub fn parse(name: &str) -> Option<Self> {
    match name.trim().to_ascii_lowercase().as_str() {
      "gzip" => Some(Self::Gzip),
      "zstd" => Some(Self::Zstd),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Gzip => "gzip",
      Self::Zstd => "zstd",
    }
  }

  /// File extension appended to compressed artifacts, without the dot.
  pub fn extension(&self) -> &'static str {
    match self {
      Self::Gzip => "gz",
      Self::Zstd => "zst",
    }
  }

  /// `<path>.<ext>`
  pub fn compressed_path(&self, path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(self.extension());
    PathBuf::from(name)
  }
}

/// Errors during compression.
#[derive(Debug, Error)]
pub enum CompressError {
  #[error("failed to open {}: {source}", path.display())]
  Open {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to create {}: {source}", path.display())]
  Create {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to compress into {}: {source}", path.display())]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Stream-compress `input` into `output` with `method`.
///
/// The caller owns cleanup: on error `output` may exist partially written.
pub fn compress_file(input: &Path, output: &Path, method: Compression) -> Result<(), CompressError> {
  let source = File::open(input).map_err(|e| CompressError::Open {
    path: input.to_path_buf(),
    source: e,
  })?;
  let sink = File::create(output).map_err(|e| CompressError::Create {
    path: output.to_path_buf(),
    source: e,
  })?;

  let mut reader = BufReader::new(source);
  let writer = BufWriter::new(sink);

  let write_err = |e| CompressError::Write {
    path: output.to_path_buf(),
    source: e,
  };

  let mut writer = match method {
    Compression::Gzip => {
      let mut encoder = flate2::write::GzEncoder::new(writer, flate2::Compression::default());
      io::copy(&mut reader, &mut encoder).map_err(write_err)?;
      encoder.finish().map_err(write_err)?
    }
    Compression::Zstd => {
      let mut encoder = zstd::stream::write::Encoder::new(writer, zstd::DEFAULT_COMPRESSION_LEVEL).map_err(write_err)?;
      io::copy(&mut reader, &mut encoder).map_err(write_err)?;
      encoder.finish().map_err(write_err)?
    }
  };

  writer.flush().map_err(write_err)?;
  Ok(())
}

#[cfg(test)]
mod tests {
  use std::io::Read;

  use super::*;
  use tempfile::tempdir;

  fn sample_bytes() -> Vec<u8> {
    (0..300_000u32).map(|i| (i * 31 % 251) as u8).collect()
  }

  #[test]
  fn parse_methods() {
    assert_eq!(Compression::parse("gzip"), Some(Compression::Gzip));
    assert_eq!(Compression::parse("ZSTD"), Some(Compression::Zstd));
    assert_eq!(Compression::parse("xz"), None);
    assert_eq!(Compression::parse(""), None);
  }

  #[test]
  fn compressed_path_appends_extension() {
    assert_eq!(
      Compression::Gzip.compressed_path(Path::new("/out/app.exe")),
      PathBuf::from("/out/app.exe.gz")
    );
    assert_eq!(
      Compression::Zstd.compressed_path(Path::new("/out/app")),
      PathBuf::from("/out/app.zst")
    );
  }

  #[test]
  fn gzip_round_trip() {
    let temp = tempdir().unwrap();
    let input = temp.path().join("app");
    let output = temp.path().join("app.gz");
    std::fs::write(&input, sample_bytes()).unwrap();

    compress_file(&input, &output, Compression::Gzip).unwrap();

    let mut decoded = Vec::new();
    flate2::read::GzDecoder::new(File::open(&output).unwrap())
      .read_to_end(&mut decoded)
      .unwrap();
    assert_eq!(decoded, sample_bytes());
  }

  #[test]
  fn zstd_round_trip() {
    let temp = tempdir().unwrap();
    let input = temp.path().join("app");
    let output = temp.path().join("app.zst");
    std::fs::write(&input, sample_bytes()).unwrap();

    compress_file(&input, &output, Compression::Zstd).unwrap();

    let decoded = zstd::stream::decode_all(File::open(&output).unwrap()).unwrap();
    assert_eq!(decoded, sample_bytes());
  }

  #[test]
  fn empty_file_round_trips() {
    let temp = tempdir().unwrap();
    let input = temp.path().join("empty");
    std::fs::write(&input, b"").unwrap();

    for method in [Compression::Gzip, Compression::Zstd] {
      let output = method.compressed_path(&input);
      compress_file(&input, &output, method).unwrap();
      let decoded = match method {
        Compression::Gzip => {
          let mut buf = Vec::new();
          flate2::read::GzDecoder::new(File::open(&output).unwrap())
            .read_to_end(&mut buf)
            .unwrap();
          buf
        }
        Compression::Zstd => zstd::stream::decode_all(File::open(&output).unwrap()).unwrap(),
      };
      assert!(decoded.is_empty());
    }
  }

  #[test]
  fn missing_input_is_open_error() {
    let temp = tempdir().unwrap();
    let err = compress_file(
      &temp.path().join("absent"),
      &temp.path().join("absent.gz"),
      Compression::Gzip,
    )
    .unwrap_err();
    assert!(matches!(err, CompressError::Open { .. }));
  }
}
