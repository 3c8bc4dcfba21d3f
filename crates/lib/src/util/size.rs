/// Format a byte count with IEC units and one decimal, e.g. `1.5 KiB`.
pub fn format_bytes(bytes: u64) -> String {
  const UNIT: u64 = 1024;
  const PREFIXES: [&str; 6] = ["KiB", "MiB", "GiB", "TiB", "PiB", "EiB"];

  if bytes < UNIT {
    return format!("{} B", bytes);
  }

  let mut exp = 0;
  let mut n = bytes;
  while n >= UNIT && exp < PREFIXES.len() {
    n /= UNIT;
    exp += 1;
  }
  format!("{:.1} {}", bytes as f64 / (UNIT as f64).powi(exp as i32), PREFIXES[exp - 1])
}

/// Size label used in reports: `"<human> (<bytes>)"`.
pub fn size_label(bytes: u64) -> String {
  format!("{} ({})", format_bytes(bytes), bytes)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_format_bytes() {
    assert_eq!(format_bytes(0), "0 B");
    assert_eq!(format_bytes(500), "500 B");
    assert_eq!(format_bytes(1024), "1.0 KiB");
    assert_eq!(format_bytes(1536), "1.5 KiB");
    assert_eq!(format_bytes(1048576), "1.0 MiB");
    assert_eq!(format_bytes(1073741824), "1.0 GiB");
    assert_eq!(format_bytes(u64::MAX), "16.0 EiB");
  }

  #[test]
  fn test_size_label() {
    assert_eq!(size_label(2048), "2.0 KiB (2048)");
  }
}
