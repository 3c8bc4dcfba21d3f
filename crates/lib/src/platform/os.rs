/// Host operating systems and the names the toolchain uses for them.
///
/// Keyed by `std::env::consts::OS`.
const OS_NAMES: &[(&str, &str)] = &[
  ("linux", "linux"),
  ("macos", "darwin"),
  ("windows", "windows"),
  ("freebsd", "freebsd"),
  ("openbsd", "openbsd"),
  ("netbsd", "netbsd"),
  ("dragonfly", "dragonfly"),
  ("solaris", "solaris"),
  ("illumos", "illumos"),
  ("android", "android"),
  ("ios", "ios"),
];

/// Operating system whose executables carry an `.exe` suffix.
pub const WINDOWS: &str = "windows";

/// Map a Rust OS identifier to the toolchain's name for it.
///
/// Returns `None` for operating systems the toolchain has no name for.
pub fn toolchain_os(rust_os: &str) -> Option<&'static str> {
  OS_NAMES
    .iter()
    .find(|(rust, _)| *rust == rust_os)
    .map(|(_, name)| *name)
}

/// Returns the toolchain name of the current operating system.
pub fn host_os() -> Option<&'static str> {
  toolchain_os(std::env::consts::OS)
}

/// Executable suffix for the given toolchain OS name.
pub fn exe_suffix(os: &str) -> &'static str {
  if os == WINDOWS { ".exe" } else { "" }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn macos_uses_darwin_identifier() {
    assert_eq!(toolchain_os("macos"), Some("darwin"));
  }

  #[test]
  fn unknown_os_has_no_name() {
    assert_eq!(toolchain_os("plan9ish"), None);
  }

  #[test]
  fn only_windows_gets_exe_suffix() {
    assert_eq!(exe_suffix("windows"), ".exe");
    assert_eq!(exe_suffix("linux"), "");
    assert_eq!(exe_suffix("darwin"), "");
  }
}
