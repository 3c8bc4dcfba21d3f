/// Map the current CPU architecture to the toolchain's name for it.
///
/// Endianness-dependent names (`mipsle`, `ppc64le`) are decided at compile time.
pub fn host_arch() -> Option<&'static str> {
  toolchain_arch(std::env::consts::ARCH, cfg!(target_endian = "little"))
}

/// Map a Rust architecture identifier to the toolchain's name for it.
pub fn toolchain_arch(rust_arch: &str, little_endian: bool) -> Option<&'static str> {
  let name = match rust_arch {
    "x86_64" => "amd64",
    "x86" => "386",
    "aarch64" => "arm64",
    "arm" => "arm",
    "riscv64" => "riscv64",
    "loongarch64" => "loong64",
    "s390x" => "s390x",
    "mips" if little_endian => "mipsle",
    "mips" => "mips",
    "mips64" if little_endian => "mips64le",
    "mips64" => "mips64",
    "powerpc64" if little_endian => "ppc64le",
    "powerpc64" => "ppc64",
    _ => return None,
  };
  Some(name)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn common_architectures_map_to_toolchain_names() {
    assert_eq!(toolchain_arch("x86_64", true), Some("amd64"));
    assert_eq!(toolchain_arch("aarch64", true), Some("arm64"));
    assert_eq!(toolchain_arch("riscv64", true), Some("riscv64"));
  }

  #[test]
  fn endianness_selects_variant() {
    assert_eq!(toolchain_arch("powerpc64", true), Some("ppc64le"));
    assert_eq!(toolchain_arch("powerpc64", false), Some("ppc64"));
    assert_eq!(toolchain_arch("mips", true), Some("mipsle"));
    assert_eq!(toolchain_arch("mips", false), Some("mips"));
  }

  #[test]
  fn unknown_arch_is_none() {
    assert_eq!(toolchain_arch("sparc64", false), None);
  }
}
