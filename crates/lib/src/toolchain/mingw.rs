//! MSYS2 / mingw-w64 discovery on Windows hosts.

use std::path::{Path, PathBuf};

use tracing::info;

use super::types::{Arch, ToolchainError};

/// Directories below the system drive that may hold an MSYS2 installation.
const MSYS_CANDIDATES: &[&str] = &["msys64", "msys2"];

/// A located MSYS2 shell and mingw compiler pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MingwInstall {
  /// MSYS2 root, providing the POSIX shell (`usr/bin/sh.exe`).
  pub msys_dir: PathBuf,
  /// mingw root for the requested bitness (`bin/gcc.exe`).
  pub mingw_dir: PathBuf,
}

impl MingwInstall {
  /// Search path entries, highest priority first.
  pub fn bin_dirs(&self) -> Vec<PathBuf> {
    vec![self.mingw_dir.join("bin"), self.msys_dir.join("usr").join("bin")]
  }
}

/// Locate MSYS2 and the mingw compiler matching `arch` below `system_root`.
///
/// The shell is searched in `msys64` then `msys2`; the compiler in
/// `<msys>/mingwNN` then `<system_root>/mingwNN`.
pub fn discover(system_root: &Path, arch: Arch) -> Result<MingwInstall, ToolchainError> {
  let msys_dir = MSYS_CANDIDATES
    .iter()
    .map(|sub| system_root.join(sub))
    .find(|dir| dir.join("usr").join("bin").join("sh.exe").is_file())
    .ok_or_else(|| ToolchainError::NotFound {
      what: "msys2".to_string(),
      searched: MSYS_CANDIDATES
        .iter()
        .map(|sub| system_root.join(sub).display().to_string())
        .collect::<Vec<_>>()
        .join(", "),
    })?;
  info!(msysdir = %msys_dir.display(), "found msys2");

  let mingw_name = format!("mingw{}", arch.bitness());
  let candidates = [msys_dir.join(&mingw_name), system_root.join(&mingw_name)];
  let mingw_dir = candidates
    .iter()
    .find(|dir| dir.join("bin").join("gcc.exe").is_file())
    .cloned()
    .ok_or_else(|| ToolchainError::NotFound {
      what: mingw_name.clone(),
      searched: candidates
        .iter()
        .map(|dir| dir.display().to_string())
        .collect::<Vec<_>>()
        .join(", "),
    })?;
  info!(mingwdir = %mingw_dir.display(), "found mingw");

  Ok(MingwInstall { msys_dir, mingw_dir })
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::fs;
  use tempfile::TempDir;

  fn touch(path: &Path) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, b"").unwrap();
  }

  #[test]
  fn finds_msys64_with_nested_mingw() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    touch(&root.join("msys64/usr/bin/sh.exe"));
    touch(&root.join("msys64/mingw32/bin/gcc.exe"));

    let install = discover(root, Arch::X86).unwrap();

    assert_eq!(install.msys_dir, root.join("msys64"));
    assert_eq!(install.mingw_dir, root.join("msys64/mingw32"));
    assert_eq!(
      install.bin_dirs(),
      vec![root.join("msys64/mingw32/bin"), root.join("msys64/usr/bin")]
    );
  }

  #[test]
  fn falls_back_to_msys2_and_standalone_mingw() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    touch(&root.join("msys2/usr/bin/sh.exe"));
    touch(&root.join("mingw64/bin/gcc.exe"));

    let install = discover(root, Arch::Amd64).unwrap();

    assert_eq!(install.msys_dir, root.join("msys2"));
    assert_eq!(install.mingw_dir, root.join("mingw64"));
  }

  #[test]
  fn missing_shell_is_not_found() {
    let temp = TempDir::new().unwrap();
    let result = discover(temp.path(), Arch::X86);
    assert!(matches!(result, Err(ToolchainError::NotFound { ref what, .. }) if what == "msys2"));
  }

  #[test]
  fn wrong_bitness_is_not_found() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    touch(&root.join("msys64/usr/bin/sh.exe"));
    touch(&root.join("msys64/mingw64/bin/gcc.exe"));

    let result = discover(root, Arch::X86);
    assert!(matches!(result, Err(ToolchainError::NotFound { ref what, .. }) if what == "mingw32"));
  }
}
