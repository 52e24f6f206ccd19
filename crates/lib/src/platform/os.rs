use std::fmt;

/// Build host operating system.
///
/// Only Windows hosts can drive MSVC and the native MinGW toolchain; Linux
/// hosts cross-compile with the `mingw-w64` toolchain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Os {
  Linux,
  MacOs,
  Windows,
}

impl Os {
  pub fn current() -> Option<Self> {
    match std::env::consts::OS {
      "linux" => Some(Self::Linux),
      "macos" => Some(Self::MacOs),
      "windows" => Some(Self::Windows),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Linux => "linux",
      Self::MacOs => "macos",
      Self::Windows => "windows",
    }
  }

  /// File name of the executable `stem` as this host names it.
  pub fn executable(&self, stem: &str) -> String {
    match self {
      Self::Windows => format!("{}.exe", stem),
      Self::Linux | Self::MacOs => stem.to_string(),
    }
  }
}

impl fmt::Display for Os {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn build_hosts_are_detected() {
    assert!(Os::current().is_some());
  }

  #[test]
  fn only_windows_appends_exe() {
    assert_eq!(Os::Windows.executable("makensis"), "makensis.exe");
    assert_eq!(Os::Linux.executable("makensis"), "makensis");
    assert_eq!(Os::MacOs.to_string(), "macos");
  }
}
