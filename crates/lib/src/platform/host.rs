//! Immutable snapshot of the host environment.
//!
//! Toolchain discovery needs a handful of process environment variables
//! (`SystemDrive`, `ProgramFiles`, `ProgramFiles(x86)`, `PATH`). They are read
//! exactly once into a [`HostEnv`] and every later decision is made against
//! that value. Nothing in distforge writes the process environment; changes a
//! child process needs are applied through an
//! [`EnvOverlay`](crate::execute::EnvOverlay) on that child only.

use std::ffi::OsString;
use std::path::{MAIN_SEPARATOR, PathBuf};

use super::os::Os;

#[derive(Debug, Clone, Default)]
pub struct HostEnv {
  /// Host OS, `None` when running somewhere unrecognised.
  pub os: Option<Os>,
  /// Value of `SystemDrive` (e.g. `C:`).
  pub system_drive: Option<PathBuf>,
  /// Value of `ProgramFiles`.
  pub program_files: Option<PathBuf>,
  /// Value of `ProgramFiles(x86)`.
  pub program_files_x86: Option<PathBuf>,
  /// Executable search path inherited by child processes.
  pub path: OsString,
}

impl HostEnv {
  /// Capture the current process environment.
  pub fn capture() -> Self {
    Self {
      os: Os::current(),
      system_drive: std::env::var_os("SystemDrive").map(PathBuf::from),
      program_files: std::env::var_os("ProgramFiles").map(PathBuf::from),
      program_files_x86: std::env::var_os("ProgramFiles(x86)").map(PathBuf::from),
      path: std::env::var_os("PATH").unwrap_or_default(),
    }
  }

  pub fn is_windows(&self) -> bool {
    self.os == Some(Os::Windows)
  }

  /// Root of the system drive (`C:\`), used as the base for toolchain searches.
  pub fn system_root(&self) -> Option<PathBuf> {
    self.system_drive.as_ref().map(|drive| {
      let mut root = drive.clone().into_os_string();
      if !root.to_string_lossy().ends_with(MAIN_SEPARATOR) {
        root.push(MAIN_SEPARATOR.to_string());
      }
      PathBuf::from(root)
    })
  }

  /// Program Files directories in lookup order (x86 first).
  pub fn program_files_dirs(&self) -> Vec<PathBuf> {
    self
      .program_files_x86
      .iter()
      .chain(self.program_files.iter())
      .cloned()
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serial_test::serial;

  #[test]
  fn system_root_appends_separator() {
    let host = HostEnv {
      system_drive: Some(PathBuf::from("C:")),
      ..Default::default()
    };
    let root = host.system_root().unwrap();
    assert!(root.to_string_lossy().ends_with(MAIN_SEPARATOR));
  }

  #[test]
  fn system_root_none_without_drive() {
    assert!(HostEnv::default().system_root().is_none());
  }

  #[test]
  fn program_files_x86_comes_first() {
    let host = HostEnv {
      program_files: Some(PathBuf::from("/pf")),
      program_files_x86: Some(PathBuf::from("/pf86")),
      ..Default::default()
    };
    assert_eq!(host.program_files_dirs(), vec![PathBuf::from("/pf86"), PathBuf::from("/pf")]);
  }

  #[test]
  #[serial]
  fn capture_reads_program_files() {
    temp_env::with_vars(
      [("ProgramFiles", Some("/pf")), ("ProgramFiles(x86)", None::<&str>)],
      || {
        let host = HostEnv::capture();
        assert_eq!(host.program_files, Some(PathBuf::from("/pf")));
        assert!(host.program_files_x86.is_none());
      },
    );
  }
}
