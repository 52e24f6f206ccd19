//! Working directory layout.
//!
//! ```text
//! <workdir>/
//!   .depend/<dependency>/              cloned dependency sources (single-target build)
//!   build-local-<compiler>-<arch>/     per-target source copy
//!     .depend/<dependency>/            per-target dependency sources
//!     .instdist/                       per-target distribution tree
//! ```

use std::path::{Path, PathBuf};

use crate::consts::WORKDIR_ENV;
use crate::toolchain::BuildTarget;

/// Directory name of the distribution tree produced by the external build system.
/// Name prefix shared by every per-target source copy.
pub const TARGET_DIR_PREFIX: &str = "build-local";

pub const INSTDIST_DIR: &str = ".instdist";

/// Directory holding cloned dependencies.
pub const DEPEND_DIR: &str = ".depend";

/// Returns the working directory: `DISTFORGE_WORKDIR` when set, else the current directory.
pub fn work_dir() -> std::io::Result<PathBuf> {
  let dir = match std::env::var_os(WORKDIR_ENV) {
    Some(dir) => PathBuf::from(dir),
    None => std::env::current_dir()?,
  };
  Ok(dunce::canonicalize(&dir).unwrap_or(dir))
}

/// Dependency checkout root below a build directory.
pub fn depend_dir(build_dir: &Path) -> PathBuf {
  build_dir.join(DEPEND_DIR)
}

/// Per-target copy of the sources, e.g. `build-local-gcc-x86`.
pub fn target_dir(work_dir: &Path, target: &BuildTarget) -> PathBuf {
  work_dir.join(format!("{}-{}-{}", TARGET_DIR_PREFIX, target.compiler, target.arch))
}

/// Distribution tree produced inside a build directory.
pub fn instdist_dir(build_dir: &Path) -> PathBuf {
  build_dir.join(INSTDIST_DIR)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::toolchain::{Arch, Compiler};
  use serial_test::serial;
  use tempfile::TempDir;

  #[test]
  fn target_dir_includes_compiler_and_arch() {
    let target = BuildTarget::new(Compiler::Gcc, Arch::Amd64, 0);
    assert_eq!(
      target_dir(Path::new("/src"), &target),
      PathBuf::from("/src/build-local-gcc-amd64")
    );
  }

  #[test]
  fn instdist_lives_in_build_dir() {
    assert_eq!(instdist_dir(Path::new("/b")), PathBuf::from("/b/.instdist"));
  }

  #[test]
  #[serial]
  fn work_dir_honours_override() {
    let temp = TempDir::new().unwrap();
    temp_env::with_var(WORKDIR_ENV, Some(temp.path().to_str().unwrap()), || {
      let dir = work_dir().unwrap();
      assert_eq!(dir, dunce::canonicalize(temp.path()).unwrap());
    });
  }
}
