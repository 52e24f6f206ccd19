//! Installer synthesis from a merged distribution tree.
//!
//! The packaging tool is run from inside the tree it packages. `NSISDIR` and
//! `NSISCONFDIR` point it at that tree so it does not look for its data in the
//! default installation location.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use crate::config::ProjectConfig;
use crate::execute::{BuildCommand, EnvOverlay, ExecError, run_command};
use crate::platform::{HostEnv, Os};
use crate::toolchain::Arch;
use crate::version::VersionTuple;

/// Highest verbosity the packaging tool accepts.
pub const MAX_VERBOSITY: u8 = 4;

#[derive(Debug, Error)]
pub enum InstallerError {
  #[error("packaging tool not found at '{0}'")]
  ToolMissing(PathBuf),

  #[error("verbosity must be between 0 and {max}, got {0}", max = MAX_VERBOSITY)]
  InvalidVerbosity(u8),

  #[error("failed to make '{path}' executable: {source}")]
  Permissions {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("{program} failed with exit code {code}")]
  ExternalBuildFailed { program: String, code: i32 },

  #[error(transparent)]
  Exec(#[from] ExecError),
}

/// Location of the packaging tool inside a distribution tree.
///
/// Windows trees carry it at the root; trees built on other hosts keep it in `Bin`.
pub fn packaging_tool(tree: &Path, tool: &str, host: &HostEnv) -> PathBuf {
  match host.os {
    Some(os @ Os::Windows) => tree.join(os.executable(tool)),
    _ => tree.join("Bin").join(tool),
  }
}

/// Installer file written next to the tree, e.g. `nsis-3.10.0.0-x86-setup.exe`.
pub fn installer_path(tree: &Path, product: &str, arch: Arch, version: &VersionTuple) -> PathBuf {
  let name = format!("{}-{}-{}-setup.exe", product.to_lowercase(), version, arch);
  match tree.parent() {
    Some(parent) => parent.join(name),
    None => PathBuf::from(name),
  }
}

/// Set the execute bits on `path`. Extracted archives do not keep them.
#[cfg(unix)]
pub fn ensure_executable(path: &Path) -> io::Result<()> {
  use std::os::unix::fs::PermissionsExt;

  let mut perms = std::fs::metadata(path)?.permissions();
  let mode = perms.mode();
  if mode & 0o111 != 0o111 {
    perms.set_mode(mode | 0o111);
    std::fs::set_permissions(path, perms)?;
  }
  Ok(())
}

#[cfg(not(unix))]
pub fn ensure_executable(_path: &Path) -> io::Result<()> {
  Ok(())
}

/// Packaging tool arguments, script path last.
pub fn installer_args(
  tree: &Path,
  arch: Arch,
  version: &VersionTuple,
  verbosity: u8,
  config: &ProjectConfig,
  output: &Path,
) -> Vec<String> {
  vec![
    format!("/V{}", verbosity),
    format!("/DVER_MAJOR={}", version.major),
    format!("/DVER_MINOR={}", version.minor),
    format!("/DVER_REVISION={}", version.revision),
    format!("/DVER_BUILD={}", version.build),
    format!("/DVER_PACKED={}", version.packed()),
    format!("/DARCH={}", arch),
    format!("/DPRODUCT_NAME={}", config.product_name),
    format!("/DOUTFILE={}", output.display()),
    tree.join(&config.installer_script).display().to_string(),
  ]
}

/// Build the installer for the merged tree at `tree`.
pub async fn synthesize(
  tree: &Path,
  arch: Arch,
  version: &VersionTuple,
  verbosity: u8,
  config: &ProjectConfig,
  host: &HostEnv,
) -> Result<PathBuf, InstallerError> {
  if verbosity > MAX_VERBOSITY {
    return Err(InstallerError::InvalidVerbosity(verbosity));
  }

  let tool = packaging_tool(tree, &config.packaging_tool, host);
  if !tool.is_file() {
    return Err(InstallerError::ToolMissing(tool));
  }
  ensure_executable(&tool).map_err(|source| InstallerError::Permissions {
    path: tool.clone(),
    source,
  })?;

  let output = installer_path(tree, &config.product_name, arch, version);
  let overlay = EnvOverlay::new(host.path.clone())
    .var("NSISDIR", tree)
    .var("NSISCONFDIR", tree);
  let command = BuildCommand::new(tool.display().to_string())
    .args(installer_args(tree, arch, version, verbosity, config, &output))
    .current_dir(tree);

  let code = run_command(&command, &overlay).await?;
  if code != 0 {
    warn!(arch = %arch, code, "installer build failed");
    return Err(InstallerError::ExternalBuildFailed {
      program: tool.display().to_string(),
      code,
    });
  }

  info!(arch = %arch, installer = %output.display(), "installer built");
  Ok(output)
}
