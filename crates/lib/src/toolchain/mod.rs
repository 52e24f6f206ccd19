//! Toolchain resolution.
//!
//! [`resolve`] normalizes a compiler/architecture request, validates it against
//! the host and locates the installation, returning an immutable
//! [`ToolchainConfig`]. Discovered `bin` directories are recorded in the config
//! instead of being pushed onto the process `PATH`.

pub mod mingw;
pub mod msvc;
pub mod types;

use tracing::{debug, info};

use crate::platform::HostEnv;

pub use types::{Arch, BuildTarget, Compiler, ToolchainConfig, ToolchainError};

/// Resolve a toolchain from user-facing names (`mingw`, `Win32`, `x64`, ...).
pub async fn resolve(compiler: &str, arch: &str, host: &HostEnv) -> Result<ToolchainConfig, ToolchainError> {
  let compiler: Compiler = compiler.parse()?;
  let arch: Arch = arch.parse()?;
  resolve_target(compiler, arch, host).await
}

/// Resolve a toolchain for an already-normalized compiler and architecture.
pub async fn resolve_target(compiler: Compiler, arch: Arch, host: &HostEnv) -> Result<ToolchainConfig, ToolchainError> {
  debug!(%compiler, %arch, os = ?host.os, "resolving toolchain");

  let config = match compiler {
    Compiler::Gcc => resolve_gcc(arch, host)?,
    Compiler::Msvc => resolve_msvc(arch, host).await?,
  };

  info!(
    %compiler,
    %arch,
    root = ?config.installation_root,
    toolset = ?config.toolset,
    "toolchain resolved"
  );
  Ok(config)
}

fn resolve_gcc(arch: Arch, host: &HostEnv) -> Result<ToolchainConfig, ToolchainError> {
  // Off Windows the mingw-w64 cross compilers are expected on PATH already.
  if !host.is_windows() {
    return Ok(ToolchainConfig {
      compiler: Compiler::Gcc,
      arch,
      installation_root: None,
      toolset: None,
      arch_display_name: arch.as_str().to_string(),
      search_path: Vec::new(),
      native_host: false,
    });
  }

  let system_root = host.system_root().ok_or_else(|| ToolchainError::NotFound {
    what: "system drive".to_string(),
    searched: "SystemDrive".to_string(),
  })?;
  let install = mingw::discover(&system_root, arch)?;

  Ok(ToolchainConfig {
    compiler: Compiler::Gcc,
    arch,
    search_path: install.bin_dirs(),
    installation_root: Some(install.mingw_dir),
    toolset: None,
    arch_display_name: arch.as_str().to_string(),
    native_host: true,
  })
}

async fn resolve_msvc(arch: Arch, host: &HostEnv) -> Result<ToolchainConfig, ToolchainError> {
  if !host.is_windows() {
    return Err(ToolchainError::UnsupportedCombination(format!(
      "msvc is not supported on {}",
      host.os.map(|os| os.as_str()).unwrap_or("this host")
    )));
  }

  let vswhere = msvc::locate_vswhere(host)?;
  let installation = msvc::query_latest(&vswhere, host).await?;

  Ok(ToolchainConfig {
    compiler: Compiler::Msvc,
    arch,
    search_path: vec![installation.vcvars_dir()],
    toolset: msvc::toolset_of(&installation),
    installation_root: Some(installation.installation_path),
    arch_display_name: arch.msvc_platform().to_string(),
    native_host: true,
  })
}
