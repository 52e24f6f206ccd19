//! Toolchain and target types.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::execute::EnvOverlay;
use crate::platform::HostEnv;

/// Errors that can occur while resolving a toolchain.
#[derive(Debug, Error)]
pub enum ToolchainError {
  /// Compiler/architecture pair is not buildable on this host.
  #[error("unsupported combination: {0}")]
  UnsupportedCombination(String),

  /// A required installation could not be located.
  #[error("{what} not found (searched: {searched})")]
  NotFound { what: String, searched: String },

  /// The installer-discovery utility failed or returned unusable output.
  #[error("failed to query '{tool}': {message}")]
  Discovery { tool: PathBuf, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compiler {
  Gcc,
  Msvc,
}

impl Compiler {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Gcc => "gcc",
      Self::Msvc => "msvc",
    }
  }
}

impl FromStr for Compiler {
  type Err = ToolchainError;

  /// Accepts `gcc`, `mingw` (alias for gcc) and `msvc`.
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "gcc" | "mingw" => Ok(Self::Gcc),
      "msvc" => Ok(Self::Msvc),
      _ => Err(ToolchainError::UnsupportedCombination(format!("unknown compiler '{}'", s))),
    }
  }
}

impl fmt::Display for Compiler {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Target architecture of the produced binaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
  X86,
  Amd64,
}

impl Arch {
  pub const ALL: [Arch; 2] = [Arch::X86, Arch::Amd64];

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::X86 => "x86",
      Self::Amd64 => "amd64",
    }
  }

  pub fn bitness(&self) -> u32 {
    match self {
      Self::X86 => 32,
      Self::Amd64 => 64,
    }
  }

  /// Visual C++ platform name.
  pub fn msvc_platform(&self) -> &'static str {
    match self {
      Self::X86 => "Win32",
      Self::Amd64 => "x64",
    }
  }

  /// Tool prefix of the mingw-w64 cross compilers.
  pub fn mingw_prefix(&self) -> &'static str {
    match self {
      Self::X86 => "i686-w64-mingw32-",
      Self::Amd64 => "x86_64-w64-mingw32-",
    }
  }
}

impl FromStr for Arch {
  type Err = ToolchainError;

  /// Accepts `x86`, `Win32` (alias for x86), `amd64` and `x64` (alias for amd64).
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "x86" | "win32" => Ok(Self::X86),
      "amd64" | "x64" => Ok(Self::Amd64),
      _ => Err(ToolchainError::UnsupportedCombination(format!(
        "unknown architecture '{}' (expected x86 or amd64)",
        s
      ))),
    }
  }
}

impl fmt::Display for Arch {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// One unit of concurrent work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildTarget {
  pub compiler: Compiler,
  pub arch: Arch,
  pub build_number: u32,
}

impl BuildTarget {
  pub fn new(compiler: Compiler, arch: Arch, build_number: u32) -> Self {
    Self {
      compiler,
      arch,
      build_number,
    }
  }
}

impl fmt::Display for BuildTarget {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}-{}", self.compiler, self.arch)
  }
}

/// A resolved compiler environment.
///
/// Built once by the resolver and never modified afterwards. Everything a
/// child process needs from it is applied through [`ToolchainConfig::overlay`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainConfig {
  pub compiler: Compiler,
  pub arch: Arch,
  /// Installation root (mingw directory or Visual Studio installation), if any.
  pub installation_root: Option<PathBuf>,
  /// MSVC platform toolset (`v143`, ...). `None` for gcc or unknown product lines.
  pub toolset: Option<String>,
  /// Architecture name as the toolchain spells it (`Win32`/`x64` for MSVC).
  pub arch_display_name: String,
  /// Directories to search before the inherited `PATH`, highest priority first.
  pub search_path: Vec<PathBuf>,
  /// True when the compiler runs natively on a Windows host (no cross prefix).
  pub native_host: bool,
}

impl ToolchainConfig {
  /// Per-invocation environment for commands using this toolchain.
  pub fn overlay(&self, host: &HostEnv) -> EnvOverlay {
    self
      .search_path
      .iter()
      .rev()
      .fold(EnvOverlay::new(host.path.clone()), |overlay, dir| overlay.prepend_path(dir))
  }
}
