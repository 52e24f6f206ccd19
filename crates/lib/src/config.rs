//! Project configuration.
//!
//! Loaded from an optional `distforge.json` in the working directory. Every
//! field has a default, so a missing file or a partial file is fine.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::consts::PROJECT_FILE;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read '{path}': {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse '{path}': {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },
}

/// Upstream repositories of the third-party build dependencies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DependencySources {
  pub zlib: String,
  pub cppunit: String,
  /// Clone depth; 0 clones the full history.
  pub clone_depth: u32,
}

impl Default for DependencySources {
  fn default() -> Self {
    Self {
      zlib: "https://github.com/madler/zlib.git".to_string(),
      cppunit: "git://anongit.freedesktop.org/git/libreoffice/cppunit".to_string(),
      clone_depth: 1,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
  /// Major version number of the distribution.
  pub major: u32,
  /// Minor version number of the distribution.
  pub minor: u32,
  /// Distribution name prefix; the build uses `<prefix>-<compiler>`.
  pub distro_prefix: String,
  /// Product identification passed to the packaging tool.
  pub product_name: String,
  /// External build system executable.
  pub build_tool: String,
  /// Packaging tool executable name (without extension).
  pub packaging_tool: String,
  /// Installer script, relative to a merged distribution tree.
  pub installer_script: PathBuf,
  pub dependencies: DependencySources,
}

impl Default for ProjectConfig {
  fn default() -> Self {
    Self {
      major: 3,
      minor: 10,
      distro_prefix: "negrutiu".to_string(),
      product_name: "NSIS".to_string(),
      build_tool: "scons".to_string(),
      packaging_tool: "makensis".to_string(),
      installer_script: PathBuf::from("Examples").join("makensis.nsi"),
      dependencies: DependencySources::default(),
    }
  }
}

impl ProjectConfig {
  /// Load `distforge.json` from `work_dir`, falling back to defaults when absent.
  pub fn load(work_dir: &Path) -> Result<Self, ConfigError> {
    let path = work_dir.join(PROJECT_FILE);
    if !path.exists() {
      debug!(path = %path.display(), "no project file, using defaults");
      return Ok(Self::default());
    }

    let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
      path: path.clone(),
      source,
    })?;
    let config = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
      path: path.clone(),
      source,
    })?;

    debug!(path = %path.display(), "loaded project file");
    Ok(config)
  }

  /// Distribution name passed to the build system for `compiler`.
  pub fn distro_name(&self, compiler: &str) -> String {
    format!("{}-{}", self.distro_prefix, compiler)
  }
}
