//! Visual Studio discovery through `vswhere.exe`.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use super::types::ToolchainError;
use crate::execute::{BuildCommand, EnvOverlay, capture_stdout};
use crate::platform::HostEnv;

/// Location of `vswhere.exe` relative to a Program Files directory.
const VSWHERE_RELATIVE: &[&str] = &["Microsoft Visual Studio", "Installer", "vswhere.exe"];

/// Product line years with a known platform toolset.
const TOOLSETS: &[(&str, &str)] = &[("2022", "v143"), ("2019", "v142"), ("2017", "v141")];

/// One entry of `vswhere -format json`.
#[derive(Debug, Clone, Deserialize)]
pub struct VsInstallation {
  #[serde(rename = "installationPath")]
  pub installation_path: PathBuf,
  pub catalog: VsCatalog,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VsCatalog {
  #[serde(rename = "productLineVersion")]
  pub product_line_version: String,
}

impl VsInstallation {
  /// Directory holding `vcvarsall.bat`.
  pub fn vcvars_dir(&self) -> PathBuf {
    self.installation_path.join("VC").join("Auxiliary").join("Build")
  }
}

/// Platform toolset for a Visual Studio product line year.
///
/// Unknown years return `None`; callers continue with an unset toolset.
pub fn toolset_for_product_line(year: &str) -> Option<&'static str> {
  TOOLSETS
    .iter()
    .find(|(known, _)| *known == year)
    .map(|(_, toolset)| *toolset)
}

/// Find `vswhere.exe` under `ProgramFiles(x86)` or `ProgramFiles`.
pub fn locate_vswhere(host: &HostEnv) -> Result<PathBuf, ToolchainError> {
  let candidates: Vec<PathBuf> = host
    .program_files_dirs()
    .into_iter()
    .map(|dir| VSWHERE_RELATIVE.iter().fold(dir, |path, part| path.join(part)))
    .collect();

  candidates
    .iter()
    .find(|path| path.is_file())
    .cloned()
    .ok_or_else(|| ToolchainError::NotFound {
      what: "vswhere.exe".to_string(),
      searched: candidates
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", "),
    })
}

/// Parse `vswhere` JSON output and return the first (latest) installation.
pub fn parse_vswhere(tool: &Path, json: &str) -> Result<VsInstallation, ToolchainError> {
  let installations: Vec<VsInstallation> = serde_json::from_str(json).map_err(|e| ToolchainError::Discovery {
    tool: tool.to_path_buf(),
    message: e.to_string(),
  })?;

  installations.into_iter().next().ok_or_else(|| ToolchainError::NotFound {
    what: "Visual Studio installation".to_string(),
    searched: tool.display().to_string(),
  })
}

/// Ask `vswhere` for the latest Visual Studio installation.
pub async fn query_latest(vswhere: &Path, host: &HostEnv) -> Result<VsInstallation, ToolchainError> {
  let cmd = BuildCommand::new(vswhere.display().to_string()).args(["-latest", "-sort", "-format", "json"]);

  let stdout = capture_stdout(&cmd, &EnvOverlay::new(host.path.clone()))
    .await
    .map_err(|e| ToolchainError::Discovery {
      tool: vswhere.to_path_buf(),
      message: e.to_string(),
    })?;

  let installation = parse_vswhere(vswhere, &stdout)?;
  info!(installation_path = %installation.installation_path.display(), "found Visual Studio");
  Ok(installation)
}

/// Resolve the toolset of an installation, logging when it is unknown.
pub fn toolset_of(installation: &VsInstallation) -> Option<String> {
  let year = &installation.catalog.product_line_version;
  match toolset_for_product_line(year) {
    Some(toolset) => {
      info!(toolset, "platform toolset");
      Some(toolset.to_string())
    }
    None => {
      warn!(
        product_line = %year,
        "unknown Visual Studio product line, continuing without a platform toolset"
      );
      None
    }
  }
}
