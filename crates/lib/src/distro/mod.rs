//! Distribution build for one target.
//!
//! The external build system is invoked exactly once per target with a fully
//! assembled argument list. A non-zero exit is reported in the returned
//! [`BuildResult`]; only failures to start the process are errors.

pub mod sources;

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::execute::{BuildCommand, EnvOverlay, ExecError, run_command};
use crate::platform::paths::instdist_dir;
use crate::toolchain::{BuildTarget, Compiler, ToolchainConfig};
use crate::version::VersionTuple;

pub use sources::{CopyReport, SourceCopyError, SourceFilter, copy_sources};

/// Build system action that runs the unit tests.
pub const TEST_ACTION: &str = "test";

/// Build system action that produces the distribution tree.
pub const DIST_ACTION: &str = "dist";

/// Tuning knobs passed through to the external build system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
  /// Build the distribution with its diagnostic log support.
  pub nsis_log: bool,
  /// Maximum string length of the produced binaries.
  pub max_strlen: u32,
  pub actions: Vec<String>,
}

impl Default for BuildOptions {
  fn default() -> Self {
    Self {
      nsis_log: true,
      max_strlen: 4096,
      actions: vec![TEST_ACTION.to_string(), DIST_ACTION.to_string()],
    }
  }
}

impl BuildOptions {
  /// Request (or drop) the test action; `dist` is always requested.
  pub fn with_tests(mut self, tests: bool) -> Self {
    self.actions = if tests {
      vec![TEST_ACTION.to_string(), DIST_ACTION.to_string()]
    } else {
      vec![DIST_ACTION.to_string()]
    };
    self
  }

  pub fn runs_tests(&self) -> bool {
    self.actions.iter().any(|a| a == TEST_ACTION)
  }
}

/// Locations of the built dependencies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyPaths {
  pub zlib: PathBuf,
  /// Only present when tests are built.
  pub cppunit: Option<PathBuf>,
}

/// Outcome of one target's build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildResult {
  pub target: BuildTarget,
  pub exit_code: i32,
  /// The distribution tree, present on success.
  pub artifact_path: Option<PathBuf>,
}

impl BuildResult {
  pub fn succeeded(target: BuildTarget, artifact_path: PathBuf) -> Self {
    Self {
      target,
      exit_code: 0,
      artifact_path: Some(artifact_path),
    }
  }

  pub fn failed(target: BuildTarget, exit_code: i32) -> Self {
    Self {
      target,
      exit_code,
      artifact_path: None,
    }
  }

  pub fn is_success(&self) -> bool {
    self.exit_code == 0
  }
}

/// Where and with what the external build system runs.
#[derive(Debug, Clone)]
pub struct BuildEnv {
  /// Source tree the build system runs in.
  pub build_dir: PathBuf,
  /// Build system executable.
  pub build_tool: String,
  /// Value of the `DISTNAME` setting.
  pub distro_name: String,
  pub overlay: EnvOverlay,
}

fn yes_no(value: bool) -> &'static str {
  if value { "Yes" } else { "No" }
}

/// The build system's command line for one target, without the program name.
pub fn build_args(
  toolchain: &ToolchainConfig,
  deps: &DependencyPaths,
  version: &VersionTuple,
  options: &BuildOptions,
  distro_name: &str,
) -> Vec<String> {
  let mut args = vec![
    format!("TARGET_ARCH={}", toolchain.arch),
    format!("ZLIB_W32={}", deps.zlib.display()),
    format!("VERSION={}", version),
    format!("VER_MAJOR={}", version.major),
    format!("VER_MINOR={}", version.minor),
    format!("VER_REVISION={}", version.revision),
    format!("VER_BUILD={}", version.build),
    format!("VER_PACKED={}", version.packed()),
    format!("DISTNAME={}", distro_name),
    "STRIP=1".to_string(),
    "SKIP_UTILS=NSIS Menu".to_string(),
    format!("NSIS_CONFIG_LOG={}", yes_no(options.nsis_log)),
    format!("NSIS_CONFIG_LOG_TIMESTAMP={}", yes_no(options.nsis_log)),
    format!("NSIS_MAX_STRLEN={}", options.max_strlen),
  ];

  if toolchain.compiler == Compiler::Gcc {
    if toolchain.native_host {
      args.push("TOOLSET=gcc,gnulink,mingw".to_string());
    }
    args.push("APPEND_LINKFLAGS=-static".to_string());
  }

  if let Some(cppunit) = &deps.cppunit
    && options.runs_tests()
  {
    args.push(format!("APPEND_CPPPATH={}", cppunit.join("include").display()));
    args.push(format!("APPEND_LIBPATH={}", cppunit.join("lib").display()));
  }

  args.extend(options.actions.iter().cloned());
  args
}

/// Run the external build system for `target`.
pub async fn build(
  target: BuildTarget,
  toolchain: &ToolchainConfig,
  deps: &DependencyPaths,
  version: &VersionTuple,
  options: &BuildOptions,
  env: &BuildEnv,
) -> Result<BuildResult, ExecError> {
  let command = BuildCommand::new(&env.build_tool)
    .args(build_args(toolchain, deps, version, options, &env.distro_name))
    .current_dir(&env.build_dir);

  let code = run_command(&command, &env.overlay).await?;
  if code != 0 {
    warn!(build = %target, code, "distribution build failed");
    return Ok(BuildResult::failed(target, code));
  }

  let tree = artifact_tree(&env.build_dir);
  info!(build = %target, tree = %tree.display(), "distribution built");
  Ok(BuildResult::succeeded(target, tree))
}

fn artifact_tree(build_dir: &Path) -> PathBuf {
  instdist_dir(build_dir)
}
