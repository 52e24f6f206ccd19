//! End-to-end orchestration.
//!
//! [`build_target`] is the single-target path: toolchain, dependencies, then
//! the distribution build, with every failure returned as an error.
//! [`run_local`] builds both architectures of one compiler through the
//! coordinator, then merges the trees and synthesizes one installer per
//! architecture.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info};

use crate::config::{ConfigError, ProjectConfig};
use crate::coordinator::{self, RunSummary, Schedule};
use crate::deps::{self, DependencyError, SourceControl, recipes};
use crate::distro::{self, BuildEnv, BuildOptions, BuildResult, DependencyPaths, SourceCopyError, SourceFilter};
use crate::execute::ExecError;
use crate::installer::{self, InstallerError};
use crate::merge::{self, MergeError};
use crate::platform::HostEnv;
use crate::platform::paths::{depend_dir, instdist_dir, target_dir};
use crate::toolchain::{self, Arch, BuildTarget, Compiler, ToolchainError};
use crate::version::VersionTuple;

/// Directory name of the HTML Help Workshop below Program Files (x86).
const HELP_WORKSHOP_DIR: &str = "HTML Help Workshop";

#[derive(Debug, Error)]
pub enum PipelineError {
  #[error(transparent)]
  Toolchain(#[from] ToolchainError),

  #[error(transparent)]
  Dependency(#[from] DependencyError),

  #[error(transparent)]
  Exec(#[from] ExecError),

  #[error(transparent)]
  SourceCopy(#[from] SourceCopyError),

  #[error(transparent)]
  Merge(#[from] MergeError),

  #[error(transparent)]
  Installer(#[from] InstallerError),

  #[error(transparent)]
  Config(#[from] ConfigError),

  #[error("build of {target} failed with exit code {code}")]
  ExternalBuildFailed { target: BuildTarget, code: i32 },

  #[error(
    "directory '{path}' is incompatible with the HTML Help compiler because '{component}' starts with a dot"
  )]
  HelpCompilerPath { path: PathBuf, component: String },

  #[error("background task failed: {0}")]
  Join(String),
}

impl PipelineError {
  /// Exit code reported for a target that failed with this error.
  pub fn exit_code(&self) -> i32 {
    match self {
      Self::ExternalBuildFailed { code, .. } => *code,
      Self::Dependency(DependencyError::RecipeFailed { code, .. }) => *code,
      Self::Installer(InstallerError::ExternalBuildFailed { code, .. }) => *code,
      _ => 1,
    }
  }
}

/// Everything a build needs that does not vary per target.
#[derive(Clone)]
pub struct PipelineContext {
  pub config: ProjectConfig,
  pub host: HostEnv,
  pub vcs: Arc<dyn SourceControl>,
  /// Resolved once for the whole run so every target carries the same version.
  pub version: VersionTuple,
}

/// Reject paths the HTML Help compiler cannot read: any component starting with `.`.
pub fn validate_help_compiler_path(path: &Path) -> Result<(), PipelineError> {
  for component in path.components() {
    if let Component::Normal(name) = component {
      let name = name.to_string_lossy();
      if name.starts_with('.') {
        return Err(PipelineError::HelpCompilerPath {
          path: path.to_path_buf(),
          component: name.into_owned(),
        });
      }
    }
  }
  Ok(())
}

/// The HTML Help Workshop installation, on Windows hosts that have one.
pub fn help_workshop_dir(host: &HostEnv) -> Option<PathBuf> {
  if !host.is_windows() {
    return None;
  }
  host
    .program_files_x86
    .as_ref()
    .map(|dir| dir.join(HELP_WORKSHOP_DIR))
    .filter(|dir| dir.is_dir())
}

/// Build one target in `build_dir`: toolchain, dependencies, distribution.
///
/// A non-zero exit of the build system is returned as
/// [`PipelineError::ExternalBuildFailed`].
pub async fn build_target(
  build_dir: &Path,
  target: BuildTarget,
  options: &BuildOptions,
  ctx: &PipelineContext,
) -> Result<BuildResult, PipelineError> {
  let result = build_target_result(build_dir, target, options, ctx).await?;
  if !result.is_success() {
    return Err(PipelineError::ExternalBuildFailed {
      target,
      code: result.exit_code,
    });
  }
  Ok(result)
}

async fn build_target_result(
  build_dir: &Path,
  target: BuildTarget,
  options: &BuildOptions,
  ctx: &PipelineContext,
) -> Result<BuildResult, PipelineError> {
  info!(build = %target, dir = %build_dir.display(), "building target");
  let toolchain = toolchain::resolve_target(target.compiler, target.arch, &ctx.host).await?;

  let mut overlay = toolchain.overlay(&ctx.host);
  if let Some(help) = help_workshop_dir(&ctx.host) {
    validate_help_compiler_path(build_dir)?;
    overlay = overlay.append_path(help);
  }

  let depend = depend_dir(build_dir);
  let sources = &ctx.config.dependencies;

  let zlib = recipes::zlib_spec(&depend, sources);
  deps::ensure(&zlib, &toolchain, &ctx.host, &ctx.vcs).await?;

  let cppunit = if options.runs_tests() {
    let spec = recipes::cppunit_spec(&depend, sources);
    deps::ensure(&spec, &toolchain, &ctx.host, &ctx.vcs).await?;
    Some(spec.local_path)
  } else {
    None
  };

  let dependencies = DependencyPaths {
    zlib: zlib.local_path,
    cppunit,
  };
  let env = BuildEnv {
    build_dir: build_dir.to_path_buf(),
    build_tool: ctx.config.build_tool.clone(),
    distro_name: ctx.config.distro_name(target.compiler.as_str()),
    overlay,
  };

  let result = distro::build(target, &toolchain, &dependencies, &ctx.version, options, &env).await?;
  Ok(result)
}

/// Copy the sources into the target's own directory and build there.
///
/// Never fails: any error becomes a failed [`BuildResult`] so sibling targets
/// are unaffected.
pub async fn build_target_in_copy(
  work_dir: PathBuf,
  target: BuildTarget,
  options: BuildOptions,
  ctx: Arc<PipelineContext>,
) -> BuildResult {
  let build_dir = target_dir(&work_dir, &target);
  match copy_then_build(&work_dir, &build_dir, target, &options, &ctx).await {
    Ok(result) => result,
    Err(e) => {
      error!(build = %target, error = %e, "target failed");
      BuildResult::failed(target, e.exit_code())
    }
  }
}

async fn copy_then_build(
  work_dir: &Path,
  build_dir: &Path,
  target: BuildTarget,
  options: &BuildOptions,
  ctx: &PipelineContext,
) -> Result<BuildResult, PipelineError> {
  let src = work_dir.to_path_buf();
  let dst = build_dir.to_path_buf();
  tokio::task::spawn_blocking(move || {
    let filter = SourceFilter::project_default()?;
    distro::copy_sources(&src, &dst, &filter)
  })
  .await
  .map_err(|e| PipelineError::Join(e.to_string()))??;

  build_target_result(build_dir, target, options, ctx).await
}

/// Parameters of a local multi-architecture run.
#[derive(Debug, Clone)]
pub struct LocalRequest {
  pub compiler: Compiler,
  pub build_number: u32,
  pub options: BuildOptions,
  pub schedule: Schedule,
  /// Packaging tool verbosity (0..=4).
  pub verbosity: u8,
}

impl LocalRequest {
  pub fn targets(&self) -> Vec<BuildTarget> {
    Arch::ALL
      .iter()
      .map(|arch| BuildTarget::new(self.compiler, *arch, self.build_number))
      .collect()
  }
}

#[derive(Debug)]
pub struct LocalOutcome {
  pub summary: RunSummary,
  /// Installers, in architecture order. Empty when any target failed.
  pub installers: Vec<PathBuf>,
}

impl LocalOutcome {
  pub fn failure_count(&self) -> usize {
    self.summary.error_count()
  }
}

/// Build x86 and amd64, merge their trees and synthesize both installers.
///
/// Target failures are reported through [`LocalOutcome::summary`]; merge and
/// packaging failures are returned as errors.
pub async fn run_local(
  work_dir: &Path,
  request: &LocalRequest,
  ctx: Arc<PipelineContext>,
) -> Result<LocalOutcome, PipelineError> {
  let targets = request.targets();

  let worker_dir = work_dir.to_path_buf();
  let worker_options = request.options.clone();
  let worker_ctx = Arc::clone(&ctx);
  let summary = coordinator::run(&targets, request.schedule, move |target| {
    build_target_in_copy(
      worker_dir.clone(),
      target,
      worker_options.clone(),
      Arc::clone(&worker_ctx),
    )
  })
  .await;

  if !summary.is_success() {
    return Ok(LocalOutcome {
      summary,
      installers: Vec::new(),
    });
  }

  let tree = |arch: Arch| {
    summary
      .results
      .iter()
      .find(|r| r.target.arch == arch)
      .and_then(|r| r.artifact_path.clone())
      .unwrap_or_else(|| instdist_dir(&target_dir(work_dir, &BuildTarget::new(request.compiler, arch, 0))))
  };
  let (x86, amd64) = (tree(Arch::X86), tree(Arch::Amd64));

  merge::merge(&merge::local_rules(&x86, &amd64)?)?;

  let mut installers = Vec::new();
  for (arch, tree) in [(Arch::X86, &x86), (Arch::Amd64, &amd64)] {
    let installer = installer::synthesize(
      tree,
      arch,
      &ctx.version,
      request.verbosity,
      &ctx.config,
      &ctx.host,
    )
    .await?;
    installers.push(installer);
  }

  info!(installers = installers.len(), "all done");
  Ok(LocalOutcome { summary, installers })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::deps::FetchError;
  use crate::platform::Os;
  use tempfile::TempDir;

  struct OfflineSource;

  impl SourceControl for OfflineSource {
    fn clone_repo(&self, url: &str, _dest: &Path, _depth: u32) -> Result<(), FetchError> {
      Err(FetchError::Clone {
        url: url.to_string(),
        source: "offline".into(),
      })
    }

    fn update(&self, _url: &str, _path: &Path, _depth: u32) -> Result<(), FetchError> {
      Ok(())
    }
  }

  fn ctx(os: Os) -> PipelineContext {
    PipelineContext {
      config: ProjectConfig::default(),
      host: HostEnv {
        os: Some(os),
        path: std::env::var_os("PATH").unwrap_or_default(),
        ..HostEnv::default()
      },
      vcs: Arc::new(OfflineSource),
      version: VersionTuple::new(3, 10, 0, 0),
    }
  }

  #[test]
  fn dot_components_are_rejected() {
    let err = validate_help_compiler_path(Path::new("/home/u/.cache/nsis")).unwrap_err();
    match err {
      PipelineError::HelpCompilerPath { component, .. } => assert_eq!(component, ".cache"),
      other => panic!("unexpected error: {}", other),
    }
    assert!(validate_help_compiler_path(Path::new("/home/u/src/build-local-gcc-x86")).is_ok());
  }

  #[test]
  fn no_help_workshop_off_windows() {
    assert_eq!(help_workshop_dir(&ctx(Os::Linux).host), None);
  }

  #[test]
  fn local_request_targets_both_arches() {
    let request = LocalRequest {
      compiler: Compiler::Gcc,
      build_number: 7,
      options: BuildOptions::default(),
      schedule: Schedule::Parallel,
      verbosity: 3,
    };
    let targets = request.targets();
    assert_eq!(targets.len(), 2);
    assert_eq!(targets[0].arch, Arch::X86);
    assert!(targets.iter().all(|t| t.build_number == 7));
  }

  #[test]
  fn exit_code_keeps_external_codes() {
    let target = BuildTarget::new(Compiler::Gcc, Arch::X86, 0);
    assert_eq!(PipelineError::ExternalBuildFailed { target, code: 2 }.exit_code(), 2);
    assert_eq!(PipelineError::Join("x".into()).exit_code(), 1);
  }

  #[tokio::test]
  async fn msvc_off_windows_fails_before_building() {
    let temp = TempDir::new().unwrap();
    let target = BuildTarget::new(Compiler::Msvc, Arch::X86, 0);
    let err = build_target(temp.path(), target, &BuildOptions::default(), &ctx(Os::Linux))
      .await
      .unwrap_err();
    assert!(matches!(
      err,
      PipelineError::Toolchain(ToolchainError::UnsupportedCombination(_))
    ));
  }

  #[tokio::test]
  async fn fetch_failure_fails_the_target_only() {
    let temp = TempDir::new().unwrap();
    let target = BuildTarget::new(Compiler::Gcc, Arch::X86, 0);

    let result = build_target_in_copy(
      temp.path().to_path_buf(),
      target,
      BuildOptions::default(),
      Arc::new(ctx(Os::Linux)),
    )
    .await;

    assert!(!result.is_success());
    assert_eq!(result.exit_code, 1);
  }

  #[tokio::test]
  async fn sequential_local_run_reports_first_failure() {
    let temp = TempDir::new().unwrap();
    let request = LocalRequest {
      compiler: Compiler::Gcc,
      build_number: 0,
      options: BuildOptions::default(),
      schedule: Schedule::Sequential,
      verbosity: 3,
    };

    let outcome = run_local(temp.path(), &request, Arc::new(ctx(Os::Linux))).await.unwrap();

    assert_eq!(outcome.failure_count(), 1);
    assert_eq!(outcome.summary.unattempted.len(), 1);
    assert!(outcome.installers.is_empty());
  }
}
