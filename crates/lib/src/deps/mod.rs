//! Third-party build dependencies.
//!
//! [`ensure`] makes a dependency usable for one toolchain: the working copy is
//! cloned or updated, then the toolchain-specific recipe runs unless one of the
//! dependency's known build artifacts already exists.

pub mod fetch;
pub mod recipes;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::execute::{BuildCommand, ExecError, run_command};
use crate::platform::HostEnv;
use crate::toolchain::ToolchainConfig;

pub use fetch::{FetchError, GitSource, SourceControl};

#[derive(Debug, Error)]
pub enum DependencyError {
  #[error("failed to fetch dependency '{name}': {source}")]
  Fetch {
    name: String,
    #[source]
    source: FetchError,
  },

  /// A recipe step exited non-zero; later steps were not run.
  #[error("build recipe failed with exit code {code}: {command}")]
  RecipeFailed { command: String, code: i32 },

  #[error(transparent)]
  Exec(#[from] ExecError),

  #[error("source control task failed: {0}")]
  Join(String),
}

/// Produces the build commands of a dependency for a toolchain.
pub type RecipeFn = dyn Fn(&ToolchainConfig, &Path) -> Vec<BuildCommand> + Send + Sync;

/// A third-party dependency: where it comes from, where it lives, how to build it.
#[derive(Clone)]
pub struct DependencySpec {
  pub name: String,
  pub repository_url: String,
  pub local_path: PathBuf,
  /// Clone depth; 0 clones the full history.
  pub clone_depth: u32,
  /// Paths relative to `local_path`; any one existing means "already built".
  pub built_artifacts: Vec<PathBuf>,
  recipe: Arc<RecipeFn>,
}

impl DependencySpec {
  pub fn new(name: impl Into<String>, repository_url: impl Into<String>, local_path: impl Into<PathBuf>) -> Self {
    Self {
      name: name.into(),
      repository_url: repository_url.into(),
      local_path: local_path.into(),
      clone_depth: 1,
      built_artifacts: Vec::new(),
      recipe: Arc::new(no_recipe),
    }
  }

  pub fn with_depth(mut self, depth: u32) -> Self {
    self.clone_depth = depth;
    self
  }

  pub fn with_built_artifact(mut self, relative: impl Into<PathBuf>) -> Self {
    self.built_artifacts.push(relative.into());
    self
  }

  pub fn with_recipe<F>(mut self, recipe: F) -> Self
  where
    F: Fn(&ToolchainConfig, &Path) -> Vec<BuildCommand> + Send + Sync + 'static,
  {
    self.recipe = Arc::new(recipe);
    self
  }

  /// True when one of the known build artifacts exists.
  pub fn is_built(&self) -> bool {
    self.built_artifacts.iter().any(|p| self.local_path.join(p).exists())
  }

  /// The recipe's command sequence for `toolchain`.
  pub fn build_commands(&self, toolchain: &ToolchainConfig) -> Vec<BuildCommand> {
    (self.recipe)(toolchain, &self.local_path)
  }
}

impl fmt::Debug for DependencySpec {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("DependencySpec")
      .field("name", &self.name)
      .field("repository_url", &self.repository_url)
      .field("local_path", &self.local_path)
      .field("clone_depth", &self.clone_depth)
      .field("built_artifacts", &self.built_artifacts)
      .finish_non_exhaustive()
  }
}

fn no_recipe(_: &ToolchainConfig, _: &Path) -> Vec<BuildCommand> {
  Vec::new()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutOutcome {
  Cloned,
  Updated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
  Built,
  AlreadyBuilt,
}

/// Clone or update, then build if needed.
pub async fn ensure(
  spec: &DependencySpec,
  toolchain: &ToolchainConfig,
  host: &HostEnv,
  vcs: &Arc<dyn SourceControl>,
) -> Result<BuildOutcome, DependencyError> {
  checkout(spec, vcs).await?;
  build(spec, toolchain, host).await
}

/// Update an existing working copy in place, or shallow-clone a new one.
///
/// Safe to repeat: an existing working copy is updated in place, never cloned over.
pub async fn checkout(spec: &DependencySpec, vcs: &Arc<dyn SourceControl>) -> Result<CheckoutOutcome, DependencyError> {
  let vcs = Arc::clone(vcs);
  let url = spec.repository_url.clone();
  let path = spec.local_path.clone();
  let depth = spec.clone_depth;
  let name = spec.name.clone();

  let task = tokio::task::spawn_blocking(move || {
    if fetch::is_checkout(&path) {
      vcs.update(&url, &path, depth).map(|_| CheckoutOutcome::Updated)
    } else {
      if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| FetchError::CreateDir(parent.to_path_buf(), e))?;
      }
      vcs.clone_repo(&url, &path, depth).map(|_| CheckoutOutcome::Cloned)
    }
  });

  let outcome = task
    .await
    .map_err(|e| DependencyError::Join(e.to_string()))?
    .map_err(|source| DependencyError::Fetch { name, source })?;

  info!(dependency = %spec.name, ?outcome, "checkout ready");
  Ok(outcome)
}

/// Run the recipe unless the dependency is already built.
///
/// The first command exiting non-zero aborts the sequence.
pub async fn build(
  spec: &DependencySpec,
  toolchain: &ToolchainConfig,
  host: &HostEnv,
) -> Result<BuildOutcome, DependencyError> {
  if spec.is_built() {
    info!(dependency = %spec.name, "already built");
    return Ok(BuildOutcome::AlreadyBuilt);
  }

  let overlay = toolchain.overlay(host);
  for command in spec.build_commands(toolchain) {
    let code = run_command(&command, &overlay).await?;
    if code != 0 {
      warn!(dependency = %spec.name, cmd = %command, code, "recipe step failed");
      return Err(DependencyError::RecipeFailed {
        command: command.to_string(),
        code,
      });
    }
  }

  info!(dependency = %spec.name, "built");
  Ok(BuildOutcome::Built)
}
