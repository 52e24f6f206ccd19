//! Dependency checkout through git.
//!
//! [`SourceControl`] is the seam between the dependency builder and the VCS:
//! [`GitSource`] talks to remotes via `gix`, tests substitute a recorder.

use std::fs;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};

use gix::remote::Direction;
use thiserror::Error;
use tracing::{debug, info};

use crate::util::fs::make_tree_writable;

#[derive(Debug, Error)]
pub enum FetchError {
  #[error("failed to create directory '{0}': {1}")]
  CreateDir(PathBuf, #[source] std::io::Error),

  #[error("failed to clone repository '{url}': {source}")]
  Clone {
    url: String,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },

  #[error("failed to open repository at '{path}': {source}")]
  Open {
    path: PathBuf,
    #[source]
    source: Box<gix::open::Error>,
  },

  #[error("failed to fetch from '{url}': {source}")]
  Fetch {
    url: String,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },

  #[error("failed to checkout '{path}': {source}")]
  Checkout {
    path: PathBuf,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },

  /// The checkout predates remote tracking or was created by hand.
  #[error("no remote configured for repository at '{0}'")]
  NoRemote(PathBuf),

  #[error("failed to replace checkout '{path}': {source}")]
  Replace {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to connect to remote '{url}': {source}")]
  Connect {
    url: String,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },
}

/// Version-control operations needed to keep a dependency checkout current.
pub trait SourceControl: Send + Sync {
  /// Clone `url` into `dest`. A `depth` of 0 clones the full history.
  fn clone_repo(&self, url: &str, dest: &Path, depth: u32) -> Result<(), FetchError>;

  /// Bring an existing checkout at `path` up to date with its remote.
  ///
  /// When the remote moved, the working copy afterwards matches the remote
  /// head; local changes and build outputs inside it are discarded.
  fn update(&self, url: &str, path: &Path, depth: u32) -> Result<(), FetchError>;
}

/// [`SourceControl`] backed by `gix`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitSource;

impl SourceControl for GitSource {
  fn clone_repo(&self, url: &str, dest: &Path, depth: u32) -> Result<(), FetchError> {
    info!(url, path = %dest.display(), depth, "cloning repository");

    let mut prepared = gix::prepare_clone(url, dest).map_err(|e| FetchError::Clone {
      url: url.to_string(),
      source: Box::new(e),
    })?;

    if let Some(depth) = NonZeroU32::new(depth) {
      prepared = prepared.with_shallow(gix::remote::fetch::Shallow::DepthAtRemote(depth));
    }

    let (mut checkout, _outcome) = prepared
      .fetch_then_checkout(gix::progress::Discard, &gix::interrupt::IS_INTERRUPTED)
      .map_err(|e| FetchError::Clone {
        url: url.to_string(),
        source: Box::new(e),
      })?;

    checkout
      .main_worktree(gix::progress::Discard, &gix::interrupt::IS_INTERRUPTED)
      .map_err(|e| FetchError::Checkout {
        path: dest.to_path_buf(),
        source: Box::new(e),
      })?;

    Ok(())
  }

  fn update(&self, url: &str, path: &Path, depth: u32) -> Result<(), FetchError> {
    debug!(url, path = %path.display(), "fetching updates");

    let repo = open_with_identity(path)?;
    fetch_remote(&repo, url, path)?;

    let fetch_err = |source| FetchError::Fetch {
      url: url.to_string(),
      source,
    };
    let Some((head, upstream)) = head_and_upstream(&repo).map_err(fetch_err)? else {
      debug!(path = %path.display(), "no upstream branch, keeping checkout");
      return Ok(());
    };
    if head == upstream {
      debug!(path = %path.display(), %head, "checkout is current");
      return Ok(());
    }
    drop(repo);

    info!(url, path = %path.display(), from = %head, to = %upstream, "upstream moved, replacing checkout");
    let staging = staging_path(path);
    if staging.exists() {
      remove_tree(&staging)?;
    }
    self.clone_repo(url, &staging, depth)?;
    remove_tree(path)?;
    fs::rename(&staging, path).map_err(|source| FetchError::Replace {
      path: path.to_path_buf(),
      source,
    })
  }
}

/// Open a checkout with a fallback committer so ref updates can write reflogs
/// on hosts without a configured git identity.
fn open_with_identity(path: &Path) -> Result<gix::Repository, FetchError> {
  let options = gix::open::Options::default().config_overrides([
    "gitoxide.committer.nameFallback=distforge",
    "gitoxide.committer.emailFallback=distforge@localhost",
  ]);
  gix::open_opts(path, options).map_err(|e| FetchError::Open {
    path: path.to_path_buf(),
    source: Box::new(e),
  })
}

fn fetch_remote(repo: &gix::Repository, url: &str, path: &Path) -> Result<(), FetchError> {
  let remote = repo
    .find_default_remote(Direction::Fetch)
    .ok_or_else(|| FetchError::NoRemote(path.to_path_buf()))?
    .map_err(|e| FetchError::Connect {
      url: url.to_string(),
      source: Box::new(e),
    })?;

  let connection = remote.connect(Direction::Fetch).map_err(|e| FetchError::Connect {
    url: url.to_string(),
    source: Box::new(e),
  })?;

  connection
    .prepare_fetch(gix::progress::Discard, Default::default())
    .map_err(|e| FetchError::Fetch {
      url: url.to_string(),
      source: Box::new(e),
    })?
    .receive(gix::progress::Discard, &gix::interrupt::IS_INTERRUPTED)
    .map_err(|e| FetchError::Fetch {
      url: url.to_string(),
      source: Box::new(e),
    })?;

  Ok(())
}

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// HEAD's commit and the commit of the remote-tracking branch it follows.
///
/// `None` for a detached HEAD or when no tracking ref exists.
fn head_and_upstream(repo: &gix::Repository) -> Result<Option<(gix::ObjectId, gix::ObjectId)>, BoxError> {
  let head = repo.head_id()?.detach();
  let Some(head_ref) = repo.head_ref()? else {
    return Ok(None);
  };

  let tracking = match head_ref.remote_tracking_ref_name(Direction::Fetch) {
    Some(name) => name?.as_bstr().to_string(),
    None => format!("refs/remotes/origin/{}", head_ref.name().shorten()),
  };
  let Some(mut upstream) = repo.try_find_reference(tracking.as_str())? else {
    return Ok(None);
  };

  Ok(Some((head, upstream.peel_to_id()?.detach())))
}

fn staging_path(path: &Path) -> PathBuf {
  let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
  name.push(".update");
  path.with_file_name(name)
}

/// Remove a checkout; git object files are read-only on some hosts.
fn remove_tree(path: &Path) -> Result<(), FetchError> {
  let replace_err = |source| FetchError::Replace {
    path: path.to_path_buf(),
    source,
  };
  if fs::remove_dir_all(path).is_ok() {
    return Ok(());
  }
  make_tree_writable(path).map_err(replace_err)?;
  fs::remove_dir_all(path).map_err(replace_err)
}

/// True when `path` holds a working copy (has version-control metadata).
pub fn is_checkout(path: &Path) -> bool {
  path.join(".git").exists()
}
