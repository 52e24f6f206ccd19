//! Removal of generated entries from the working directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::platform::paths::TARGET_DIR_PREFIX;
use crate::util::fs::make_tree_writable;

#[derive(Debug, Error)]
pub enum CleanError {
  #[error("failed to list '{path}': {source}")]
  List {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to remove '{path}': {source}")]
  Remove {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Top-level entry names produced by builds.
const GENERATED: &[Generated] = &[
  Generated::Exact(".vs"),
  Generated::Exact(".depend"),
  Generated::Prefix("instdist-"),
  Generated::Prefix(".instdist-"),
  Generated::Exact(".scons_temp"),
  Generated::Exact(".test"),
  Generated::Prefix(TARGET_DIR_PREFIX),
  Generated::Exact("build"),
  Generated::Exact(".sconsign.dblite"),
  Generated::Exact("config.log"),
];

/// Directory name removed at any depth.
const BYTECODE_CACHE: &str = "__pycache__";

#[derive(Debug, Clone, Copy)]
enum Generated {
  Exact(&'static str),
  Prefix(&'static str),
}

impl Generated {
  fn matches(&self, name: &str) -> bool {
    match self {
      Self::Exact(exact) => name == *exact,
      Self::Prefix(prefix) => name.starts_with(prefix),
    }
  }
}

pub fn is_generated(name: &str) -> bool {
  GENERATED.iter().any(|g| g.matches(name))
}

/// Remove every generated entry below `work_dir`; returns what was removed.
pub fn clean(work_dir: &Path) -> Result<Vec<PathBuf>, CleanError> {
  let mut targets = Vec::new();

  let entries = fs::read_dir(work_dir).map_err(|source| CleanError::List {
    path: work_dir.to_path_buf(),
    source,
  })?;
  for entry in entries.flatten() {
    if is_generated(&entry.file_name().to_string_lossy()) {
      targets.push(entry.path());
    }
  }

  let caches = WalkDir::new(work_dir)
    .min_depth(1)
    .into_iter()
    .filter_entry(|e| !(e.file_type().is_dir() && e.file_name().to_string_lossy().starts_with('.')))
    .filter_map(Result::ok)
    .filter(|e| e.file_type().is_dir() && e.file_name() == BYTECODE_CACHE)
    .map(|e| e.into_path());
  for cache in caches {
    if !targets.iter().any(|t| cache.starts_with(t)) {
      targets.push(cache);
    }
  }

  targets.sort();
  let mut removed = Vec::new();
  for target in targets {
    if remove(&target)? {
      removed.push(target);
    }
  }

  info!(dir = %work_dir.display(), removed = removed.len(), "clean complete");
  Ok(removed)
}

/// Remove a file or directory tree. Read-only entries are made writable and the
/// removal retried. Returns false when the entry was already gone.
fn remove(path: &Path) -> Result<bool, CleanError> {
  let remove_err = |source| CleanError::Remove {
    path: path.to_path_buf(),
    source,
  };

  match remove_once(path) {
    Ok(()) => {
      info!(path = %path.display(), "removed");
      Ok(true)
    }
    Err(e) if e.kind() == io::ErrorKind::NotFound => {
      debug!(path = %path.display(), "already gone");
      Ok(false)
    }
    Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
      warn!(path = %path.display(), "clearing read-only attributes");
      make_tree_writable(path).map_err(remove_err)?;
      remove_once(path).map_err(remove_err)?;
      info!(path = %path.display(), "removed");
      Ok(true)
    }
    Err(e) => Err(remove_err(e)),
  }
}

fn remove_once(path: &Path) -> io::Result<()> {
  let metadata = fs::symlink_metadata(path)?;
  if metadata.is_dir() {
    fs::remove_dir_all(path)
  } else {
    fs::remove_file(path)
  }
}
