//! Copying project sources into a per-target build directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use regex::Regex;
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::platform::paths::TARGET_DIR_PREFIX;
use crate::util::fs::copy_preserving_times;

#[derive(Debug, Error)]
pub enum SourceCopyError {
  #[error("invalid source pattern: {0}")]
  Pattern(#[from] regex::Error),

  #[error("failed to walk sources: {0}")]
  Walk(#[from] walkdir::Error),

  #[error("failed to copy '{src}' to '{dst}': {source}")]
  Copy {
    src: PathBuf,
    dst: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Include/exclude patterns over `/`-separated paths relative to the source root.
///
/// Patterns are anchored at the start of the path. A file is copied when it
/// matches at least one include and no exclude.
#[derive(Debug, Clone)]
pub struct SourceFilter {
  include: Vec<Regex>,
  exclude: Vec<Regex>,
}

const DEFAULT_INCLUDE: &[&str] = &[
  r"Contrib.+",
  r"Docs.+",
  r"Examples.+",
  r"Include.+",
  r"Menu.+",
  r"SCons.+",
  r"Scripts.+",
  r"Source.+",
  r"^nsis_.+\.py$",
  r"^nsisconf\.nsh$",
  r"^SCons\S+$",
  r"^COMPILE$",
  r"^COPYING$",
  r"^INSTALL$",
  r"^README.*$",
];

const DEFAULT_EXCLUDE: &[&str] = &[r"Contrib/NScurl/github.*"];

fn compile(patterns: &[&str]) -> Result<Vec<Regex>, regex::Error> {
  patterns.iter().map(|p| Regex::new(&format!("^(?:{})", p))).collect()
}

impl SourceFilter {
  pub fn new(include: &[&str], exclude: &[&str]) -> Result<Self, SourceCopyError> {
    Ok(Self {
      include: compile(include)?,
      exclude: compile(exclude)?,
    })
  }

  /// The project's source layout.
  pub fn project_default() -> Result<Self, SourceCopyError> {
    Self::new(DEFAULT_INCLUDE, DEFAULT_EXCLUDE)
  }

  pub fn accepts(&self, relative: &str) -> bool {
    self.include.iter().any(|r| r.is_match(relative)) && !self.exclude.iter().any(|r| r.is_match(relative))
  }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CopyReport {
  pub copied: usize,
  pub unchanged: usize,
}

/// Copy accepted files from `src_dir` into `dst_dir`.
///
/// A file is copied when the destination is missing or its modification time
/// differs from the source. `dst_dir` may live inside `src_dir`; it is never
/// descended into, and neither are hidden directories or the per-target
/// copies other workers may be writing concurrently.
pub fn copy_sources(src_dir: &Path, dst_dir: &Path, filter: &SourceFilter) -> Result<CopyReport, SourceCopyError> {
  let mut report = CopyReport::default();

  let walker = WalkDir::new(src_dir).min_depth(1).into_iter().filter_entry(|entry| {
    if !entry.file_type().is_dir() {
      return true;
    }
    let name = entry.file_name().to_string_lossy();
    let hidden = name.starts_with('.');
    let target_copy = entry.depth() == 1 && name.starts_with(TARGET_DIR_PREFIX);
    !hidden && !target_copy && entry.path() != dst_dir
  });

  for entry in walker {
    let entry = entry?;
    if !entry.file_type().is_file() {
      continue;
    }

    let Ok(relative) = entry.path().strip_prefix(src_dir) else {
      continue;
    };
    let normalized = relative.to_string_lossy().replace('\\', "/");
    if !filter.accepts(&normalized) {
      continue;
    }

    let dst = dst_dir.join(relative);
    if is_current(entry.path(), &dst) {
      report.unchanged += 1;
      continue;
    }

    debug!(src = %entry.path().display(), dst = %dst.display(), "copy source");
    replace_file(entry.path(), &dst).map_err(|source| SourceCopyError::Copy {
      src: entry.path().to_path_buf(),
      dst: dst.clone(),
      source,
    })?;
    report.copied += 1;
  }

  info!(
    src = %src_dir.display(),
    dst = %dst_dir.display(),
    copied = report.copied,
    unchanged = report.unchanged,
    "sources copied"
  );
  Ok(report)
}

fn is_current(src: &Path, dst: &Path) -> bool {
  let modified = |p: &Path| fs::metadata(p).and_then(|m| m.modified()).ok();
  match (modified(src), modified(dst)) {
    (Some(a), Some(b)) => a == b,
    _ => false,
  }
}

fn replace_file(src: &Path, dst: &Path) -> io::Result<()> {
  if let Some(parent) = dst.parent() {
    fs::create_dir_all(parent)?;
  }
  copy_preserving_times(src, dst)
}
