//! Distribution tree merging.
//!
//! A merge pass applies an ordered list of [`MergeRule`]s. Each rule copies
//! matching files from its source directory into its destination directory,
//! but only files the destination does not have yet. Nothing in a destination
//! is ever overwritten or deleted, so repeating a pass changes nothing.

pub mod rules;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use regex::Regex;
use thiserror::Error;
use tracing::{debug, info};

use crate::util::fs::copy_preserving_times;

pub use rules::{WindowsTrees, local_rules, package_rules};

#[derive(Debug, Error)]
pub enum MergeError {
  #[error("invalid merge pattern '{pattern}': {source}")]
  Pattern {
    pattern: String,
    #[source]
    source: regex::Error,
  },

  #[error("failed to list '{path}': {source}")]
  ReadDir {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to copy '{src}' to '{dst}': {source}")]
  Copy {
    src: PathBuf,
    dst: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Copy files named like `pattern` from `source` into `destination` when absent there.
///
/// The pattern is anchored at the start of the file name, not at the end:
/// `makensisw\.exe` also matches `makensisw.exe.manifest`.
#[derive(Debug, Clone)]
pub struct MergeRule {
  pub source: PathBuf,
  pub destination: PathBuf,
  pattern: Regex,
}

impl MergeRule {
  pub fn new(source: impl Into<PathBuf>, pattern: &str, destination: impl Into<PathBuf>) -> Result<Self, MergeError> {
    let anchored = format!("^(?:{})", pattern);
    let pattern = Regex::new(&anchored).map_err(|source| MergeError::Pattern {
      pattern: pattern.to_string(),
      source,
    })?;

    Ok(Self {
      source: source.into(),
      destination: destination.into(),
      pattern,
    })
  }

  pub fn matches(&self, file_name: &str) -> bool {
    self.pattern.is_match(file_name)
  }

  /// The pattern as written, without the added anchor.
  pub fn pattern(&self) -> &str {
    let anchored = self.pattern.as_str();
    anchored
      .strip_prefix("^(?:")
      .and_then(|p| p.strip_suffix(')'))
      .unwrap_or(anchored)
  }
}

/// Files copied by one merge pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MergeReport {
  pub copied: Vec<PathBuf>,
}

impl MergeReport {
  pub fn is_empty(&self) -> bool {
    self.copied.is_empty()
  }
}

/// Apply `rules` in order.
pub fn merge(rules: &[MergeRule]) -> Result<MergeReport, MergeError> {
  let mut report = MergeReport::default();
  for rule in rules {
    apply_rule(rule, &mut report)?;
  }
  info!(copied = report.copied.len(), "merge pass complete");
  Ok(report)
}

fn apply_rule(rule: &MergeRule, report: &mut MergeReport) -> Result<(), MergeError> {
  if !rule.source.is_dir() {
    debug!(src = %rule.source.display(), "merge source missing, skipping rule");
    return Ok(());
  }

  for (name, src) in matching_files(rule)? {
    let dst = rule.destination.join(&name);
    if dst.exists() {
      continue;
    }

    fs::create_dir_all(&rule.destination).map_err(|source| MergeError::Copy {
      src: src.clone(),
      dst: dst.clone(),
      source,
    })?;
    info!(src = %src.display(), dst = %dst.display(), "copy");
    copy_preserving_times(&src, &dst).map_err(|source| MergeError::Copy {
      src: src.clone(),
      dst: dst.clone(),
      source,
    })?;
    report.copied.push(dst);
  }

  Ok(())
}

/// Regular files directly under the rule's source whose name matches, sorted by name.
fn matching_files(rule: &MergeRule) -> Result<Vec<(String, PathBuf)>, MergeError> {
  let read_dir_err = |source| MergeError::ReadDir {
    path: rule.source.clone(),
    source,
  };

  let mut files = Vec::new();
  for entry in fs::read_dir(&rule.source).map_err(read_dir_err)? {
    let entry = entry.map_err(read_dir_err)?;
    let Some(name) = entry.file_name().to_str().map(str::to_string) else {
      continue;
    };
    let path = entry.path();
    if rule.matches(&name) && path.is_file() {
      files.push((name, path));
    }
  }
  files.sort();
  Ok(files)
}

/// Convenience for rules built from a tree root and a relative sub-directory.
pub(crate) fn sub(root: &Path, parts: &[&str]) -> PathBuf {
  parts.iter().fold(root.to_path_buf(), |path, part| path.join(part))
}
