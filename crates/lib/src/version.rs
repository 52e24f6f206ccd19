//! Version metadata.
//!
//! Major and minor come from the project configuration, the revision from
//! version-control history and the build number from the caller.

use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::config::ProjectConfig;

const MAJOR_MAX: u32 = 0xFF;
const MINOR_MAX: u32 = 0xFFF;
const BUILD_MAX: u32 = 0xFFF;

/// Matches the svn revision in a `git-svn-id: <url>/trunk@<rev> <uuid>` trailer.
static SVN_REVISION: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"git-svn-id:.*trunk@(\d+)\s").expect("valid svn revision pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VersionTuple {
  pub major: u32,
  pub minor: u32,
  pub revision: u32,
  pub build: u32,
}

impl VersionTuple {
  pub fn new(major: u32, minor: u32, revision: u32, build: u32) -> Self {
    Self {
      major,
      minor,
      revision,
      build,
    }
  }

  /// Packed hexadecimal encoding, see [`packed_version`].
  pub fn packed(&self) -> String {
    packed_version(self.major, self.minor, self.build)
  }
}

impl fmt::Display for VersionTuple {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}.{}.{}.{}", self.major, self.minor, self.revision, self.build)
  }
}

/// Encode as `0xMMmmmbbb`.
///
/// Each field is clamped on its own (major to 0xFF, minor and build to 0xFFF);
/// oversized values are truncated to the maximum, never rejected. The revision
/// does not take part in the encoding.
pub fn packed_version(major: u32, minor: u32, build: u32) -> String {
  format!(
    "0x{:02x}{:03x}{:03x}",
    major.min(MAJOR_MAX),
    minor.min(MINOR_MAX),
    build.min(BUILD_MAX)
  )
}

/// Extract the svn revision from a commit message.
pub fn parse_svn_revision(message: &str) -> Option<u32> {
  SVN_REVISION
    .captures(message)
    .and_then(|caps| caps.get(1))
    .and_then(|m| m.as_str().parse().ok())
}

/// Revision of the newest commit reachable from HEAD that carries a
/// `git-svn-id` trailer. Returns 0 when there is no repository or no such commit.
pub fn revision_from_history(repo_dir: &Path) -> u32 {
  match find_svn_revision(repo_dir) {
    Some(revision) => revision,
    None => {
      debug!(dir = %repo_dir.display(), "no git-svn revision found, using 0");
      0
    }
  }
}

fn find_svn_revision(repo_dir: &Path) -> Option<u32> {
  let repo = gix::discover(repo_dir).ok()?;
  let head = repo.head_commit().ok()?;
  let walk = head.ancestors().all().ok()?;

  for info in walk {
    let commit = info.ok()?.object().ok()?;
    let message = commit.message_raw_sloppy().to_string();
    if let Some(revision) = parse_svn_revision(&message) {
      return Some(revision);
    }
  }
  None
}

/// Current branch name with spaces replaced by `_`; `master` and `main` map to `default`.
pub fn distro_name(repo_dir: &Path, default: &str) -> Option<String> {
  let repo = gix::discover(repo_dir).ok()?;
  let head = repo.head_name().ok()??;
  Some(branch_to_distro(&head.shorten().to_string(), default))
}

fn branch_to_distro(branch: &str, default: &str) -> String {
  let base = branch.rsplit('/').next().unwrap_or(branch).trim().replace(' ', "_");
  match base.as_str() {
    "master" | "main" => default.to_string(),
    _ => base,
  }
}

/// Assemble the version tuple for a build.
pub fn resolve_version(config: &ProjectConfig, repo_dir: &Path, build: u32) -> VersionTuple {
  VersionTuple::new(config.major, config.minor, revision_from_history(repo_dir), build)
}
