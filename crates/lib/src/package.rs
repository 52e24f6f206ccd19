//! Packaging of CI build artifacts.
//!
//! Each CI job uploads an outer `<name>-gcc.zip` holding an inner
//! `nsis-<version>.zip`. Packaging extracts both levels, moves each inner
//! archive's root directory to a canonical tree in the working directory and
//! then runs the package merge rules over those trees.

use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use tracing::{debug, info};

use crate::merge::{self, MergeError, MergeReport, WindowsTrees};
use crate::toolchain::Arch;

#[derive(Debug, Error)]
pub enum PackageError {
  #[error("artifacts directory '{0}' does not exist")]
  MissingArtifacts(PathBuf),

  #[error("failed to read '{path}': {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("invalid archive '{path}': {source}")]
  Archive {
    path: PathBuf,
    #[source]
    source: zip::result::ZipError,
  },

  #[error("archive '{0}' has an unsafe entry name")]
  UnsafeEntry(PathBuf),

  #[error("archive '{0}' is empty")]
  EmptyArchive(PathBuf),

  #[error(transparent)]
  Merge(#[from] MergeError),
}

/// Host a CI tree was built on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeHost {
  Ubuntu,
  Windows,
}

impl TreeHost {
  fn as_str(&self) -> &'static str {
    match self {
      Self::Ubuntu => "ubuntu",
      Self::Windows => "windows",
    }
  }
}

/// Canonical tree directory name, e.g. `.instdist-ubuntu-x86`.
pub fn tree_name(host: TreeHost, arch: Arch) -> String {
  format!(".instdist-{}-{}", host.as_str(), arch)
}

static OUTER_ARCHIVE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^.*-gcc\.zip$").expect("valid outer archive pattern"));
static INNER_ARCHIVE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^nsis-.+\.zip$").expect("valid inner archive pattern"));
static ARTIFACT_DIR: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^.+-(ubuntu|windows)-latest-(x86|amd64)-gcc$").expect("valid artifact directory pattern")
});

/// Canonical tree for an extracted artifact directory name, if it is one.
pub fn classify_artifact_dir(name: &str) -> Option<(TreeHost, Arch)> {
  let caps = ARTIFACT_DIR.captures(name)?;
  let host = match caps.get(1)?.as_str() {
    "ubuntu" => TreeHost::Ubuntu,
    _ => TreeHost::Windows,
  };
  let arch = caps.get(2)?.as_str().parse().ok()?;
  Some((host, arch))
}

/// What a packaging run produced.
#[derive(Debug, Default)]
pub struct PackageReport {
  pub extracted: Vec<PathBuf>,
  pub trees: Vec<PathBuf>,
  pub merge: MergeReport,
}

/// Extract the artifacts in `artifacts_dir` into canonical trees below `work_dir` and merge them.
pub fn package(artifacts_dir: &Path, work_dir: &Path) -> Result<PackageReport, PackageError> {
  if !artifacts_dir.is_dir() {
    return Err(PackageError::MissingArtifacts(artifacts_dir.to_path_buf()));
  }

  let mut report = PackageReport::default();

  for (name, path) in list(artifacts_dir)? {
    if !OUTER_ARCHIVE.is_match(&name) || !path.is_file() {
      continue;
    }
    let unzip_dir = path.with_extension("");
    if unzip_dir.exists() {
      debug!(dir = %unzip_dir.display(), "already extracted");
      continue;
    }
    info!(archive = %path.display(), dest = %unzip_dir.display(), "extract");
    extract_zip(&path, &unzip_dir)?;
    report.extracted.push(unzip_dir);
  }

  for (name, dir) in list(artifacts_dir)? {
    if !dir.is_dir() {
      continue;
    }
    let Some((host, arch)) = classify_artifact_dir(&name) else {
      continue;
    };
    let tree = work_dir.join(tree_name(host, arch));

    for (inner, archive) in list(&dir)? {
      if !INNER_ARCHIVE.is_match(&inner) {
        continue;
      }
      info!(archive = %archive.display(), dest = %artifacts_dir.display(), "extract");
      let root = extract_zip(&archive, artifacts_dir)?;
      replace_tree(&artifacts_dir.join(root), &tree)?;
      report.trees.push(tree.clone());
    }
  }

  let windows = WindowsTrees {
    x86: Some(work_dir.join(tree_name(TreeHost::Windows, Arch::X86))),
    amd64: Some(work_dir.join(tree_name(TreeHost::Windows, Arch::Amd64))),
  };
  let rules = merge::package_rules(
    &work_dir.join(tree_name(TreeHost::Ubuntu, Arch::X86)),
    &work_dir.join(tree_name(TreeHost::Ubuntu, Arch::Amd64)),
    &windows,
  )?;
  report.merge = merge::merge(&rules)?;

  Ok(report)
}

/// Directory entries sorted by name.
fn list(dir: &Path) -> Result<Vec<(String, PathBuf)>, PackageError> {
  let io_err = |source| PackageError::Io {
    path: dir.to_path_buf(),
    source,
  };
  let mut entries = Vec::new();
  for entry in fs::read_dir(dir).map_err(io_err)? {
    let entry = entry.map_err(io_err)?;
    entries.push((entry.file_name().to_string_lossy().into_owned(), entry.path()));
  }
  entries.sort();
  Ok(entries)
}

fn replace_tree(from: &Path, to: &Path) -> Result<(), PackageError> {
  let io_err = |source| PackageError::Io {
    path: to.to_path_buf(),
    source,
  };
  if to.exists() {
    fs::remove_dir_all(to).map_err(io_err)?;
  }
  info!(from = %from.display(), to = %to.display(), "rename");
  fs::rename(from, to).map_err(io_err)
}

/// Extract `archive` into `dest`; returns the first path component of the first entry.
fn extract_zip(archive_path: &Path, dest: &Path) -> Result<String, PackageError> {
  let io_err = |source| PackageError::Io {
    path: archive_path.to_path_buf(),
    source,
  };
  let zip_err = |source| PackageError::Archive {
    path: archive_path.to_path_buf(),
    source,
  };

  let file = File::open(archive_path).map_err(io_err)?;
  let mut archive = zip::ZipArchive::new(BufReader::new(file)).map_err(zip_err)?;
  let mut root = None;

  for i in 0..archive.len() {
    let mut entry = archive.by_index(i).map_err(zip_err)?;
    let relative = entry
      .enclosed_name()
      .ok_or_else(|| PackageError::UnsafeEntry(archive_path.to_path_buf()))?;

    if root.is_none() {
      root = relative
        .components()
        .next()
        .map(|c| c.as_os_str().to_string_lossy().into_owned());
    }

    let out = dest.join(&relative);
    if entry.is_dir() {
      fs::create_dir_all(&out).map_err(io_err)?;
      continue;
    }
    if let Some(parent) = out.parent() {
      fs::create_dir_all(parent).map_err(io_err)?;
    }
    let mut outfile = File::create(&out).map_err(io_err)?;
    io::copy(&mut entry, &mut outfile).map_err(io_err)?;

    #[cfg(unix)]
    {
      use std::os::unix::fs::PermissionsExt;
      if let Some(mode) = entry.unix_mode() {
        fs::set_permissions(&out, fs::Permissions::from_mode(mode)).map_err(io_err)?;
      }
    }
  }

  root.ok_or_else(|| PackageError::EmptyArchive(archive_path.to_path_buf()))
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Write;
  use tempfile::TempDir;
  use zip::write::SimpleFileOptions;

  fn write_zip(path: &Path, files: &[(&str, &[u8])]) {
    let mut writer = zip::ZipWriter::new(File::create(path).unwrap());
    for (name, content) in files {
      writer.start_file(*name, SimpleFileOptions::default()).unwrap();
      writer.write_all(content).unwrap();
    }
    writer.finish().unwrap();
  }

  fn zip_bytes(files: &[(&str, &[u8])]) -> Vec<u8> {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("inner.zip");
    write_zip(&path, files);
    fs::read(path).unwrap()
  }

  #[test]
  fn archive_names() {
    assert!(OUTER_ARCHIVE.is_match("artifacts-ubuntu-latest-x86-gcc.zip"));
    assert!(!OUTER_ARCHIVE.is_match("artifacts-windows-latest-x86-msvc.zip"));
    assert!(INNER_ARCHIVE.is_match("nsis-3.10.0.0-x86.zip"));
    assert!(!INNER_ARCHIVE.is_match("logs-nsis-3.10.zip"));
  }

  #[test]
  fn classifies_ci_directories() {
    assert_eq!(
      classify_artifact_dir("artifacts-ubuntu-latest-x86-gcc"),
      Some((TreeHost::Ubuntu, Arch::X86))
    );
    assert_eq!(
      classify_artifact_dir("artifacts-windows-latest-amd64-gcc"),
      Some((TreeHost::Windows, Arch::Amd64))
    );
    assert_eq!(classify_artifact_dir("artifacts-macos-latest-x86-gcc"), None);
    assert_eq!(classify_artifact_dir("ubuntu-latest-x86-gcc"), None);
  }

  #[test]
  fn tree_names() {
    assert_eq!(tree_name(TreeHost::Ubuntu, Arch::Amd64), ".instdist-ubuntu-amd64");
  }

  #[test]
  fn missing_artifacts_dir_is_an_error() {
    let temp = TempDir::new().unwrap();
    let err = package(&temp.path().join("artifacts"), temp.path()).unwrap_err();
    assert!(matches!(err, PackageError::MissingArtifacts(_)));
  }

  #[test]
  fn extracts_both_levels_and_merges() {
    let temp = TempDir::new().unwrap();
    let work = temp.path();
    let artifacts = work.join("artifacts");
    fs::create_dir_all(&artifacts).unwrap();

    let x86_inner = zip_bytes(&[
      ("nsis-3.10.0.0/Bin/makensisw.exe", b"gui".as_slice()),
      ("nsis-3.10.0.0/Plugins/x86-unicode/System.dll", b"sys32".as_slice()),
    ]);
    let amd64_inner = zip_bytes(&[("nsis-3.10.0.0/Bin/makensis", b"cli64".as_slice())]);

    write_zip(
      &artifacts.join("artifacts-ubuntu-latest-x86-gcc.zip"),
      &[("nsis-3.10.0.0-x86.zip", x86_inner.as_slice())],
    );
    write_zip(
      &artifacts.join("artifacts-ubuntu-latest-amd64-gcc.zip"),
      &[("nsis-3.10.0.0-amd64.zip", amd64_inner.as_slice())],
    );

    let report = package(&artifacts, work).unwrap();

    let x86 = work.join(".instdist-ubuntu-x86");
    let amd64 = work.join(".instdist-ubuntu-amd64");
    assert_eq!(report.extracted.len(), 2);
    assert_eq!(report.trees, vec![amd64.clone(), x86.clone()]);
    assert!(x86.join("makensisw.exe").exists());
    assert_eq!(
      fs::read(amd64.join("Plugins/x86-unicode/System.dll")).unwrap(),
      b"sys32"
    );
    assert!(amd64.join("Bin/makensis").exists());
  }

  #[test]
  fn already_extracted_outer_archive_is_skipped() {
    let temp = TempDir::new().unwrap();
    let artifacts = temp.path().join("artifacts");
    fs::create_dir_all(artifacts.join("a-ubuntu-latest-x86-gcc")).unwrap();
    write_zip(&artifacts.join("a-ubuntu-latest-x86-gcc.zip"), &[("unused.txt", b"x".as_slice())]);

    let report = package(&artifacts, temp.path()).unwrap();
    assert!(report.extracted.is_empty());
    assert!(!artifacts.join("a-ubuntu-latest-x86-gcc/unused.txt").exists());
  }

  #[test]
  fn repackaging_replaces_previous_tree() {
    let temp = TempDir::new().unwrap();
    let work = temp.path();
    let artifacts = work.join("artifacts");
    let dir = artifacts.join("a-windows-latest-x86-gcc");
    fs::create_dir_all(&dir).unwrap();
    fs::create_dir_all(work.join(".instdist-windows-x86")).unwrap();
    fs::write(work.join(".instdist-windows-x86/stale.txt"), "old").unwrap();

    let inner = dir.join("nsis-3.10.zip");
    write_zip(&inner, &[("nsis-3.10/makensis.exe", b"exe".as_slice())]);

    package(&artifacts, work).unwrap();
    assert!(work.join(".instdist-windows-x86/makensis.exe").exists());
    assert!(!work.join(".instdist-windows-x86/stale.txt").exists());
  }
}
