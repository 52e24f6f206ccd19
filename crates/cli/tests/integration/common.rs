//! Shared test helpers for CLI integration tests.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

/// Isolated working directory.
pub struct TestEnv {
  pub temp: TempDir,
}

impl TestEnv {
  pub fn empty() -> Self {
    Self {
      temp: TempDir::new().unwrap(),
    }
  }

  pub fn path(&self, relative_path: &str) -> PathBuf {
    self.temp.path().join(relative_path)
  }

  /// Write a file relative to the working directory.
  pub fn write_file(&self, relative_path: &str, content: &str) {
    let path = self.temp.path().join(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
  }

  pub fn exists(&self, relative_path: &str) -> bool {
    self.temp.path().join(relative_path).exists()
  }

  pub fn read(&self, relative_path: &str) -> String {
    std::fs::read_to_string(self.temp.path().join(relative_path)).unwrap()
  }

  /// The binary, pointed at this working directory.
  pub fn cmd(&self) -> Command {
    let mut cmd = cargo_bin_cmd!("distforge");
    cmd.env("DISTFORGE_WORKDIR", self.temp.path());
    cmd
  }
}

/// Write a zip archive holding `files`.
pub fn write_zip(path: &Path, files: &[(&str, &[u8])]) {
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent).unwrap();
  }
  let mut writer = zip::ZipWriter::new(File::create(path).unwrap());
  for (name, content) in files {
    writer.start_file(*name, SimpleFileOptions::default()).unwrap();
    writer.write_all(content).unwrap();
  }
  writer.finish().unwrap();
}

/// The bytes of a zip archive holding `files`.
pub fn zip_bytes(files: &[(&str, &[u8])]) -> Vec<u8> {
  let temp = TempDir::new().unwrap();
  let path = temp.path().join("archive.zip");
  write_zip(&path, files);
  std::fs::read(path).unwrap()
}
