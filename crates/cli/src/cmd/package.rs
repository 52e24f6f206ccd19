//! Implementation of the `distforge package` command.

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};

use distforge_lib::package::package;
use distforge_lib::platform::paths;
use distforge_lib::workdir_lock::WorkdirLock;

use crate::output::{print_info, print_path, print_stat, print_success};

pub fn cmd_package(artifacts_dir: &Path) -> Result<ExitCode> {
  let work_dir = paths::work_dir().context("Failed to determine working directory")?;
  let _lock = WorkdirLock::acquire(&work_dir, "package").context("Failed to lock working directory")?;

  let artifacts = work_dir.join(artifacts_dir);
  let report = package(&artifacts, &work_dir).context("Packaging failed")?;

  if report.trees.is_empty() {
    print_info(&format!("No build artifacts found in {}", artifacts.display()));
  } else {
    print_success("Packaging complete");
  }
  for tree in &report.trees {
    print_path("Tree", tree, &work_dir);
  }
  print_stat("Archives extracted", &report.extracted.len().to_string());
  print_stat("Files merged", &report.merge.copied.len().to_string());

  Ok(ExitCode::SUCCESS)
}
