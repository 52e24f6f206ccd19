//! Implementation of the `distforge clean` command.

use std::process::ExitCode;

use anyhow::{Context, Result};

use distforge_lib::clean::clean;
use distforge_lib::platform::paths;
use distforge_lib::workdir_lock::WorkdirLock;

use crate::output::{print_info, print_removed, print_success};

pub fn cmd_clean() -> Result<ExitCode> {
  let work_dir = paths::work_dir().context("Failed to determine working directory")?;
  let _lock = WorkdirLock::acquire(&work_dir, "clean").context("Failed to lock working directory")?;

  let removed = clean(&work_dir).context("Clean failed")?;
  if removed.is_empty() {
    print_info("Nothing to clean");
    return Ok(ExitCode::SUCCESS);
  }

  for path in &removed {
    print_removed(path.strip_prefix(&work_dir).unwrap_or(path));
  }
  print_success(&format!("Removed {} entries", removed.len()));

  Ok(ExitCode::SUCCESS)
}
