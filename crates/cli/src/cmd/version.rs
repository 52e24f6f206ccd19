//! Implementation of the `distforge version` command.

use std::process::ExitCode;

use anyhow::{Context, Result};

use distforge_lib::config::ProjectConfig;
use distforge_lib::platform::paths;
use distforge_lib::version::{distro_name, resolve_version};

use crate::output::{OutputFormat, print_json};

pub fn cmd_version(build_number: u32, output: OutputFormat) -> Result<ExitCode> {
  let work_dir = paths::work_dir().context("Failed to determine working directory")?;
  let config = ProjectConfig::load(&work_dir)?;

  let version = resolve_version(&config, &work_dir, build_number);
  let distro = distro_name(&work_dir, &config.distro_prefix).unwrap_or_else(|| config.distro_prefix.clone());

  if output.is_json() {
    print_json(&serde_json::json!({
      "version": version.to_string(),
      "packed_version": version.packed(),
      "distro_name": distro,
      "fields": version,
    }))?;
  } else {
    println!("version={}", version);
    println!("packed_version={}", version.packed());
    println!("distro_name={}", distro);
  }

  Ok(ExitCode::SUCCESS)
}
