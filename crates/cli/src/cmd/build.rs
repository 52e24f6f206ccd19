//! Implementation of the `distforge build` command.
//!
//! Builds one architecture directly in the working directory. Every failure
//! is fatal.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};

use distforge_lib::config::ProjectConfig;
use distforge_lib::deps::GitSource;
use distforge_lib::distro::BuildOptions;
use distforge_lib::pipeline::{PipelineContext, build_target};
use distforge_lib::platform::{HostEnv, paths};
use distforge_lib::toolchain::{Arch, BuildTarget, Compiler};
use distforge_lib::version::resolve_version;

use crate::output::{format_duration, print_path, print_stat, print_success};

pub struct BuildArgs {
  pub arch: String,
  pub compiler: String,
  pub build_number: u32,
  pub nsis_log: bool,
  pub nsis_max_strlen: u32,
  pub tests: bool,
}

pub fn cmd_build(args: BuildArgs) -> Result<ExitCode> {
  let start = Instant::now();
  let compiler: Compiler = args.compiler.parse()?;
  let arch: Arch = args.arch.parse()?;

  let work_dir = paths::work_dir().context("Failed to determine working directory")?;
  let config = ProjectConfig::load(&work_dir)?;
  let version = resolve_version(&config, &work_dir, args.build_number);

  let ctx = PipelineContext {
    config,
    host: HostEnv::capture(),
    vcs: Arc::new(GitSource),
    version,
  };
  let options = BuildOptions {
    nsis_log: args.nsis_log,
    max_strlen: args.nsis_max_strlen,
    ..BuildOptions::default()
  }
  .with_tests(args.tests);
  let target = BuildTarget::new(compiler, arch, args.build_number);

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let result = rt
    .block_on(build_target(&work_dir, target, &options, &ctx))
    .with_context(|| format!("Build of {} failed", target))?;

  println!();
  print_success(&format!("Built {} {}", target, version));
  if let Some(tree) = &result.artifact_path {
    print_path("Distribution", tree, &work_dir);
  }
  print_stat("Duration", &format_duration(start.elapsed()));

  Ok(ExitCode::SUCCESS)
}
