//! Implementation of the `distforge local` command.
//!
//! Builds both architectures of one compiler, each in its own copy of the
//! sources, then merges the distribution trees and builds one installer per
//! architecture. The exit code is the number of failed architectures.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};

use distforge_lib::config::ProjectConfig;
use distforge_lib::coordinator::Schedule;
use distforge_lib::deps::GitSource;
use distforge_lib::distro::BuildOptions;
use distforge_lib::pipeline::{LocalRequest, PipelineContext, run_local};
use distforge_lib::platform::{HostEnv, paths};
use distforge_lib::toolchain::Compiler;
use distforge_lib::version::resolve_version;
use distforge_lib::workdir_lock::WorkdirLock;

use crate::output::{
  format_duration, print_error, print_info, print_path, print_stat, print_success, print_target_results, print_warning,
};

pub struct LocalArgs {
  pub compiler: String,
  pub build_number: u32,
  pub nsis_log: bool,
  pub nsis_max_strlen: u32,
  pub parallel: bool,
  pub tests: bool,
  pub verbose_level: u8,
}

pub fn cmd_local(args: LocalArgs) -> Result<ExitCode> {
  let start = Instant::now();
  let compiler: Compiler = args.compiler.parse()?;

  let work_dir = paths::work_dir().context("Failed to determine working directory")?;
  let _lock = WorkdirLock::acquire(&work_dir, "local").context("Failed to lock working directory")?;

  let config = ProjectConfig::load(&work_dir)?;
  let version = resolve_version(&config, &work_dir, args.build_number);
  let ctx = Arc::new(PipelineContext {
    config,
    host: HostEnv::capture(),
    vcs: Arc::new(GitSource),
    version,
  });

  let request = LocalRequest {
    compiler,
    build_number: args.build_number,
    options: BuildOptions {
      nsis_log: args.nsis_log,
      max_strlen: args.nsis_max_strlen,
      ..BuildOptions::default()
    }
    .with_tests(args.tests),
    schedule: Schedule::from_parallel(args.parallel),
    verbosity: args.verbose_level,
  };

  print_info(&format!("Building {} {}...", compiler, version));
  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let outcome = rt.block_on(run_local(&work_dir, &request, ctx))?;

  println!();
  print_target_results(&outcome.summary);

  let failed = outcome.failure_count();
  if failed > 0 {
    let total = request.targets().len();
    print_error(&format!("{}/{} architectures failed to build", failed, total));
    for target in &outcome.summary.unattempted {
      print_warning(&format!("{} was not attempted", target));
    }
    print_info("Tip: use --parallel=false to build sequentially and see each architecture's output in order");
    return Ok(ExitCode::from(u8::try_from(failed).unwrap_or(u8::MAX)));
  }

  print_success("All done");
  for installer in &outcome.installers {
    print_path("Installer", installer, &work_dir);
  }
  print_stat("Duration", &format_duration(start.elapsed()));

  Ok(ExitCode::SUCCESS)
}
