mod cmd;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use distforge_lib::installer::MAX_VERBOSITY;

use crate::output::OutputFormat;

/// Multi-architecture distribution builder
#[derive(Parser)]
#[command(name = "distforge")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable debug logging
  #[arg(long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Build one architecture in the working directory
  Build {
    /// Output architecture (x86|amd64)
    #[arg(short, long, default_value = "x86")]
    arch: String,

    /// Build number
    #[arg(short, long, default_value_t = 0)]
    build_number: u32,

    /// Compiler (gcc|msvc)
    #[arg(short, long, default_value = "gcc")]
    compiler: String,

    /// Build with logging support
    #[arg(short = 'l', long, default_value = "true", value_parser = parse_bool, action = ArgAction::Set)]
    nsis_log: bool,

    /// Maximum string length of the produced binaries
    #[arg(short = 's', long, default_value_t = 4096)]
    nsis_max_strlen: u32,

    /// Build and run the unit tests
    #[arg(short, long, default_value = "true", value_parser = parse_bool, action = ArgAction::Set)]
    tests: bool,
  },

  /// Build x86 and amd64 from per-architecture source copies, merge them and build both installers
  Local {
    /// Build number
    #[arg(short, long, default_value_t = 0)]
    build_number: u32,

    /// Compiler (gcc|msvc)
    #[arg(short, long, default_value = "gcc")]
    compiler: String,

    /// Build with logging support
    #[arg(short = 'l', long, default_value = "true", value_parser = parse_bool, action = ArgAction::Set)]
    nsis_log: bool,

    /// Maximum string length of the produced binaries
    #[arg(short = 's', long, default_value_t = 4096)]
    nsis_max_strlen: u32,

    /// Build both architectures in parallel; disable to investigate build errors
    #[arg(short, long, default_value = "true", value_parser = parse_bool, action = ArgAction::Set)]
    parallel: bool,

    /// Build and run the unit tests
    #[arg(short, long, default_value = "true", value_parser = parse_bool, action = ArgAction::Set)]
    tests: bool,

    /// Packaging tool verbosity
    #[arg(short = 'v', long, default_value_t = 3, value_parser = clap::value_parser!(u8).range(0..=MAX_VERBOSITY as i64))]
    verbose_level: u8,
  },

  /// Merge CI build artifacts into distribution trees
  Package {
    /// Directory holding the downloaded artifacts
    #[arg(short, long, default_value = "artifacts")]
    artifacts_dir: PathBuf,
  },

  /// Print version metadata
  Version {
    /// Build number
    #[arg(short, long, default_value_t = 0)]
    build_number: u32,

    /// Output format
    #[arg(short, long, value_enum, default_value_t)]
    output: OutputFormat,
  },

  /// Remove generated files from the working directory
  Clean,
}

/// Accepts true/false, yes/no, on/off and 1/0 in any case.
fn parse_bool(value: &str) -> Result<bool, String> {
  match value.to_ascii_lowercase().as_str() {
    "true" | "yes" | "on" | "1" => Ok(true),
    "false" | "no" | "off" | "0" => Ok(false),
    _ => Err(format!("'{}' is not a boolean (use true/false, yes/no, on/off, 1/0)", value)),
  }
}

fn main() -> Result<ExitCode> {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "info" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  match cli.command {
    Commands::Build {
      arch,
      build_number,
      compiler,
      nsis_log,
      nsis_max_strlen,
      tests,
    } => cmd::cmd_build(cmd::BuildArgs {
      arch,
      compiler,
      build_number,
      nsis_log,
      nsis_max_strlen,
      tests,
    }),
    Commands::Local {
      build_number,
      compiler,
      nsis_log,
      nsis_max_strlen,
      parallel,
      tests,
      verbose_level,
    } => cmd::cmd_local(cmd::LocalArgs {
      compiler,
      build_number,
      nsis_log,
      nsis_max_strlen,
      parallel,
      tests,
      verbose_level,
    }),
    Commands::Package { artifacts_dir } => cmd::cmd_package(&artifacts_dir),
    Commands::Version { build_number, output } => cmd::cmd_version(build_number, output),
    Commands::Clean => cmd::cmd_clean(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn lenient_bools() {
    for value in ["true", "YES", "On", "1"] {
      assert_eq!(parse_bool(value), Ok(true));
    }
    for value in ["false", "no", "OFF", "0"] {
      assert_eq!(parse_bool(value), Ok(false));
    }
    assert!(parse_bool("maybe").is_err());
  }

  #[test]
  fn cli_definition_is_valid() {
    use clap::CommandFactory;
    Cli::command().debug_assert();
  }

  #[test]
  fn local_flags_parse() {
    let cli = Cli::try_parse_from(["distforge", "local", "-c", "msvc", "-p", "false", "-v", "4"]).unwrap();
    match cli.command {
      Commands::Local {
        compiler,
        parallel,
        verbose_level,
        tests,
        ..
      } => {
        assert_eq!(compiler, "msvc");
        assert!(!parallel);
        assert_eq!(verbose_level, 4);
        assert!(tests);
      }
      _ => panic!("expected local"),
    }
  }

  #[test]
  fn verbosity_out_of_range_is_rejected() {
    assert!(Cli::try_parse_from(["distforge", "local", "-v", "5"]).is_err());
  }
}
