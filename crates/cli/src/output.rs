//! Terminal output for the orchestration commands.
//!
//! Progress and results go to stdout, failures and warnings to stderr. Colors
//! are applied only when the stream supports them.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use clap::ValueEnum;
use owo_colors::{OwoColorize, Stream};

use distforge_lib::coordinator::RunSummary;

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    matches!(self, OutputFormat::Json)
  }
}

pub mod symbols {
  pub const SUCCESS: &str = "✓";
  pub const ERROR: &str = "✗";
  pub const WARNING: &str = "⚠";
  pub const INFO: &str = "•";
  pub const REMOVE: &str = "-";
}

/// Wall-clock time of a build, e.g. `850ms`, `12.4s` or `3m 07s`.
pub fn format_duration(duration: Duration) -> String {
  let secs = duration.as_secs();
  match secs {
    0 => format!("{}ms", duration.subsec_millis()),
    1..=59 => format!("{:.1}s", duration.as_secs_f64()),
    _ => format!("{}m {:02}s", secs / 60, secs % 60),
  }
}

pub fn print_success(message: &str) {
  println!(
    "{} {}",
    symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green()),
    message
  );
}

pub fn print_error(message: &str) {
  eprintln!(
    "{} {}",
    symbols::ERROR.if_supports_color(Stream::Stderr, |s| s.red()),
    message.if_supports_color(Stream::Stderr, |s| s.red())
  );
}

pub fn print_warning(message: &str) {
  eprintln!(
    "{} {}",
    symbols::WARNING.if_supports_color(Stream::Stderr, |s| s.yellow()),
    message
  );
}

pub fn print_info(message: &str) {
  println!(
    "{} {}",
    symbols::INFO.if_supports_color(Stream::Stdout, |s| s.blue()),
    message
  );
}

pub fn print_stat(label: &str, value: &str) {
  println!(
    "  {}: {}",
    label.if_supports_color(Stream::Stdout, |s| s.dimmed()),
    value
  );
}

/// A path below `base`, shown relative to it when possible.
pub fn print_path(label: &str, path: &Path, base: &Path) {
  let shown = path.strip_prefix(base).unwrap_or(path);
  print_stat(label, &shown.display().to_string());
}

pub fn print_removed(path: &Path) {
  println!(
    "  {} {}",
    symbols::REMOVE.if_supports_color(Stream::Stdout, |s| s.red()),
    path.display()
  );
}

/// One line per attempted target with its exit code, in schedule order.
pub fn print_target_results(summary: &RunSummary) {
  for result in &summary.results {
    if result.is_success() {
      println!(
        "  {} {}",
        symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green()),
        result.target
      );
    } else {
      println!(
        "  {} {} (exit code {})",
        symbols::ERROR.if_supports_color(Stream::Stdout, |s| s.red()),
        result.target,
        result.exit_code
      );
    }
  }
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", json);
  Ok(())
}
