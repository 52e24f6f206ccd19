//! External command execution.
//!
//! Commands inherit the parent's stdio so long-running builds stream their
//! output, and the parent's environment plus the invocation's [`EnvOverlay`].

use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info};

use super::types::{BuildCommand, EnvOverlay, ExecError, NO_EXIT_CODE};

fn prepare(cmd: &BuildCommand, overlay: &EnvOverlay) -> Result<Command, ExecError> {
  let mut command = Command::new(&cmd.program);
  command.args(&cmd.args).env("PATH", overlay.search_path()?);

  for (key, value) in overlay.vars() {
    command.env(key, value);
  }

  if let Some(cwd) = &cmd.cwd {
    command.current_dir(cwd);
  }

  Ok(command)
}

/// Run a command to completion and return its exit code.
///
/// A non-zero exit is not an error here; callers decide whether it is fatal.
pub async fn run_command(cmd: &BuildCommand, overlay: &EnvOverlay) -> Result<i32, ExecError> {
  info!(cmd = %cmd, ">>");

  let mut command = prepare(cmd, overlay)?;
  debug!(program = %cmd.program, cwd = ?cmd.cwd, "spawning process");

  let status = command.status().await.map_err(|source| ExecError::Spawn {
    program: cmd.program.clone(),
    source,
  })?;

  let code = status.code().unwrap_or(NO_EXIT_CODE);
  debug!(cmd = %cmd, code, "process exited");
  Ok(code)
}

/// Run a command and return its trimmed stdout.
pub async fn capture_stdout(cmd: &BuildCommand, overlay: &EnvOverlay) -> Result<String, ExecError> {
  let mut command = prepare(cmd, overlay)?;
  command.stdin(Stdio::null());

  let output = command.output().await.map_err(|source| ExecError::Spawn {
    program: cmd.program.clone(),
    source,
  })?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.is_empty() {
      debug!(stderr = %stderr, "command stderr");
    }
    return Err(ExecError::Failed {
      cmd: cmd.to_string(),
      code: output.status.code().unwrap_or(NO_EXIT_CODE),
    });
  }

  Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

#[cfg(all(test, unix))]
mod tests {
  use super::*;
  use crate::util::testutil::shell_cmd;
  use tempfile::TempDir;

  fn base_overlay() -> EnvOverlay {
    EnvOverlay::new(std::env::var_os("PATH").unwrap_or_default())
  }

  #[tokio::test]
  async fn run_command_reports_exit_code() {
    let code = run_command(&shell_cmd("exit 3"), &base_overlay()).await.unwrap();
    assert_eq!(code, 3);
  }

  #[tokio::test]
  async fn capture_fails_on_non_zero() {
    let result = capture_stdout(&shell_cmd("echo partial; exit 1"), &base_overlay()).await;
    assert!(matches!(result, Err(ExecError::Failed { code: 1, .. })));
  }

  #[tokio::test]
  async fn overlay_vars_reach_child() {
    let overlay = base_overlay().var("NSISDIR", "/trees/x86");
    let out = capture_stdout(&shell_cmd("echo $NSISDIR"), &overlay).await.unwrap();
    assert_eq!(out, "/trees/x86");
  }

  #[tokio::test]
  async fn overlay_prepends_search_path_without_touching_parent() {
    let before = std::env::var_os("PATH");
    let overlay = base_overlay().prepend_path("/toolchain/bin");

    let out = capture_stdout(&shell_cmd("echo $PATH"), &overlay).await.unwrap();

    assert!(out.starts_with("/toolchain/bin"));
    assert_eq!(std::env::var_os("PATH"), before);
  }

  #[tokio::test]
  async fn command_runs_in_cwd() {
    let temp = TempDir::new().unwrap();
    let cmd = shell_cmd("touch cwd_marker").current_dir(temp.path());

    let code = run_command(&cmd, &base_overlay()).await.unwrap();

    assert_eq!(code, 0);
    assert!(temp.path().join("cwd_marker").exists());
  }

  #[tokio::test]
  async fn missing_program_is_spawn_error() {
    let cmd = BuildCommand::new("/nonexistent/program-12345");
    let result = run_command(&cmd, &base_overlay()).await;
    assert!(matches!(result, Err(ExecError::Spawn { .. })));
  }
}
