//! Test utilities for distforge-lib.

use crate::execute::BuildCommand;

/// A command running `script` through the platform shell.
#[cfg(unix)]
pub fn shell_cmd(script: &str) -> BuildCommand {
  BuildCommand::new("/bin/sh").arg("-c").arg(script)
}

#[cfg(windows)]
pub fn shell_cmd(script: &str) -> BuildCommand {
  BuildCommand::new("cmd.exe").arg("/C").arg(script)
}

/// A command that always succeeds.
pub fn ok_cmd() -> BuildCommand {
  shell_cmd("exit 0")
}

/// A command that exits with `code`.
pub fn exit_cmd(code: i32) -> BuildCommand {
  shell_cmd(&format!("exit {}", code))
}
