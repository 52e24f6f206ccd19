//! Types for external command execution.

use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors that can occur while running an external command.
#[derive(Debug, Error)]
pub enum ExecError {
  /// The program could not be started at all.
  #[error("failed to spawn '{program}': {source}")]
  Spawn {
    program: String,
    #[source]
    source: std::io::Error,
  },

  /// Command exited non-zero.
  #[error("command failed with exit code {code}: {cmd}")]
  Failed { cmd: String, code: i32 },

  /// The search path could not be assembled (an entry contains the separator).
  #[error("invalid search path entry: {0}")]
  InvalidSearchPath(#[from] std::env::JoinPathsError),

  /// I/O error during execution.
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

/// Exit code reported when a process was terminated without one (e.g. by a signal).
pub const NO_EXIT_CODE: i32 = -1;

/// A single external command: program, arguments and working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildCommand {
  pub program: String,
  pub args: Vec<String>,
  pub cwd: Option<PathBuf>,
}

impl BuildCommand {
  pub fn new(program: impl Into<String>) -> Self {
    Self {
      program: program.into(),
      args: Vec::new(),
      cwd: None,
    }
  }

  pub fn arg(mut self, arg: impl Into<String>) -> Self {
    self.args.push(arg.into());
    self
  }

  pub fn args<I, S>(mut self, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.args.extend(args.into_iter().map(Into::into));
    self
  }

  pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
    self.cwd = Some(dir.as_ref().to_path_buf());
    self
  }
}

impl fmt::Display for BuildCommand {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.program)?;
    for arg in &self.args {
      if arg.contains(' ') {
        write!(f, " \"{}\"", arg)?;
      } else {
        write!(f, " {}", arg)?;
      }
    }
    Ok(())
  }
}

/// Environment changes applied to a single child process.
///
/// The overlay is layered on top of the inherited environment when a command
/// is spawned; the parent process environment is never modified, so concurrent
/// workers with different toolchains cannot observe each other's settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverlay {
  base_path: OsString,
  prepend: Vec<PathBuf>,
  append: Vec<PathBuf>,
  vars: BTreeMap<String, OsString>,
}

impl EnvOverlay {
  /// Create an overlay on top of `base_path` (the inherited `PATH`).
  pub fn new(base_path: impl Into<OsString>) -> Self {
    Self {
      base_path: base_path.into(),
      ..Default::default()
    }
  }

  /// Put `dir` in front of every existing search path entry.
  ///
  /// Later calls win: the most recently prepended directory is searched first.
  pub fn prepend_path(mut self, dir: impl Into<PathBuf>) -> Self {
    self.prepend.insert(0, dir.into());
    self
  }

  /// Put `dir` after every existing search path entry.
  pub fn append_path(mut self, dir: impl Into<PathBuf>) -> Self {
    self.append.push(dir.into());
    self
  }

  /// Set an environment variable for the child.
  pub fn var(mut self, key: impl Into<String>, value: impl AsRef<OsStr>) -> Self {
    self.vars.insert(key.into(), value.as_ref().to_os_string());
    self
  }

  pub fn vars(&self) -> &BTreeMap<String, OsString> {
    &self.vars
  }

  /// The child's `PATH`: prepended entries, inherited entries, appended entries.
  pub fn search_path(&self) -> Result<OsString, ExecError> {
    let inherited = std::env::split_paths(&self.base_path).filter(|p| !p.as_os_str().is_empty());
    let joined = std::env::join_paths(
      self
        .prepend
        .iter()
        .cloned()
        .chain(inherited)
        .chain(self.append.iter().cloned()),
    )?;
    Ok(joined)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn display_quotes_args_with_spaces() {
    let cmd = BuildCommand::new("scons").arg("SKIP_UTILS=NSIS Menu").arg("dist");
    assert_eq!(cmd.to_string(), "scons \"SKIP_UTILS=NSIS Menu\" dist");
  }

  #[test]
  fn search_path_orders_prepend_inherited_append() {
    let base = std::env::join_paths([PathBuf::from("/usr/bin")]).unwrap();
    let overlay = EnvOverlay::new(base)
      .prepend_path("/msys/usr/bin")
      .prepend_path("/mingw/bin")
      .append_path("/help");

    let entries: Vec<PathBuf> = std::env::split_paths(&overlay.search_path().unwrap()).collect();
    assert_eq!(
      entries,
      vec![
        PathBuf::from("/mingw/bin"),
        PathBuf::from("/msys/usr/bin"),
        PathBuf::from("/usr/bin"),
        PathBuf::from("/help"),
      ]
    );
  }

  #[test]
  fn empty_base_path_is_skipped() {
    let overlay = EnvOverlay::new("").prepend_path("/tools");
    let entries: Vec<PathBuf> = std::env::split_paths(&overlay.search_path().unwrap()).collect();
    assert_eq!(entries, vec![PathBuf::from("/tools")]);
  }

  #[test]
  fn failed_error_display() {
    let err = ExecError::Failed {
      cmd: "make".to_string(),
      code: 2,
    };
    assert_eq!(err.to_string(), "command failed with exit code 2: make");
  }
}
