//! External process execution with per-invocation environments.

pub mod cmd;
pub mod types;

pub use cmd::{capture_stdout, run_command};
pub use types::{BuildCommand, EnvOverlay, ExecError, NO_EXIT_CODE};
