mod build;
mod clean;
mod local;
mod package;
mod version;

pub use build::{BuildArgs, cmd_build};
pub use clean::cmd_clean;
pub use local::{LocalArgs, cmd_local};
pub use package::cmd_package;
pub use version::cmd_version;
