//! Host detection and working-directory layout.

pub mod host;
pub mod os;
pub mod paths;

pub use host::HostEnv;
pub use os::Os;
