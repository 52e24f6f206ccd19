//! distforge-lib: multi-architecture build orchestration.
//!
//! The pieces, leaf first:
//! - `toolchain`: locate a compiler installation and describe it as an immutable config
//! - `deps`: fetch and build third-party dependencies
//! - `distro`: run the external build system for one target
//! - `coordinator`: run several targets and collect their results
//! - `merge`: share files between per-architecture distribution trees
//! - `installer`: run the packaging tool against a merged tree
//!
//! `pipeline` wires them together for the command-line front-end.

pub mod clean;
pub mod config;
pub mod consts;
pub mod coordinator;
pub mod deps;
pub mod distro;
pub mod execute;
pub mod installer;
pub mod merge;
pub mod package;
pub mod pipeline;
pub mod platform;
pub mod toolchain;
pub mod util;
pub mod version;
pub mod workdir_lock;
