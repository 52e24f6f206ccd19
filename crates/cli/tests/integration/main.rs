//! CLI integration tests.

mod common;
mod local_tests;
mod package_tests;
mod version_tests;
mod workdir_tests;
