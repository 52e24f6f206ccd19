//! Working directory lock and `distforge clean`.

use predicates::prelude::*;

use distforge_lib::workdir_lock::WorkdirLock;

use crate::common::TestEnv;

#[test]
fn clean_removes_generated_entries_only() {
  let env = TestEnv::empty();
  env.write_file("build-local/x86/config.log", "log");
  env.write_file(".depend/zlib/zlib1.dll", "dll");
  env.write_file("instdist-x86/makensis.exe", "exe");
  env.write_file("Source/__pycache__/mod.pyc", "pyc");
  env.write_file("Source/main.c", "int main;");
  env.write_file("SConstruct", "");

  env
    .cmd()
    .arg("clean")
    .assert()
    .success()
    .stdout(predicate::str::contains("Removed"));

  assert!(!env.exists("build-local"));
  assert!(!env.exists(".depend"));
  assert!(!env.exists("instdist-x86"));
  assert!(!env.exists("Source/__pycache__"));
  assert!(env.exists("Source/main.c"));
  assert!(env.exists("SConstruct"));
}

#[test]
fn locked_workdir_rejects_clean() {
  let env = TestEnv::empty();
  env.write_file("build-local/x86/config.log", "log");
  let _lock = WorkdirLock::acquire(env.temp.path(), "local").unwrap();

  env
    .cmd()
    .arg("clean")
    .assert()
    .failure()
    .stderr(predicate::str::contains("locked by another process"));

  assert!(env.exists("build-local"));
}

#[test]
fn lock_is_released_after_command() {
  let env = TestEnv::empty();
  env.cmd().arg("clean").assert().success();
  env.cmd().arg("clean").assert().success();
}
