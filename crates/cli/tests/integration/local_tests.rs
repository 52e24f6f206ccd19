//! `distforge local` argument handling that fails before any build starts.

use predicates::prelude::*;

use crate::common::TestEnv;

#[test]
fn unknown_compiler_fails_before_locking() {
  let env = TestEnv::empty();
  env
    .cmd()
    .args(["local", "-c", "tcc"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("unknown compiler 'tcc'"));

  assert!(!env.exists(".distforge.lock"));
}

#[test]
fn short_flags_accept_loose_booleans() {
  let env = TestEnv::empty();
  env
    .cmd()
    .args(["local", "-p", "on", "-t", "no", "-l", "0", "--help"])
    .assert()
    .success();
}
