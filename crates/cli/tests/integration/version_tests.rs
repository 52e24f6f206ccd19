//! `distforge version` output and project configuration overrides.

use predicates::prelude::*;

use crate::common::TestEnv;

#[test]
fn project_file_overrides_version() {
  let env = TestEnv::empty();
  env.write_file("distforge.json", r#"{ "major": 3, "minor": 11, "distro_prefix": "acme" }"#);

  env
    .cmd()
    .args(["version", "-b", "7"])
    .assert()
    .success()
    .stdout(predicate::str::contains("version=3.11.0.7"))
    .stdout(predicate::str::contains("packed_version=0x0300b007"))
    .stdout(predicate::str::contains("distro_name=acme"));
}

#[test]
fn json_output_is_parseable() {
  let env = TestEnv::empty();
  let output = env.cmd().args(["version", "-b", "12", "-o", "json"]).output().unwrap();
  assert!(output.status.success());

  let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(value["version"], "3.10.0.12");
  assert_eq!(value["packed_version"], "0x0300a00c");
  assert_eq!(value["fields"]["build"], 12);
}

#[test]
fn malformed_project_file_fails() {
  let env = TestEnv::empty();
  env.write_file("distforge.json", "{ not json");

  env.cmd().arg("version").assert().failure();
}
