//! `distforge package` against fabricated CI artifacts.

use predicates::prelude::*;

use crate::common::{TestEnv, write_zip, zip_bytes};

#[test]
fn missing_artifacts_dir_fails() {
  let env = TestEnv::empty();
  env
    .cmd()
    .arg("package")
    .assert()
    .failure()
    .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn empty_artifacts_dir_reports_nothing_found() {
  let env = TestEnv::empty();
  std::fs::create_dir_all(env.path("artifacts")).unwrap();
  env
    .cmd()
    .arg("package")
    .assert()
    .success()
    .stdout(predicate::str::contains("No build artifacts found"));
}

#[test]
fn ubuntu_and_windows_artifacts_are_merged() {
  let env = TestEnv::empty();

  let ubuntu_x86 = zip_bytes(&[
    ("nsis-3.10.0.0/Bin/makensisw.exe", b"gui32".as_slice()),
    ("nsis-3.10.0.0/Stubs/zlib-x86-unicode", b"stub32".as_slice()),
  ]);
  let ubuntu_amd64 = zip_bytes(&[("nsis-3.10.0.0/Bin/makensis", b"cli64".as_slice())]);
  let windows_x86 = zip_bytes(&[
    ("nsis-3.10.0.0/makensis.exe", b"win32".as_slice()),
    ("nsis-3.10.0.0/NSIS.chm", b"help".as_slice()),
  ]);

  write_zip(
    &env.path("artifacts/artifacts-ubuntu-latest-x86-gcc.zip"),
    &[("nsis-3.10.0.0-x86.zip", ubuntu_x86.as_slice())],
  );
  write_zip(
    &env.path("artifacts/artifacts-ubuntu-latest-amd64-gcc.zip"),
    &[("nsis-3.10.0.0-amd64.zip", ubuntu_amd64.as_slice())],
  );
  write_zip(
    &env.path("artifacts/artifacts-windows-latest-x86-gcc.zip"),
    &[("nsis-3.10.0.0-x86.zip", windows_x86.as_slice())],
  );

  env
    .cmd()
    .arg("package")
    .assert()
    .success()
    .stdout(predicate::str::contains("Packaging complete"));

  assert_eq!(env.read(".instdist-ubuntu-x86/makensisw.exe"), "gui32");
  assert_eq!(env.read(".instdist-ubuntu-x86/makensis.exe"), "win32");
  assert_eq!(env.read(".instdist-ubuntu-x86/NSIS.chm"), "help");
  assert_eq!(env.read(".instdist-ubuntu-amd64/Stubs/zlib-x86-unicode"), "stub32");
  assert!(env.exists(".instdist-windows-x86/makensis.exe"));
  assert!(!env.exists(".instdist-windows-amd64"));
}

#[test]
fn custom_artifacts_dir_is_honored() {
  let env = TestEnv::empty();
  let inner = zip_bytes(&[("nsis-3.10/Bin/makensis", b"cli".as_slice())]);
  write_zip(
    &env.path("downloads/a-ubuntu-latest-amd64-gcc.zip"),
    &[("nsis-3.10-amd64.zip", inner.as_slice())],
  );

  env.cmd().args(["package", "-a", "downloads"]).assert().success();

  assert_eq!(env.read(".instdist-ubuntu-amd64/Bin/makensis"), "cli");
}
