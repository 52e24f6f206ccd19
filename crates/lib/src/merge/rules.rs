//! Rule sets sharing files between the x86 and amd64 distribution trees.

use std::path::{Path, PathBuf};

use super::{MergeError, MergeRule, sub};

/// Optional Windows-built trees donating binaries the cross-built trees lack.
#[derive(Debug, Clone, Default)]
pub struct WindowsTrees {
  pub x86: Option<PathBuf>,
  pub amd64: Option<PathBuf>,
}

/// Rules for two locally built trees.
pub fn local_rules(x86: &Path, amd64: &Path) -> Result<Vec<MergeRule>, MergeError> {
  package_rules(x86, amd64, &WindowsTrees::default())
}

/// Rules for packaged trees, optionally completed from Windows-built trees.
///
/// Order matters: the GUI front-end is promoted to the tree root before any
/// Windows donor is consulted, so a locally built one always wins.
pub fn package_rules(x86: &Path, amd64: &Path, windows: &WindowsTrees) -> Result<Vec<MergeRule>, MergeError> {
  let mut rules = vec![
    MergeRule::new(sub(x86, &["Bin"]), r"makensisw\.exe", x86)?,
    MergeRule::new(sub(amd64, &["Bin"]), r"makensisw\.exe", amd64)?,
  ];

  let donors: Vec<(&Path, &Path)> = [(windows.x86.as_deref(), x86), (windows.amd64.as_deref(), amd64)]
    .into_iter()
    .filter_map(|(donor, tree)| donor.map(|donor| (donor, tree)))
    .collect();
  for (donor, tree) in &donors {
    rules.push(MergeRule::new(*donor, r"^.*\.exe$", *tree)?);
    rules.push(MergeRule::new(*donor, r"^.*\.chm$", *tree)?);
  }
  for (donor, tree) in &donors {
    rules.push(MergeRule::new(sub(donor, &["Bin"]), r"^.*\.exe$", sub(tree, &["Bin"]))?);
  }

  rules.extend([
    MergeRule::new(
      sub(x86, &["Plugins", "x86-ansi"]),
      ".*",
      sub(amd64, &["Plugins", "x86-ansi"]),
    )?,
    MergeRule::new(
      sub(x86, &["Plugins", "x86-unicode"]),
      ".*",
      sub(amd64, &["Plugins", "x86-unicode"]),
    )?,
    MergeRule::new(
      sub(amd64, &["Plugins", "amd64-unicode"]),
      ".*",
      sub(x86, &["Plugins", "amd64-unicode"]),
    )?,
    MergeRule::new(sub(x86, &["Stubs"]), r"^.+-x86-ansi$", sub(amd64, &["Stubs"]))?,
    MergeRule::new(sub(x86, &["Stubs"]), r"^.+-x86-unicode$", sub(amd64, &["Stubs"]))?,
    MergeRule::new(sub(amd64, &["Stubs"]), r"^.+-amd64-unicode$", sub(x86, &["Stubs"]))?,
    MergeRule::new(sub(x86, &["Bin"]), r"RegTool-x86\.bin", sub(amd64, &["Bin"]))?,
    MergeRule::new(sub(amd64, &["Bin"]), r"RegTool-amd64\.bin", sub(x86, &["Bin"]))?,
  ]);

  Ok(rules)
}
