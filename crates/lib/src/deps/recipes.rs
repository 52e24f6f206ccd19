//! Recipes for the dependencies the distribution links against.

use std::path::Path;

use crate::config::DependencySources;
use crate::execute::BuildCommand;
use crate::toolchain::{Compiler, ToolchainConfig};

use super::DependencySpec;

/// Convert `C:\path\file.ext` to `/C/path/file.ext` for MSYS tools; other paths pass through.
pub fn win_to_posix(path: &str) -> String {
  let bytes = path.as_bytes();
  if bytes.len() >= 2 && bytes[1] == b':' {
    format!("/{}", path.replacen(':', "", 1).replace('\\', "/"))
  } else {
    path.to_string()
  }
}

/// Wrap `command` so it runs after `vcvarsall.bat` has set up the MSVC environment.
fn with_vcvars(toolchain: &ToolchainConfig, command: &[&str]) -> BuildCommand {
  BuildCommand::new("cmd.exe")
    .args(["/c", "call", "vcvarsall.bat", toolchain.arch.as_str(), "&&"])
    .args(command.iter().copied())
}

pub fn zlib_spec(depend_dir: &Path, sources: &DependencySources) -> DependencySpec {
  DependencySpec::new("zlib", &sources.zlib, depend_dir.join("zlib"))
    .with_depth(sources.clone_depth)
    .with_built_artifact("zlib1.dll")
    .with_recipe(zlib_recipe)
}

fn zlib_recipe(toolchain: &ToolchainConfig, dir: &Path) -> Vec<BuildCommand> {
  const LOC: &str = "LOC=-D_WIN32_WINNT=0x0400 -static";

  let command = match (toolchain.compiler, toolchain.native_host) {
    (Compiler::Gcc, true) => BuildCommand::new("mingw32-make.exe").args(["-fwin32/Makefile.gcc", LOC, "zlib1.dll"]),
    (Compiler::Gcc, false) => BuildCommand::new("make").args([
      "-fwin32/Makefile.gcc".to_string(),
      format!("PREFIX={}", toolchain.arch.mingw_prefix()),
      LOC.to_string(),
      "zlib1.dll".to_string(),
    ]),
    (Compiler::Msvc, _) => with_vcvars(
      toolchain,
      &["nmake.exe", "-f", "win32/Makefile.msc", "LOC=/MT", "zlib1.dll", "zdll.lib"],
    ),
  };

  vec![command.current_dir(dir)]
}

pub fn cppunit_spec(depend_dir: &Path, sources: &DependencySources) -> DependencySpec {
  DependencySpec::new("cppunit", &sources.cppunit, depend_dir.join("cppunit"))
    .with_depth(sources.clone_depth)
    .with_built_artifact(Path::new("bin").join("DllPlugInTester.exe"))
    .with_built_artifact(Path::new("lib").join("DllPlugInTester_dll.exe"))
    .with_recipe(cppunit_recipe)
}

fn cppunit_recipe(toolchain: &ToolchainConfig, dir: &Path) -> Vec<BuildCommand> {
  match toolchain.compiler {
    Compiler::Gcc => {
      let make = if toolchain.native_host { "mingw32-make" } else { "make" };
      let posix = |sub: &str| win_to_posix(&dir.join(sub).display().to_string());

      vec![
        BuildCommand::new("sh").arg("./autogen.sh"),
        BuildCommand::new("sh").args([
          "./configure".to_string(),
          format!("MAKE={}", make),
          format!("--prefix={}", posix("installed")),
          format!("--libdir={}", posix("lib")),
          format!("--bindir={}", posix("bin")),
          "LDFLAGS=-static".to_string(),
          "--disable-silent-rules".to_string(),
          "--disable-dependency-tracking".to_string(),
          "--disable-doxygen".to_string(),
          "--disable-html-docs".to_string(),
          "--disable-latex-docs".to_string(),
        ]),
        BuildCommand::new(make),
        BuildCommand::new(make).arg("install"),
      ]
      .into_iter()
      .map(|cmd| cmd.current_dir(dir))
      .collect()
    }
    Compiler::Msvc => {
      let solution = dir.join("src").join("CppUnitLibraries2010.sln").display().to_string();
      let platform = format!("/p:Platform={}", toolchain.arch_display_name);
      let mut args = vec![
        "msbuild",
        "/m",
        "/t:build",
        solution.as_str(),
        "/p:Configuration=Release",
        platform.as_str(),
      ];
      let toolset = toolchain.toolset.as_ref().map(|t| format!("/p:PlatformToolset={}", t));
      if let Some(toolset) = &toolset {
        args.push(toolset.as_str());
      }
      vec![with_vcvars(toolchain, &args).current_dir(dir)]
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::toolchain::Arch;
  use std::path::PathBuf;

  fn toolchain(compiler: Compiler, arch: Arch, native_host: bool) -> ToolchainConfig {
    ToolchainConfig {
      compiler,
      arch,
      installation_root: None,
      toolset: (compiler == Compiler::Msvc).then(|| "v143".to_string()),
      arch_display_name: match compiler {
        Compiler::Msvc => arch.msvc_platform().to_string(),
        Compiler::Gcc => arch.as_str().to_string(),
      },
      search_path: Vec::new(),
      native_host,
    }
  }

  #[test]
  fn win_to_posix_converts_drive_paths() {
    assert_eq!(win_to_posix(r"C:\path\file.ext"), "/C/path/file.ext");
    assert_eq!(win_to_posix("/already/posix"), "/already/posix");
  }

  #[test]
  fn zlib_cross_build_uses_prefix() {
    let cmds = zlib_recipe(&toolchain(Compiler::Gcc, Arch::Amd64, false), Path::new("/dep/zlib"));
    assert_eq!(cmds.len(), 1);
    assert_eq!(cmds[0].program, "make");
    assert!(cmds[0].args.contains(&"PREFIX=x86_64-w64-mingw32-".to_string()));
    assert_eq!(cmds[0].cwd, Some(PathBuf::from("/dep/zlib")));
  }

  #[test]
  fn zlib_native_gcc_uses_mingw_make() {
    let cmds = zlib_recipe(&toolchain(Compiler::Gcc, Arch::X86, true), Path::new("/dep/zlib"));
    assert_eq!(cmds[0].program, "mingw32-make.exe");
  }

  #[test]
  fn zlib_msvc_calls_vcvars_first() {
    let cmds = zlib_recipe(&toolchain(Compiler::Msvc, Arch::X86, true), Path::new("/dep/zlib"));
    assert_eq!(cmds[0].program, "cmd.exe");
    assert_eq!(&cmds[0].args[..5], &["/c", "call", "vcvarsall.bat", "x86", "&&"]);
    assert!(cmds[0].args.contains(&"nmake.exe".to_string()));
  }

  #[test]
  fn cppunit_gcc_is_four_steps() {
    let cmds = cppunit_recipe(&toolchain(Compiler::Gcc, Arch::X86, false), Path::new("/dep/cppunit"));
    let programs: Vec<&str> = cmds.iter().map(|c| c.program.as_str()).collect();
    assert_eq!(programs, vec!["sh", "sh", "make", "make"]);
    assert_eq!(cmds[3].args, vec!["install"]);
  }

  #[test]
  fn cppunit_msvc_passes_platform_and_toolset() {
    let cmds = cppunit_recipe(&toolchain(Compiler::Msvc, Arch::Amd64, true), Path::new("/dep/cppunit"));
    assert!(cmds[0].args.contains(&"/p:Platform=x64".to_string()));
    assert!(cmds[0].args.contains(&"/p:PlatformToolset=v143".to_string()));
  }

  #[test]
  fn cppunit_msvc_without_toolset_omits_it() {
    let mut tc = toolchain(Compiler::Msvc, Arch::X86, true);
    tc.toolset = None;
    let cmds = cppunit_recipe(&tc, Path::new("/dep/cppunit"));
    assert!(!cmds[0].args.iter().any(|a| a.starts_with("/p:PlatformToolset")));
  }

  #[test]
  fn specs_share_depend_dir_and_markers() {
    let sources = DependencySources::default();
    let zlib = zlib_spec(Path::new("/w/.depend"), &sources);
    let cppunit = cppunit_spec(Path::new("/w/.depend"), &sources);

    assert_eq!(zlib.local_path, PathBuf::from("/w/.depend/zlib"));
    assert_eq!(cppunit.local_path, PathBuf::from("/w/.depend/cppunit"));
    assert_eq!(cppunit.built_artifacts.len(), 2);
    assert_eq!(zlib.clone_depth, 1);
  }
}
