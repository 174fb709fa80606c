//! CLI smoke tests for tinyforge.
//!
//! These tests verify that all CLI commands run without panicking and
//! return appropriate exit codes. The build and program commands are
//! exercised end to end against stub tool executables on Unix.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a Command for the tinyforge binary.
fn forge_cmd() -> Command {
  cargo_bin_cmd!("tinyforge")
}

/// Build a minimal 35-track D64 image with one PRG file named HELLO on a
/// disk named DEMO.
fn demo_image() -> Vec<u8> {
  const SECTOR: usize = 256;
  // 17 tracks of 21 sectors precede the directory track.
  const BAM: usize = 357 * SECTOR;
  const DIR: usize = BAM + SECTOR;

  let mut image = vec![0u8; 683 * SECTOR];

  // BAM: track 1 fully free, name DEMO (shifted PETSCII), id 23, DOS 2A.
  image[BAM] = 18;
  image[BAM + 1] = 1;
  image[BAM + 2] = 0x41;
  image[BAM + 4] = 21;
  image[BAM + 5] = 0xFF;
  image[BAM + 6] = 0xFF;
  image[BAM + 7] = 0x1F;
  for i in 0x90..0xA0 {
    image[BAM + i] = 0xA0;
  }
  image[BAM + 0x90..BAM + 0x94].copy_from_slice(&[0xC4, 0xC5, 0xCD, 0xCF]);
  image[BAM + 0xA2] = b'2';
  image[BAM + 0xA3] = b'3';
  image[BAM + 0xA5] = b'2';
  image[BAM + 0xA6] = 0xC1;

  // Directory block: chain ends here, one closed PRG entry "HELLO", 5 blocks.
  image[DIR] = 0;
  image[DIR + 1] = 0xFF;
  image[DIR + 2] = 0x82;
  image[DIR + 3] = 17;
  image[DIR + 4] = 0;
  for i in 0x05..0x15 {
    image[DIR + i] = 0xA0;
  }
  image[DIR + 0x05..DIR + 0x0A].copy_from_slice(&[0xC8, 0xC5, 0xCC, 0xCC, 0xCF]);
  image[DIR + 0x1E] = 5;

  image
}

// =============================================================================
// Help & Version
// =============================================================================

#[test]
fn help_flag_works() {
  forge_cmd()
    .arg("--help")
    .assert()
    .success()
    .stdout(predicate::str::contains("Usage"));
}

#[test]
fn version_flag_works() {
  forge_cmd()
    .arg("--version")
    .assert()
    .success()
    .stdout(predicate::str::contains("tinyforge"));
}

#[test]
fn subcommand_help_works() {
  for cmd in &[
    "all", "elf", "bin", "hex", "asm", "install", "upload", "fuses", "clean", "dir", "info",
  ] {
    forge_cmd()
      .arg(cmd)
      .arg("--help")
      .assert()
      .success()
      .stdout(predicate::str::contains("Usage"));
  }
}

// =============================================================================
// info
// =============================================================================

#[test]
fn info_shows_resolved_defaults() {
  let temp = TempDir::new().unwrap();

  forge_cmd()
    .current_dir(temp.path())
    .arg("info")
    .assert()
    .success()
    .stdout(predicate::str::contains("attiny814"))
    .stdout(predicate::str::contains("20000000 Hz"))
    .stdout(predicate::str::contains("5:0xC5"));
}

#[test]
fn info_json_output() {
  let temp = TempDir::new().unwrap();

  forge_cmd()
    .current_dir(temp.path())
    .args(["info", "--output", "json"])
    .assert()
    .success()
    .stdout(predicate::str::contains("\"device\""))
    .stdout(predicate::str::contains("attiny814"));
}

#[test]
fn info_applies_overrides() {
  let temp = TempDir::new().unwrap();

  forge_cmd()
    .current_dir(temp.path())
    .args(["info", "--device", "attiny1614", "--fuse", "5:0xC4"])
    .assert()
    .success()
    .stdout(predicate::str::contains("attiny1614"))
    .stdout(predicate::str::contains("5:0xC4"));
}

#[test]
fn invalid_fuse_override_fails() {
  let temp = TempDir::new().unwrap();

  forge_cmd()
    .current_dir(temp.path())
    .args(["info", "--fuse", "3:0x00"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("fuse index"));
}

// =============================================================================
// clean
// =============================================================================

#[test]
fn clean_removes_artifacts_and_is_idempotent() {
  let temp = TempDir::new().unwrap();
  for name in ["dumpmaster64.elf", "dumpmaster64.bin", "main.o", "main.eep.hex"] {
    std::fs::write(temp.path().join(name), b"").unwrap();
  }

  forge_cmd()
    .current_dir(temp.path())
    .arg("clean")
    .assert()
    .success()
    .stdout(predicate::str::contains("Removed 4 artifact(s)"));

  assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);

  forge_cmd()
    .current_dir(temp.path())
    .arg("clean")
    .assert()
    .success()
    .stdout(predicate::str::contains("Nothing to clean"));
}

#[test]
fn clean_keeps_unrelated_files() {
  let temp = TempDir::new().unwrap();
  std::fs::write(temp.path().join("main.ino"), b"int main() {}\n").unwrap();
  std::fs::write(temp.path().join("dumpmaster64.hex"), b"").unwrap();

  forge_cmd().current_dir(temp.path()).arg("clean").assert().success();

  assert!(temp.path().join("main.ino").exists());
  assert!(!temp.path().join("dumpmaster64.hex").exists());
}

// =============================================================================
// dir
// =============================================================================

#[test]
fn dir_lists_a_d64_image() {
  let temp = TempDir::new().unwrap();
  let image = temp.path().join("demo.d64");
  std::fs::write(&image, demo_image()).unwrap();

  forge_cmd()
    .arg("dir")
    .arg(&image)
    .assert()
    .success()
    .stdout(predicate::str::contains("DEMO"))
    .stdout(predicate::str::contains("\"HELLO\""))
    .stdout(predicate::str::contains("PRG"))
    .stdout(predicate::str::contains("21 BLOCKS FREE."));
}

#[test]
fn dir_rejects_a_truncated_image() {
  let temp = TempDir::new().unwrap();
  let image = temp.path().join("short.d64");
  std::fs::write(&image, vec![0u8; 1024]).unwrap();

  forge_cmd()
    .arg("dir")
    .arg(&image)
    .assert()
    .failure()
    .stderr(predicate::str::contains("too small"));
}

#[test]
fn dir_missing_file_fails() {
  forge_cmd()
    .arg("dir")
    .arg("/nonexistent/image.d64")
    .assert()
    .failure()
    .stderr(predicate::str::contains("Failed to read"));
}

// =============================================================================
// build & program pipelines against stub tools (Unix only)
// =============================================================================

#[cfg(unix)]
mod stub_tools {
  use super::*;
  use std::os::unix::fs::PermissionsExt;
  use std::path::{Path, PathBuf};

  fn write_stub(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
  }

  /// Install fake avr tools under `<root>/bin`.
  fn stub_toolchain(root: &Path) {
    let bin = root.join("bin");
    std::fs::create_dir_all(&bin).unwrap();
    write_stub(
      &bin,
      "avr-gcc",
      r#"out=""
while [ $# -gt 0 ]; do
  if [ "$1" = "-o" ]; then out="$2"; fi
  shift
done
: > "$out""#,
    );
    write_stub(
      &bin,
      "avr-objcopy",
      r#"for last; do :; done
: > "$last""#,
    );
    write_stub(&bin, "avr-objdump", r#"echo "00000000 <main>:""#);
    write_stub(
      &bin,
      "avr-size",
      r#"printf '   text\t   data\t    bss\t    dec\t    hex\tfilename\n'
printf '   4242\t     86\t    118\t   4446\t   115e\tmain.elf\n'"#,
    );
  }

  /// A workspace with a sketch, stub tools and a stub programmer that logs
  /// its arguments to `updi.log`.
  struct Workspace {
    temp: TempDir,
    root: PathBuf,
    dfp: PathBuf,
    python: PathBuf,
    script: PathBuf,
  }

  impl Workspace {
    fn new() -> Self {
      let temp = TempDir::new().unwrap();
      let root = temp.path().join("avr");
      stub_toolchain(&root);
      let dfp = temp.path().join("dfp");
      std::fs::create_dir_all(&dfp).unwrap();
      std::fs::write(temp.path().join("main.ino"), b"int main() {}\n").unwrap();
      let python = write_stub(temp.path(), "fakeupdi", r#"printf '%s\n' "$@" >> updi.log"#);
      let script = temp.path().join("tinyupdi.py");
      std::fs::write(&script, b"").unwrap();
      Workspace {
        temp,
        root,
        dfp,
        python,
        script,
      }
    }

    fn cmd(&self, subcommand: &str) -> Command {
      let mut cmd = forge_cmd();
      cmd
        .current_dir(self.temp.path())
        .args([subcommand, "--source", "main.ino", "--name", "main"])
        .arg("--toolchain-root")
        .arg(&self.root)
        .arg("--dfp")
        .arg(&self.dfp)
        .arg("--updi-python")
        .arg(&self.python)
        .arg("--updi-script")
        .arg(&self.script);
      cmd
    }

    fn updi_log(&self) -> String {
      std::fs::read_to_string(self.temp.path().join("updi.log")).unwrap_or_default()
    }

    fn exists(&self, name: &str) -> bool {
      self.temp.path().join(name).exists()
    }
  }

  #[test]
  fn bin_leaves_only_the_binary_and_reports_size() {
    let ws = Workspace::new();

    ws.cmd("bin")
      .assert()
      .success()
      .stdout(predicate::str::contains("4328 bytes"))
      .stdout(predicate::str::contains("204 bytes"));

    assert!(ws.exists("main.bin"));
    assert!(!ws.exists("main.elf"));
    assert!(!ws.exists("main.hex"));
  }

  #[test]
  fn hex_leaves_only_the_hex_artifact() {
    let ws = Workspace::new();

    ws.cmd("hex").assert().success();

    assert!(ws.exists("main.hex"));
    assert!(!ws.exists("main.elf"));
  }

  #[test]
  fn all_emits_every_artifact() {
    let ws = Workspace::new();

    ws.cmd("all").assert().success();

    for name in ["main.elf", "main.bin", "main.hex", "main.asm"] {
      assert!(ws.exists(name), "{} should exist", name);
    }
  }

  #[test]
  fn asm_captures_disassembly_output() {
    let ws = Workspace::new();

    ws.cmd("asm").assert().success();

    let asm = std::fs::read_to_string(ws.temp.path().join("main.asm")).unwrap();
    assert!(asm.contains("<main>:"));
  }

  #[test]
  fn install_programs_flash_and_fuses_once() {
    let ws = Workspace::new();

    ws.cmd("install").assert().success();

    let log = ws.updi_log();
    assert_eq!(log.lines().filter(|l| *l == "-d").count(), 1);
    assert!(log.lines().any(|l| l == "-b"));
    assert!(log.lines().any(|l| l == "-fs"));
    assert!(log.lines().any(|l| l.ends_with("main.bin")));
    assert!(log.lines().any(|l| l == "5:0xC5"));
  }

  #[test]
  fn upload_programs_flash_only() {
    let ws = Workspace::new();

    ws.cmd("upload").assert().success();

    let log = ws.updi_log();
    assert_eq!(log.lines().filter(|l| *l == "-d").count(), 1);
    assert!(log.lines().any(|l| l == "-b"));
    assert!(!log.lines().any(|l| l == "-fs"));
  }

  #[test]
  fn fuses_programs_fuse_map_only() {
    let ws = Workspace::new();

    ws.cmd("fuses").assert().success();

    let log = ws.updi_log();
    assert_eq!(log.lines().filter(|l| *l == "-d").count(), 1);
    assert!(log.lines().any(|l| l == "-fs"));
    assert!(!log.lines().any(|l| l == "-b"));
    // No compile ran.
    assert!(!ws.exists("main.elf"));
    assert!(!ws.exists("main.bin"));
  }

  #[test]
  fn compiler_exit_code_is_propagated() {
    let ws = Workspace::new();
    write_stub(&ws.root.join("bin"), "avr-gcc", "exit 42");

    ws.cmd("bin")
      .assert()
      .failure()
      .code(predicate::eq(42))
      .stderr(predicate::str::contains("avr-gcc"));
  }

  #[test]
  fn upload_without_programmer_script_fails() {
    let ws = Workspace::new();
    std::fs::remove_file(&ws.script).unwrap();

    ws.cmd("upload")
      .assert()
      .failure()
      .stderr(predicate::str::contains("programmer script not found"));
  }
}
