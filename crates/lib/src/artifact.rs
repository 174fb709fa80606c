//! Artifact naming and cleanup.
//!
//! Final artifacts are named `<name>.<ext>` in the output directory; the
//! compiler additionally leaves intermediate files behind that are removed
//! after each successful run. All cleanup is idempotent.

use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::BuildConfig;

/// A final artifact produced by a build step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
  Elf,
  Bin,
  Hex,
  Asm,
}

impl ArtifactKind {
  pub const ALL: [ArtifactKind; 4] = [
    ArtifactKind::Elf,
    ArtifactKind::Bin,
    ArtifactKind::Hex,
    ArtifactKind::Asm,
  ];

  pub fn extension(self) -> &'static str {
    match self {
      ArtifactKind::Elf => "elf",
      ArtifactKind::Bin => "bin",
      ArtifactKind::Hex => "hex",
      ArtifactKind::Asm => "asm",
    }
  }

  /// Path of this artifact under the given configuration.
  pub fn path(self, config: &BuildConfig) -> PathBuf {
    config.out_dir.join(format!("{}.{}", config.name, self.extension()))
  }
}

/// Extensions of transient compiler/linker droppings.
const INTERMEDIATE_EXTENSIONS: &[&str] = &["o", "d", "s", "lst", "obj", "cof", "list", "map"];

fn is_intermediate(path: &Path) -> bool {
  let name = match path.file_name().and_then(|n| n.to_str()) {
    Some(name) => name,
    None => return false,
  };
  if name.ends_with(".eep.hex") {
    return true;
  }
  path
    .extension()
    .and_then(|e| e.to_str())
    .is_some_and(|ext| INTERMEDIATE_EXTENSIONS.contains(&ext))
}

fn remove_if_exists(path: &Path, removed: &mut Vec<PathBuf>) -> io::Result<()> {
  match std::fs::remove_file(path) {
    Ok(()) => {
      debug!(path = %path.display(), "removed artifact");
      removed.push(path.to_path_buf());
      Ok(())
    }
    Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
    Err(err) => Err(err),
  }
}

/// Delete intermediate files in the output directory.
pub fn clean_intermediates(dir: &Path) -> io::Result<Vec<PathBuf>> {
  let mut removed = Vec::new();
  let entries = match std::fs::read_dir(dir) {
    Ok(entries) => entries,
    Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(removed),
    Err(err) => return Err(err),
  };
  for entry in entries {
    let path = entry?.path();
    if path.is_file() && is_intermediate(&path) {
      remove_if_exists(&path, &mut removed)?;
    }
  }
  Ok(removed)
}

/// Delete the elf artifact if present.
pub fn remove_elf(config: &BuildConfig) -> io::Result<bool> {
  let mut removed = Vec::new();
  remove_if_exists(&ArtifactKind::Elf.path(config), &mut removed)?;
  Ok(!removed.is_empty())
}

/// Delete all intermediate and final artifacts. Safe when nothing exists.
pub fn clean_all(config: &BuildConfig) -> io::Result<Vec<PathBuf>> {
  let mut removed = clean_intermediates(&config.out_dir)?;
  for kind in ArtifactKind::ALL {
    remove_if_exists(&kind.path(config), &mut removed)?;
  }
  Ok(removed)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn config_in(dir: &Path) -> BuildConfig {
    BuildConfig {
      out_dir: dir.to_path_buf(),
      ..BuildConfig::default()
    }
  }

  fn touch(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, b"").unwrap();
    path
  }

  #[test]
  fn intermediates_are_matched_by_extension() {
    assert!(is_intermediate(Path::new("main.o")));
    assert!(is_intermediate(Path::new("main.lst")));
    assert!(is_intermediate(Path::new("firmware.eep.hex")));
    assert!(!is_intermediate(Path::new("firmware.hex")));
    assert!(!is_intermediate(Path::new("firmware.elf")));
    assert!(!is_intermediate(Path::new("main.ino")));
  }

  #[test]
  fn clean_intermediates_keeps_final_artifacts() {
    let temp = tempfile::TempDir::new().unwrap();
    touch(temp.path(), "main.o");
    touch(temp.path(), "main.d");
    touch(temp.path(), "dumpmaster64.eep.hex");
    let hex = touch(temp.path(), "dumpmaster64.hex");
    let elf = touch(temp.path(), "dumpmaster64.elf");

    let removed = clean_intermediates(temp.path()).unwrap();
    assert_eq!(removed.len(), 3);
    assert!(hex.exists());
    assert!(elf.exists());
  }

  #[test]
  fn clean_all_is_idempotent() {
    let temp = tempfile::TempDir::new().unwrap();
    let config = config_in(temp.path());
    touch(temp.path(), "dumpmaster64.elf");
    touch(temp.path(), "dumpmaster64.bin");
    touch(temp.path(), "main.o");

    let removed = clean_all(&config).unwrap();
    assert_eq!(removed.len(), 3);

    // Second run finds nothing and succeeds.
    let removed = clean_all(&config).unwrap();
    assert!(removed.is_empty());
    assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
  }

  #[test]
  fn remove_elf_reports_presence() {
    let temp = tempfile::TempDir::new().unwrap();
    let config = config_in(temp.path());
    assert!(!remove_elf(&config).unwrap());
    touch(temp.path(), "dumpmaster64.elf");
    assert!(remove_elf(&config).unwrap());
    assert!(!ArtifactKind::Elf.path(&config).exists());
  }
}
