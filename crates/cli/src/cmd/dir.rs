//! Implementation of the `dir` command.
//!
//! Prints the directory of a local D64 disk image the way a 1541 lists it.

use std::path::Path;

use anyhow::{Context, Result};

use tinyforge_lib::d64::Directory;

pub fn cmd_dir(image: &Path) -> Result<()> {
  let bytes =
    std::fs::read(image).with_context(|| format!("Failed to read {}", image.display()))?;
  let directory = Directory::from_image(&bytes)
    .with_context(|| format!("Failed to parse disk image {}", image.display()))?;

  for line in directory.listing() {
    println!("{}", line);
  }

  Ok(())
}
