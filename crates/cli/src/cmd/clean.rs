//! Implementation of the `clean` command.

use anyhow::{Context, Result};

use tinyforge_lib::pipeline;

use crate::ConfigArgs;
use crate::output::{print_info, print_stat, print_success};

/// Delete all build artifacts. Safe to run when nothing exists.
pub fn cmd_clean(args: &ConfigArgs, verbose: bool) -> Result<()> {
  let config = args.resolve()?;
  let removed = pipeline::clean(&config).context("Clean failed")?;

  if removed.is_empty() {
    print_info("Nothing to clean");
    return Ok(());
  }

  print_success(&format!("Removed {} artifact(s)", removed.len()));
  if verbose {
    for path in &removed {
      print_stat("Removed", &path.display().to_string());
    }
  }

  Ok(())
}
