//! Implementation of the build commands (`all`, `elf`, `bin`, `hex`, `asm`).
//!
//! Each command runs the corresponding fixed pipeline: compile, derive the
//! requested artifacts, drop intermediates, report memory usage.

use std::time::Instant;

use anyhow::{Context, Result};
use tracing::debug;

use tinyforge_lib::pipeline::{self, Goal};
use tinyforge_lib::toolchain::AvrGcc;

use crate::ConfigArgs;
use crate::output::{format_bytes, format_duration, print_json, print_stat, print_success};

pub fn cmd_build(goal: Goal, args: &ConfigArgs) -> Result<()> {
  let start = Instant::now();
  let config = args.resolve()?;
  debug!(device = %config.device, name = %config.name, "configuration resolved");

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let report = rt
    .block_on(pipeline::build(goal, &config, &AvrGcc))
    .context("Build failed")?;

  if args.output.is_json() {
    return print_json(&report);
  }

  println!();
  print_success("Build complete!");
  for artifact in &report.artifacts {
    print_stat("Artifact", &artifact.display().to_string());
  }
  print_stat(
    "Flash used",
    &format!("{} bytes ({})", report.usage.flash, format_bytes(report.usage.flash)),
  );
  print_stat(
    "RAM used",
    &format!("{} bytes ({})", report.usage.ram, format_bytes(report.usage.ram)),
  );
  print_stat("Duration", &format_duration(start.elapsed()));

  Ok(())
}
