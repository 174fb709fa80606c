//! Implementation of the `install`, `upload` and `fuses` commands.
//!
//! These are the only hardware-touching commands; the device itself is
//! driven by the external UPDI programmer script.

use anyhow::{Context, Result};

use tinyforge_lib::pipeline;
use tinyforge_lib::programmer::TinyUpdi;
use tinyforge_lib::toolchain::AvrGcc;

use crate::ConfigArgs;
use crate::output::{format_bytes, print_json, print_stat, print_success};

/// Build the binary, flash it and burn the fuses in a single programmer
/// invocation.
pub fn cmd_install(args: &ConfigArgs) -> Result<()> {
  let config = args.resolve()?;

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let report = rt
    .block_on(pipeline::install(&config, &AvrGcc, &TinyUpdi))
    .context("Install failed")?;

  if args.output.is_json() {
    return print_json(&report);
  }

  println!();
  print_success("Install complete!");
  print_stat("Device", &config.device);
  print_stat(
    "Flash used",
    &format!("{} bytes ({})", report.usage.flash, format_bytes(report.usage.flash)),
  );
  print_stat("Fuses", &config.fuses.to_string());

  Ok(())
}

/// Build the binary and flash it. Fuses are left untouched.
pub fn cmd_upload(args: &ConfigArgs) -> Result<()> {
  let config = args.resolve()?;

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let report = rt
    .block_on(pipeline::upload(&config, &AvrGcc, &TinyUpdi))
    .context("Upload failed")?;

  if args.output.is_json() {
    return print_json(&report);
  }

  println!();
  print_success("Upload complete!");
  print_stat("Device", &config.device);
  print_stat(
    "Flash used",
    &format!("{} bytes ({})", report.usage.flash, format_bytes(report.usage.flash)),
  );

  Ok(())
}

/// Burn the fuses only. No compile, no flash write.
pub fn cmd_fuses(args: &ConfigArgs) -> Result<()> {
  let config = args.resolve()?;

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  rt.block_on(pipeline::burn_fuses(&config, &TinyUpdi))
    .context("Fuse burn failed")?;

  println!();
  print_success("Fuses burned!");
  print_stat("Device", &config.device);
  print_stat("Fuses", &config.fuses.to_string());

  Ok(())
}
