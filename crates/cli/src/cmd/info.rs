//! Implementation of the `info` command.

use anyhow::Result;

use crate::ConfigArgs;
use crate::output::{print_json, print_stat};

/// Print the resolved build configuration.
pub fn cmd_info(args: &ConfigArgs) -> Result<()> {
  let config = args.resolve()?;

  if args.output.is_json() {
    return print_json(&config);
  }

  println!("Configuration:");
  print_stat("Source", &config.canonical_source().display().to_string());
  print_stat("Target", &config.name);
  print_stat("Device", &config.device);
  print_stat("Clock", &format!("{} Hz", config.f_cpu));
  print_stat("Fuses", &config.fuses.to_string());
  match &config.toolchain_root {
    Some(root) => print_stat("Toolchain", &root.display().to_string()),
    None => print_stat("Toolchain", "$PATH"),
  }
  print_stat("DFP", &config.dfp.display().to_string());
  print_stat(
    "Programmer",
    &format!("{} {}", config.programmer.python, config.programmer.script.display()),
  );
  if let Some(ref port) = config.programmer.port {
    print_stat("Port", port);
  }

  Ok(())
}
