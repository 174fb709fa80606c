//! tinyforge: build and flash orchestrator for tinyAVR (UPDI) firmware.

mod cmd;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tinyforge_lib::config::{BuildConfig, Overrides};
use tinyforge_lib::pipeline::{Goal, PipelineError};

use output::OutputFormat;

#[derive(Parser)]
#[command(name = "tinyforge")]
#[command(author, version, about = "Build and flash orchestrator for tinyAVR (UPDI) firmware")]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

/// Configuration overrides shared by all build/program commands.
#[derive(Args, Debug, Default)]
struct ConfigArgs {
  /// Path to a tinyforge.toml project file
  #[arg(long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Source sketch file
  #[arg(long, value_name = "FILE")]
  source: Option<PathBuf>,

  /// Base name of the produced artifacts
  #[arg(long)]
  name: Option<String>,

  /// Target device identifier
  #[arg(short, long)]
  device: Option<String>,

  /// Clock frequency in Hz
  #[arg(long, value_name = "HZ")]
  clock: Option<u32>,

  /// Fuse override as index:value, e.g. 5:0xC5 (repeatable)
  #[arg(long = "fuse", value_name = "IDX:VAL")]
  fuses: Vec<String>,

  /// Toolchain installation root (tools come from $PATH if unset)
  #[arg(long, value_name = "DIR")]
  toolchain_root: Option<PathBuf>,

  /// Device family pack directory
  #[arg(long, value_name = "DIR")]
  dfp: Option<PathBuf>,

  /// Serial port of the UPDI programmer
  #[arg(short, long)]
  port: Option<String>,

  /// UPDI programmer script
  #[arg(long, value_name = "FILE")]
  updi_script: Option<PathBuf>,

  /// Interpreter used to run the programmer script
  #[arg(long, value_name = "BIN")]
  updi_python: Option<String>,

  /// Output format
  #[arg(long, value_enum, default_value_t)]
  output: OutputFormat,
}

impl ConfigArgs {
  fn resolve(&self) -> Result<BuildConfig> {
    let overrides = Overrides {
      source: self.source.clone(),
      name: self.name.clone(),
      device: self.device.clone(),
      f_cpu: self.clock,
      fuses: self.fuses.clone(),
      toolchain_root: self.toolchain_root.clone(),
      dfp: self.dfp.clone(),
      port: self.port.clone(),
      updi_script: self.updi_script.clone(),
      updi_python: self.updi_python.clone(),
    };
    Ok(BuildConfig::resolve(self.config.as_deref(), &overrides)?)
  }
}

#[derive(Subcommand)]
enum Commands {
  /// Compile and emit the elf, bin, hex and asm artifacts
  All(ConfigArgs),

  /// Compile and emit the elf artifact
  Elf(ConfigArgs),

  /// Compile and emit the raw binary artifact
  Bin(ConfigArgs),

  /// Compile and emit the Intel hex artifact
  Hex(ConfigArgs),

  /// Compile and emit the disassembly listing
  Asm(ConfigArgs),

  /// Build the binary, then flash it and burn the fuses
  Install(ConfigArgs),

  /// Build the binary and flash it (no fuse burn)
  Upload(ConfigArgs),

  /// Burn the fuses only (no flash write)
  Fuses(ConfigArgs),

  /// Delete all build artifacts
  Clean(ConfigArgs),

  /// List the directory of a D64 disk image
  Dir {
    /// Path to the .d64 image
    image: PathBuf,
  },

  /// Show the resolved build configuration
  Info(ConfigArgs),
}

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .without_time()
    .init();

  let cli = Cli::parse();
  if let Err(err) = run(cli) {
    output::print_error(&format!("{:#}", err));
    std::process::exit(exit_code(&err));
  }
}

fn run(cli: Cli) -> Result<()> {
  match cli.command {
    Commands::All(args) => cmd::cmd_build(Goal::All, &args),
    Commands::Elf(args) => cmd::cmd_build(Goal::Elf, &args),
    Commands::Bin(args) => cmd::cmd_build(Goal::Bin, &args),
    Commands::Hex(args) => cmd::cmd_build(Goal::Hex, &args),
    Commands::Asm(args) => cmd::cmd_build(Goal::Asm, &args),
    Commands::Install(args) => cmd::cmd_install(&args),
    Commands::Upload(args) => cmd::cmd_upload(&args),
    Commands::Fuses(args) => cmd::cmd_fuses(&args),
    Commands::Clean(args) => cmd::cmd_clean(&args, cli.verbose),
    Commands::Dir { image } => cmd::cmd_dir(&image),
    Commands::Info(args) => cmd::cmd_info(&args),
  }
}

/// Exit with the external tool's own code when the failure carries one;
/// everything else is a plain failure.
fn exit_code(err: &anyhow::Error) -> i32 {
  err
    .chain()
    .find_map(|cause| cause.downcast_ref::<PipelineError>().and_then(PipelineError::exit_code))
    .unwrap_or(1)
}
