//! Toolchain capability: compile, object-copy, disassemble, size report.
//!
//! Each step shells out to an external vendor tool behind the `Toolchain`
//! trait so implementations can be substituted or mocked in tests. The
//! shipped implementation, `AvrGcc`, drives the GNU AVR tools either from
//! a configured installation root or from `$PATH`.

pub mod size;

use std::ffi::OsString;
use std::path::PathBuf;

use thiserror::Error;
use tracing::info;

use crate::artifact::ArtifactKind;
use crate::config::BuildConfig;
use crate::process::{ProcessError, run_tool};
use size::MemoryUsage;

#[derive(Debug, Error)]
pub enum ToolchainError {
  #[error("source file not found: {0}")]
  MissingSource(PathBuf),

  #[error("device family pack not found at {0}")]
  MissingDfp(PathBuf),

  #[error("no elf artifact at {0}; run compile first")]
  MissingElf(PathBuf),

  #[error("unparseable size report: {0:?}")]
  SizeReport(String),

  #[error(transparent)]
  Process(#[from] ProcessError),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

impl ToolchainError {
  /// The external tool's exit code, when the failure carries one.
  pub fn exit_code(&self) -> Option<i32> {
    match self {
      ToolchainError::Process(err) => err.exit_code(),
      _ => None,
    }
  }
}

/// Output format of the object-copy step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectFormat {
  Binary,
  IntelHex,
}

impl ObjectFormat {
  fn objcopy_name(self) -> &'static str {
    match self {
      ObjectFormat::Binary => "binary",
      ObjectFormat::IntelHex => "ihex",
    }
  }

  pub fn artifact(self) -> ArtifactKind {
    match self {
      ObjectFormat::Binary => ArtifactKind::Bin,
      ObjectFormat::IntelHex => ArtifactKind::Hex,
    }
  }
}

/// Capability interface over the cross tools.
#[allow(async_fn_in_trait)]
pub trait Toolchain {
  /// Compile the sketch into the elf artifact.
  async fn compile(&self, config: &BuildConfig) -> Result<PathBuf, ToolchainError>;

  /// Convert the elf artifact into a raw binary or Intel hex image,
  /// excluding the EEPROM section. Requires a prior `compile`.
  async fn extract(&self, config: &BuildConfig, format: ObjectFormat) -> Result<PathBuf, ToolchainError>;

  /// Disassemble the elf artifact. Requires a prior `compile`.
  async fn disassemble(&self, config: &BuildConfig) -> Result<PathBuf, ToolchainError>;

  /// Report flash and RAM usage of the elf artifact.
  async fn report_size(&self, config: &BuildConfig) -> Result<MemoryUsage, ToolchainError>;
}

/// GNU AVR toolchain (`avr-gcc`, `avr-objcopy`, `avr-objdump`, `avr-size`).
#[derive(Debug, Clone, Copy, Default)]
pub struct AvrGcc;

impl AvrGcc {
  fn tool(config: &BuildConfig, name: &str) -> PathBuf {
    match &config.toolchain_root {
      Some(root) => root.join("bin").join(name),
      None => PathBuf::from(name),
    }
  }

  fn elf_checked(config: &BuildConfig) -> Result<PathBuf, ToolchainError> {
    let elf = ArtifactKind::Elf.path(config);
    if !elf.is_file() {
      return Err(ToolchainError::MissingElf(elf));
    }
    Ok(elf)
  }
}

impl Toolchain for AvrGcc {
  async fn compile(&self, config: &BuildConfig) -> Result<PathBuf, ToolchainError> {
    if !config.source.exists() {
      return Err(ToolchainError::MissingSource(config.source.clone()));
    }
    if !config.dfp.is_dir() {
      return Err(ToolchainError::MissingDfp(config.dfp.clone()));
    }

    let elf = ArtifactKind::Elf.path(config);
    let mut args: Vec<OsString> = vec![
      "-Wall".into(),
      "-Os".into(),
      "-flto".into(),
      format!("-mmcu={}", config.device).into(),
      format!("-DF_CPU={}", config.f_cpu).into(),
      "-B".into(),
      config.dfp.join("gcc").join("dev").join(&config.device).into(),
      "-I".into(),
      config.dfp.join("include").into(),
    ];
    // Sketch files are compiled as C++; plain C sources are left to the
    // compiler's own language detection.
    if config.source.extension().and_then(|e| e.to_str()) != Some("c") {
      args.push("-x".into());
      args.push("c++".into());
    }
    args.push(config.source.clone().into());
    args.push("-o".into());
    args.push(elf.clone().into());

    info!(device = %config.device, source = %config.source.display(), "compiling");
    run_tool(&Self::tool(config, "avr-gcc"), args, &config.out_dir).await?;
    Ok(elf)
  }

  async fn extract(&self, config: &BuildConfig, format: ObjectFormat) -> Result<PathBuf, ToolchainError> {
    let elf = Self::elf_checked(config)?;
    let out = format.artifact().path(config);
    let args: Vec<OsString> = vec![
      "-O".into(),
      format.objcopy_name().into(),
      "-R".into(),
      ".eeprom".into(),
      elf.into(),
      out.clone().into(),
    ];

    info!(target = %out.display(), "extracting");
    run_tool(&Self::tool(config, "avr-objcopy"), args, &config.out_dir).await?;
    Ok(out)
  }

  async fn disassemble(&self, config: &BuildConfig) -> Result<PathBuf, ToolchainError> {
    let elf = Self::elf_checked(config)?;
    let out = ArtifactKind::Asm.path(config);

    info!(target = %out.display(), "disassembling");
    let output = run_tool(
      &Self::tool(config, "avr-objdump"),
      [OsString::from("-d"), elf.into()],
      &config.out_dir,
    )
    .await?;
    tokio::fs::write(&out, &output.stdout).await?;
    Ok(out)
  }

  async fn report_size(&self, config: &BuildConfig) -> Result<MemoryUsage, ToolchainError> {
    let elf = Self::elf_checked(config)?;

    let output = run_tool(
      &Self::tool(config, "avr-size"),
      [OsString::from("-d"), elf.into()],
      &config.out_dir,
    )
    .await?;
    size::parse_berkeley(&output.stdout_utf8())
  }
}
