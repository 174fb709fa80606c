//! Fixed step pipelines behind each user-facing command.
//!
//! Every command is a fixed ordered composition of the toolchain,
//! programmer and artifact primitives. The first failing step aborts the
//! rest of the pipeline; there is no retry and no partial continuation.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::artifact::{self, ArtifactKind};
use crate::config::BuildConfig;
use crate::programmer::{ProgramError, ProgramJob, Programmer};
use crate::toolchain::size::MemoryUsage;
use crate::toolchain::{ObjectFormat, Toolchain, ToolchainError};

#[derive(Debug, Error)]
pub enum PipelineError {
  #[error(transparent)]
  Toolchain(#[from] ToolchainError),

  #[error(transparent)]
  Program(#[from] ProgramError),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

impl PipelineError {
  /// The underlying external tool's exit code, when one is known.
  pub fn exit_code(&self) -> Option<i32> {
    match self {
      PipelineError::Toolchain(err) => err.exit_code(),
      PipelineError::Program(err) => err.exit_code(),
      PipelineError::Io(_) => None,
    }
  }
}

/// Build goal: which final artifacts a build run leaves behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Goal {
  /// elf + bin + hex + asm.
  All,
  Elf,
  Bin,
  Hex,
  Asm,
}

impl Goal {
  /// `all` and `elf` keep the elf artifact; the single-artifact goals
  /// remove it after the size report.
  fn keeps_elf(self) -> bool {
    matches!(self, Goal::All | Goal::Elf)
  }
}

/// Outcome of a successful build pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
  /// Final artifacts left on disk, in production order.
  pub artifacts: Vec<PathBuf>,
  pub usage: MemoryUsage,
}

/// Run a build goal: compile, derive the requested artifacts from the elf,
/// drop intermediates, measure memory usage, drop the elf unless kept.
pub async fn build<T: Toolchain>(
  goal: Goal,
  config: &BuildConfig,
  toolchain: &T,
) -> Result<BuildReport, PipelineError> {
  let elf = toolchain.compile(config).await?;

  let mut artifacts = Vec::new();
  match goal {
    Goal::All => {
      artifacts.push(toolchain.extract(config, ObjectFormat::Binary).await?);
      artifacts.push(toolchain.extract(config, ObjectFormat::IntelHex).await?);
      artifacts.push(toolchain.disassemble(config).await?);
    }
    Goal::Elf => {}
    Goal::Bin => artifacts.push(toolchain.extract(config, ObjectFormat::Binary).await?),
    Goal::Hex => artifacts.push(toolchain.extract(config, ObjectFormat::IntelHex).await?),
    Goal::Asm => artifacts.push(toolchain.disassemble(config).await?),
  }

  artifact::clean_intermediates(&config.out_dir)?;
  let usage = toolchain.report_size(config).await?;

  if goal.keeps_elf() {
    artifacts.insert(0, elf);
  } else {
    artifact::remove_elf(config)?;
  }

  info!(flash = usage.flash, ram = usage.ram, "build finished");
  Ok(BuildReport { artifacts, usage })
}

/// Build the binary, then flash it and burn the fuses in one programmer
/// invocation.
pub async fn install<T: Toolchain, P: Programmer>(
  config: &BuildConfig,
  toolchain: &T,
  programmer: &P,
) -> Result<BuildReport, PipelineError> {
  let report = build(Goal::Bin, config, toolchain).await?;
  let bin = ArtifactKind::Bin.path(config);
  programmer
    .program(config, ProgramJob::full(&bin, &config.fuses))
    .await?;
  Ok(report)
}

/// Build the binary and flash it. No fuse burn.
pub async fn upload<T: Toolchain, P: Programmer>(
  config: &BuildConfig,
  toolchain: &T,
  programmer: &P,
) -> Result<BuildReport, PipelineError> {
  let report = build(Goal::Bin, config, toolchain).await?;
  let bin = ArtifactKind::Bin.path(config);
  programmer.program(config, ProgramJob::flash_only(&bin)).await?;
  Ok(report)
}

/// Burn the fuses only. No compile, no flash write.
pub async fn burn_fuses<P: Programmer>(config: &BuildConfig, programmer: &P) -> Result<(), PipelineError> {
  programmer.program(config, ProgramJob::fuses_only(&config.fuses)).await?;
  Ok(())
}

/// Delete all build artifacts.
pub fn clean(config: &BuildConfig) -> Result<Vec<PathBuf>, PipelineError> {
  Ok(artifact::clean_all(config)?)
}
