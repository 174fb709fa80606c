//! Programmer capability: flashing and fuse burning over UPDI.
//!
//! The only hardware-touching operation. It is delegated entirely to an
//! external programmer script (tinyupdi); this module merely assembles the
//! invocation from the job and the configuration.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::config::{BuildConfig, FuseMap};
use crate::process::{ProcessError, run_tool};

#[derive(Debug, Error)]
pub enum ProgramError {
  #[error("nothing to program: job has neither a flash image nor fuses")]
  EmptyJob,

  #[error("flash image not found: {0}")]
  MissingFlash(PathBuf),

  #[error("programmer script not found: {0}")]
  MissingScript(PathBuf),

  #[error(transparent)]
  Process(#[from] ProcessError),
}

impl ProgramError {
  /// The programmer's exit code, when the failure carries one.
  pub fn exit_code(&self) -> Option<i32> {
    match self {
      ProgramError::Process(err) => err.exit_code(),
      _ => None,
    }
  }
}

/// What a single programmer invocation should write to the device.
/// At least one of the two payloads must be present.
#[derive(Debug, Clone, Copy)]
pub struct ProgramJob<'a> {
  pub flash: Option<&'a Path>,
  pub fuses: Option<&'a FuseMap>,
}

impl<'a> ProgramJob<'a> {
  pub fn flash_only(flash: &'a Path) -> Self {
    ProgramJob {
      flash: Some(flash),
      fuses: None,
    }
  }

  pub fn fuses_only(fuses: &'a FuseMap) -> Self {
    ProgramJob {
      flash: None,
      fuses: Some(fuses),
    }
  }

  pub fn full(flash: &'a Path, fuses: &'a FuseMap) -> Self {
    ProgramJob {
      flash: Some(flash),
      fuses: Some(fuses),
    }
  }
}

/// Capability interface over the device programmer.
#[allow(async_fn_in_trait)]
pub trait Programmer {
  /// Program the device in a single invocation.
  async fn program(&self, config: &BuildConfig, job: ProgramJob<'_>) -> Result<(), ProgramError>;
}

/// The tinyupdi serial-UPDI programmer script.
#[derive(Debug, Clone, Copy, Default)]
pub struct TinyUpdi;

impl Programmer for TinyUpdi {
  async fn program(&self, config: &BuildConfig, job: ProgramJob<'_>) -> Result<(), ProgramError> {
    if job.flash.is_none() && job.fuses.is_none() {
      return Err(ProgramError::EmptyJob);
    }
    let script = &config.programmer.script;
    if !script.is_file() {
      return Err(ProgramError::MissingScript(script.clone()));
    }
    if let Some(flash) = job.flash {
      if !flash.is_file() {
        return Err(ProgramError::MissingFlash(flash.to_path_buf()));
      }
    }

    let mut args: Vec<OsString> = vec![script.clone().into(), "-d".into(), config.device.clone().into()];
    if let Some(ref port) = config.programmer.port {
      args.push("-p".into());
      args.push(port.clone().into());
    }
    if let Some(flash) = job.flash {
      args.push("-b".into());
      args.push(flash.to_path_buf().into());
    }
    if let Some(fuses) = job.fuses {
      args.push("-fs".into());
      for pair in fuses.to_args() {
        args.push(pair.into());
      }
    }

    info!(
      device = %config.device,
      flash = job.flash.is_some(),
      fuses = job.fuses.is_some(),
      "programming over UPDI"
    );
    run_tool(Path::new(&config.programmer.python), args, &config.out_dir).await?;
    Ok(())
  }
}
