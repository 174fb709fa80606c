//! External process execution.
//!
//! Every orchestration step shells out to an external tool. Stderr is
//! inherited so the tool's own diagnostics reach the console untranslated;
//! stdout is captured for the steps that consume it (disassembly, size
//! report). The tool's exit status is the sole error signal.

use std::ffi::OsStr;
use std::path::Path;
use std::process::Stdio;

use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ProcessError {
  #[error("failed to start {tool}: {source}")]
  Spawn {
    tool: String,
    #[source]
    source: std::io::Error,
  },

  #[error("{tool} failed with exit code {code:?}")]
  Failed { tool: String, code: Option<i32> },

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

impl ProcessError {
  /// The external tool's exit code, when the failure carries one.
  pub fn exit_code(&self) -> Option<i32> {
    match self {
      ProcessError::Failed { code, .. } => *code,
      _ => None,
    }
  }
}

/// Captured output of a successful tool run.
#[derive(Debug)]
pub struct ToolOutput {
  pub stdout: Vec<u8>,
}

impl ToolOutput {
  pub fn stdout_utf8(&self) -> String {
    String::from_utf8_lossy(&self.stdout).into_owned()
  }
}

/// Run an external tool to completion, failing on non-zero exit status.
pub async fn run_tool<I, S>(program: &Path, args: I, cwd: &Path) -> Result<ToolOutput, ProcessError>
where
  I: IntoIterator<Item = S>,
  S: AsRef<OsStr>,
{
  let tool = program
    .file_name()
    .and_then(|n| n.to_str())
    .unwrap_or("tool")
    .to_string();

  let mut command = Command::new(program);
  command
    .args(args)
    .current_dir(cwd)
    .stdin(Stdio::null())
    .stdout(Stdio::piped())
    .stderr(Stdio::inherit());

  debug!(tool = %tool, cwd = %cwd.display(), "spawning process");

  let child = command.spawn().map_err(|source| ProcessError::Spawn {
    tool: tool.clone(),
    source,
  })?;
  let output = child.wait_with_output().await?;

  if !output.status.success() {
    return Err(ProcessError::Failed {
      tool,
      code: output.status.code(),
    });
  }

  Ok(ToolOutput {
    stdout: output.stdout,
  })
}
