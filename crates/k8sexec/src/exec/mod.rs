//! Remote command execution inside pod containers.
//!
//! - [`CommandExecutor`]: runs one command against one [`ExecutionTarget`]
//! - [`KubeExecutor`]: executor backed by the pod `exec` subresource
//! - [`exit_code`]: descriptions for remote exit codes

use core::error::Error;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use tokio::io::AsyncRead;

pub mod exit_code;
pub mod kube_exec;

pub use kube_exec::KubeExecutor;

/// One exec destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionTarget {
    pub pod: String,
    pub container: String,
}

impl ExecutionTarget {
    pub fn new(pod: impl Into<String>, container: impl Into<String>) -> Self {
        Self {
            pod: pod.into(),
            container: container.into(),
        }
    }
}

/// Outcome of a single exec attempt.
///
/// Text fields are kept as lines; an empty capture is a single empty line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionStatus {
    #[serde(rename = "Pod")]
    pub pod: String,
    #[serde(rename = "Container")]
    pub container: String,
    #[serde(rename = "RetCode")]
    pub exit_code: i32,
    #[serde(rename = "Error")]
    pub error_lines: Vec<String>,
    #[serde(rename = "Stdout")]
    pub stdout_lines: Vec<String>,
    #[serde(rename = "Stderr")]
    pub stderr_lines: Vec<String>,
}

impl ExecutionStatus {
    pub fn new(
        target: &ExecutionTarget,
        exit_code: i32,
        error: &str,
        stdout: &str,
        stderr: &str,
    ) -> Self {
        Self {
            pod: target.pod.clone(),
            container: target.container.clone(),
            exit_code,
            error_lines: split_lines(error),
            stdout_lines: split_lines(stdout),
            stderr_lines: split_lines(stderr),
        }
    }

    pub fn error(&self) -> String {
        self.error_lines.join("\n")
    }

    pub fn stdout(&self) -> String {
        self.stdout_lines.join("\n")
    }

    pub fn stderr(&self) -> String {
        self.stderr_lines.join("\n")
    }
}

/// Splits on `\n` keeping empty segments, so `""` becomes `[""]` and joining
/// with `\n` restores the input.
pub fn split_lines(text: &str) -> Vec<String> {
    text.split('\n').map(str::to_string).collect()
}

/// Errors raised while running a command in a container.
#[derive(Debug, derive_more::Display)]
pub enum ExecError {
    #[display("{message}")]
    Setup { message: String },
    #[display("{message}")]
    Stream { message: String },
    #[display("{message}")]
    NonZeroExit { code: i32, message: String },
}

impl ExecError {
    /// Exit code to record for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            ExecError::NonZeroExit { code, .. } => *code,
            _ => -1,
        }
    }
}

impl Error for ExecError {}

/// Runs a command inside a container.
///
/// Failures never escape: they are recorded in the returned status.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(
        &self,
        target: &ExecutionTarget,
        command: &[String],
        stdin: &mut (dyn AsyncRead + Send + Unpin),
    ) -> ExecutionStatus;
}

/// Checks that `utility` can be started in the target container.
///
/// Runs the bare utility with empty input; only the shell's
/// "not found" and "cannot execute" codes count as missing.
pub async fn has_utility<E>(executor: &E, target: &ExecutionTarget, utility: &str) -> bool
where
    E: CommandExecutor + ?Sized,
{
    let mut empty: &[u8] = &[];
    let status = executor
        .execute(target, &[utility.to_string()], &mut empty)
        .await;
    status.exit_code != exit_code::COMMAND_NOT_FOUND
        && status.exit_code != exit_code::COMMAND_CANNOT_EXECUTE
}
