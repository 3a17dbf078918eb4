use std::io;

use async_trait::async_trait;
use error_stack::Report;
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Status;
use kube::api::AttachParams;
use kube::Api;
use kube::Client;
use tokio::io::AsyncRead;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWrite;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::exit_code;
use super::CommandExecutor;
use super::ExecError;
use super::ExecutionStatus;
use super::ExecutionTarget;

const STATUS_SUCCESS: &str = "Success";
const REASON_NON_ZERO_EXIT: &str = "NonZeroExitCode";
const CAUSE_EXIT_CODE: &str = "ExitCode";

/// Executes commands through the pod `exec` subresource.
///
/// Stateless across calls; each execution opens its own stream.
#[derive(Clone)]
pub struct KubeExecutor {
    client: Client,
    namespace: String,
}

impl KubeExecutor {
    pub fn new(client: Client, namespace: impl Into<String>) -> Self {
        Self {
            client,
            namespace: namespace.into(),
        }
    }

    /// Streams one command to completion, writing captured output into the
    /// given sinks.
    ///
    /// # Errors
    ///
    /// - [`ExecError::Setup`] if the exec channel cannot be established
    /// - [`ExecError::NonZeroExit`] if the remote process exits with a non-zero code
    /// - [`ExecError::Stream`] if the stream breaks or ends with a failure status
    async fn stream(
        &self,
        target: &ExecutionTarget,
        command: &[String],
        stdin: &mut (dyn AsyncRead + Send + Unpin),
        stdout: &mut Vec<u8>,
        stderr: &mut Vec<u8>,
    ) -> Result<(), Report<ExecError>> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), &self.namespace);
        let params = AttachParams::default()
            .container(target.container.clone())
            .stdin(true)
            .stdout(true)
            .stderr(true)
            .tty(false);

        let mut attached = api
            .exec(&target.pod, command.to_vec(), &params)
            .await
            .map_err(|e| {
                Report::new(ExecError::Setup {
                    message: e.to_string(),
                })
            })?;

        let status = attached.take_status();
        let stdin_writer = attached.stdin();
        let stdout_reader = attached.stdout();
        let stderr_reader = attached.stderr();

        let (stdin_result, stdout_result, stderr_result) = tokio::join!(
            feed_stdin(stdin, stdin_writer),
            drain(stdout_reader, stdout),
            drain(stderr_reader, stderr),
        );

        // commands that never read stdin close it early
        if let Err(e) = stdin_result {
            debug!(pod = %target.pod, container = %target.container, "stdin not fully consumed: {e}");
        }

        let status = match status {
            Some(status) => status.await,
            None => None,
        };
        check_status(status)?;

        attached.join().await.map_err(|e| {
            Report::new(ExecError::Stream {
                message: e.to_string(),
            })
        })?;

        for result in [stdout_result, stderr_result] {
            result.map_err(|e| {
                Report::new(ExecError::Stream {
                    message: format!("failed to read command output: {e}"),
                })
            })?;
        }

        Ok(())
    }
}

#[async_trait]
impl CommandExecutor for KubeExecutor {
    #[tracing::instrument(skip(self, target, stdin), fields(namespace = %self.namespace, pod = %target.pod, container = %target.container))]
    async fn execute(
        &self,
        target: &ExecutionTarget,
        command: &[String],
        stdin: &mut (dyn AsyncRead + Send + Unpin),
    ) -> ExecutionStatus {
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();

        let (code, error) = match self
            .stream(target, command, stdin, &mut stdout, &mut stderr)
            .await
        {
            Ok(()) => (0, String::new()),
            Err(report) => {
                let err = report.current_context();
                let (_, description) = exit_code::classify_error(err);
                debug!(exit_code = err.exit_code(), %description, "command failed: {report:?}");
                (err.exit_code(), err.to_string())
            }
        };

        ExecutionStatus::new(
            target,
            code,
            &error,
            &String::from_utf8_lossy(&stdout),
            &String::from_utf8_lossy(&stderr),
        )
    }
}

async fn feed_stdin<W>(
    input: &mut (dyn AsyncRead + Send + Unpin),
    writer: Option<W>,
) -> io::Result<u64>
where
    W: AsyncWrite + Unpin,
{
    let Some(mut writer) = writer else {
        return Ok(0);
    };
    let copied = tokio::io::copy(input, &mut writer).await?;
    // dropping the writer alone does not signal EOF to the remote process
    writer.shutdown().await?;
    Ok(copied)
}

async fn drain<R>(reader: Option<R>, sink: &mut Vec<u8>) -> io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    match reader {
        Some(mut reader) => reader.read_to_end(sink).await,
        None => Ok(0),
    }
}

/// Maps the terminal exec status to a result.
///
/// A missing status means the stream closed without reporting a failure.
fn check_status(status: Option<Status>) -> Result<(), Report<ExecError>> {
    let Some(status) = status else {
        return Ok(());
    };
    if status.status.as_deref() == Some(STATUS_SUCCESS) {
        return Ok(());
    }

    match exit_code_from_status(&status) {
        Some(code) => Err(Report::new(ExecError::NonZeroExit {
            code,
            message: status
                .message
                .unwrap_or_else(|| format!("command terminated with non-zero exit code {code}")),
        })),
        None => Err(Report::new(ExecError::Stream {
            message: status
                .message
                .unwrap_or_else(|| "command failed without a status message".to_string()),
        })),
    }
}

fn exit_code_from_status(status: &Status) -> Option<i32> {
    if status.reason.as_deref() != Some(REASON_NON_ZERO_EXIT) {
        return None;
    }
    status
        .details
        .as_ref()?
        .causes
        .as_ref()?
        .iter()
        .find(|cause| cause.reason.as_deref() == Some(CAUSE_EXIT_CODE))
        .and_then(|cause| cause.message.as_deref())
        .and_then(|code| code.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::StatusCause;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::StatusDetails;
    use similar_asserts::assert_eq;
    use test_log::test;

    use super::*;

    fn exit_status(code: &str) -> Status {
        Status {
            status: Some("Failure".to_string()),
            reason: Some(REASON_NON_ZERO_EXIT.to_string()),
            message: Some(format!(
                "command terminated with non-zero exit code: exit status {code}"
            )),
            details: Some(StatusDetails {
                causes: Some(vec![StatusCause {
                    reason: Some(CAUSE_EXIT_CODE.to_string()),
                    message: Some(code.to_string()),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn success_status_is_ok() {
        let status = Status {
            status: Some(STATUS_SUCCESS.to_string()),
            ..Default::default()
        };
        assert!(check_status(Some(status)).is_ok());
        assert!(check_status(None).is_ok());
    }

    #[test]
    fn non_zero_exit_keeps_remote_code() {
        let err = check_status(Some(exit_status("137")))
            .expect_err("non-zero exit");
        let context = err.current_context();

        assert_eq!(context.exit_code(), 137);
        assert!(context.to_string().contains("exit status 137"));
    }

    #[test]
    fn failure_without_exit_cause_is_internal() {
        let status = Status {
            status: Some("Failure".to_string()),
            reason: Some("InternalError".to_string()),
            message: Some("container not found (\"db\")".to_string()),
            ..Default::default()
        };
        let err = check_status(Some(status)).expect_err("failure status");

        assert_eq!(err.current_context().exit_code(), -1);
        assert_eq!(
            err.current_context().to_string(),
            "container not found (\"db\")"
        );
    }

    #[test]
    fn unparsable_exit_cause_is_ignored() {
        assert_eq!(exit_code_from_status(&exit_status("abc")), None);
        assert_eq!(exit_code_from_status(&exit_status("2")), Some(2));
    }

    #[test(tokio::test)]
    async fn stdin_is_copied_then_closed() {
        let (writer, mut reader) = tokio::io::duplex(64);
        let mut input: &[u8] = b"echo hi\n";

        let copied = feed_stdin(&mut input, Some(writer)).await.expect("copy");
        let mut received = Vec::new();
        reader.read_to_end(&mut received).await.expect("read");

        assert_eq!(copied, 8);
        assert_eq!(received, b"echo hi\n");
    }

    #[test(tokio::test)]
    async fn unreachable_cluster_reports_setup_failure() {
        let config = kube::Config::new("http://127.0.0.1:1".parse().expect("cluster url"));
        let client = Client::try_from(config).expect("client");
        let executor = KubeExecutor::new(client, "default");
        let target = ExecutionTarget::new("web-0", "app");
        let mut stdin: &[u8] = b"ls\n";

        let status = executor
            .execute(&target, &["sh".to_string()], &mut stdin)
            .await;

        assert_eq!(status.pod, "web-0");
        assert_eq!(status.container, "app");
        assert_eq!(status.exit_code, -1);
        assert!(status.error_lines.iter().any(|line| !line.is_empty()));
        assert_eq!(status.stdout_lines, vec![String::new()]);
        assert_eq!(status.stderr_lines, vec![String::new()]);
    }

    #[test(tokio::test)]
    async fn missing_stream_drains_nothing() {
        let mut sink = Vec::new();
        let read = drain(None::<&[u8]>, &mut sink).await.expect("drain");
        assert_eq!(read, 0);
        assert!(sink.is_empty());
    }
}
