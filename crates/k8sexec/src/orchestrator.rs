//! Runs one command against the selected containers, one at a time.

use core::error::Error;
use std::io::Cursor;

use error_stack::Report;
use error_stack::ResultExt;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;
use tracing::info;

use crate::config::RunConfig;
use crate::config::Selection;
use crate::exec;
use crate::exec::CommandExecutor;
use crate::exec::ExecutionStatus;
use crate::exec::ExecutionTarget;
use crate::k8s::ClusterClient;
use crate::k8s::PodSnapshot;
use crate::resolver::resolve_unique_pods;

/// Command used to run piped input when no command is given.
pub const DEFAULT_SHELL: &str = "sh";

const STDIN_SUMMARY_LIMIT: usize = 40;
const STDIN_SUMMARY_SUFFIX: &str = "... too long";

/// Fatal errors that abort a run before any output is rendered.
#[derive(Debug, derive_more::Display)]
pub enum RunError {
    #[display("No commands provided either by stdin or arguments.")]
    NoCommand,
    #[display("Pod {pod} is not in Running phase")]
    PodNotRunning { pod: String },
    #[display("Failed to query the cluster")]
    Cluster,
}

impl Error for RunError {}

/// Aggregated results of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumerationStatus {
    /// Captured stdin, truncated for display.
    #[serde(rename = "Stdin")]
    pub stdin_summary: String,
    #[serde(rename = "Args")]
    pub args: Vec<String>,
    #[serde(rename = "Namespace")]
    pub namespace: String,
    #[serde(rename = "Statuses")]
    pub statuses: Vec<ExecutionStatus>,
}

impl EnumerationStatus {
    pub fn new(stdin: &str, args: Vec<String>, namespace: impl Into<String>) -> Self {
        Self {
            stdin_summary: summarize_stdin(stdin),
            args,
            namespace: namespace.into(),
            statuses: Vec::new(),
        }
    }
}

/// Keeps the first 40 characters of `stdin`, marking anything longer.
pub fn summarize_stdin(stdin: &str) -> String {
    match stdin.char_indices().nth(STDIN_SUMMARY_LIMIT) {
        Some((cut, _)) => format!("{}{}", &stdin[..cut], STDIN_SUMMARY_SUFFIX),
        None => stdin.to_string(),
    }
}

/// Picks the command to run for the given input.
///
/// # Errors
///
/// - [`RunError::NoCommand`] if both the command and the input are empty
pub fn resolve_command(
    command: &[String],
    input: &[u8],
) -> Result<Vec<String>, Report<RunError>> {
    match (command.is_empty(), input.is_empty()) {
        (true, true) => Err(Report::new(RunError::NoCommand)),
        (true, false) => Ok(vec![DEFAULT_SHELL.to_string()]),
        (false, _) => Ok(command.to_vec()),
    }
}

/// Drives a run over a cluster client and an executor.
pub struct Orchestrator<'a, C: ?Sized, E: ?Sized> {
    cluster: &'a C,
    executor: &'a E,
    config: RunConfig,
}

impl<'a, C, E> Orchestrator<'a, C, E>
where
    C: ClusterClient + ?Sized,
    E: CommandExecutor + ?Sized,
{
    pub fn new(cluster: &'a C, executor: &'a E, config: RunConfig) -> Self {
        Self {
            cluster,
            executor,
            config,
        }
    }

    /// Executes the configured command against every selected container.
    ///
    /// Each execution reads `input` from its start. Per-target failures are
    /// recorded in the returned statuses.
    ///
    /// # Errors
    ///
    /// - [`RunError::NoCommand`] before any cluster call if there is nothing to run
    /// - [`RunError::Cluster`] if the selected pod or the namespace cannot be read
    /// - [`RunError::PodNotRunning`] if an explicitly targeted container's pod is not running
    #[tracing::instrument(skip_all, fields(namespace = %self.config.namespace))]
    pub async fn run(&self, input: &[u8]) -> Result<EnumerationStatus, Report<RunError>> {
        let command = resolve_command(&self.config.command, input)?;
        let mut enumeration = EnumerationStatus::new(
            &String::from_utf8_lossy(input),
            command.clone(),
            self.config.namespace.as_str(),
        );

        let targets = self.targets().await?;
        info!(targets = targets.len(), ?command, "executing command");

        for target in targets {
            if let Some(utility) = &self.config.require_utility {
                if !exec::has_utility(self.executor, &target, utility).await {
                    info!(pod = %target.pod, container = %target.container, %utility, "skipping container without required utility");
                    continue;
                }
            }

            let mut stdin = Cursor::new(input);
            let status = self.executor.execute(&target, &command, &mut stdin).await;
            debug!(pod = %status.pod, container = %status.container, exit_code = status.exit_code, "execution finished");
            enumeration.statuses.push(status);
        }

        Ok(enumeration)
    }

    async fn targets(&self) -> Result<Vec<ExecutionTarget>, Report<RunError>> {
        match &self.config.selection {
            Selection::Pod { pod } => {
                let pod = self.get_pod(pod).await?;
                if !pod.is_running() {
                    info!(pod = %pod.name, phase = ?pod.phase, "pod is not running, nothing to execute");
                    return Ok(Vec::new());
                }
                Ok(container_targets(&pod).collect())
            }
            Selection::Container { pod, container } => {
                let snapshot = self.get_pod(pod).await?;
                if !snapshot.is_running() {
                    return Err(Report::new(RunError::PodNotRunning { pod: pod.clone() }));
                }
                Ok(vec![ExecutionTarget::new(pod.as_str(), container.as_str())])
            }
            Selection::AllPods => {
                let pods = if self.config.all_replicas {
                    self.cluster.list_pods(None).await
                } else {
                    resolve_unique_pods(self.cluster)
                        .await
                        .map(|unique| unique.pods)
                }
                .change_context(RunError::Cluster)?;

                Ok(pods
                    .iter()
                    .filter(|pod| pod.is_running())
                    .flat_map(container_targets)
                    .collect())
            }
        }
    }

    async fn get_pod(&self, name: &str) -> Result<PodSnapshot, Report<RunError>> {
        self.cluster
            .get_pod(name)
            .await
            .change_context(RunError::Cluster)
    }
}

fn container_targets(pod: &PodSnapshot) -> impl Iterator<Item = ExecutionTarget> + '_ {
    pod.containers
        .iter()
        .map(|container| ExecutionTarget::new(pod.name.as_str(), container.as_str()))
}
