//! Test adapters implementing the cluster and executor traits
//!
//! The mock keeps a fixed namespace snapshot, answers label selector queries
//! against pod labels and records every exec request it receives.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use error_stack::Report;
use tokio::io::AsyncRead;
use tokio::io::AsyncReadExt;

use super::ClusterClient;
use super::KubernetesError;
use super::PodSnapshot;
use super::Workload;
use super::WorkloadKind;
use crate::exec::exit_code;
use crate::exec::CommandExecutor;
use crate::exec::ExecutionStatus;
use crate::exec::ExecutionTarget;

/// An exec request as seen by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedExec {
    pub target: ExecutionTarget,
    pub command: Vec<String>,
    pub stdin: Vec<u8>,
}

pub fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub fn pod(
    name: &str,
    phase: &str,
    pod_labels: &[(&str, &str)],
    containers: &[&str],
) -> PodSnapshot {
    PodSnapshot {
        name: name.to_string(),
        phase: Some(phase.to_string()),
        labels: labels(pod_labels),
        containers: containers.iter().map(|c| c.to_string()).collect(),
    }
}

/// Mock cluster and executor for testing
#[derive(Default)]
pub struct MockCluster {
    namespace: String,
    pods: Vec<PodSnapshot>,
    deployments: Vec<Workload>,
    stateful_sets: Vec<Workload>,
    failing_selectors: HashSet<String>,
    exit_codes: HashMap<(String, String), i32>,
    missing_utilities: HashSet<(String, String)>,
    api_calls: Arc<Mutex<usize>>,
    executions: Arc<Mutex<Vec<RecordedExec>>>,
}

impl MockCluster {
    pub fn new(namespace: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            ..Default::default()
        }
    }

    pub fn with_pod(mut self, pod: PodSnapshot) -> Self {
        self.pods.push(pod);
        self
    }

    pub fn with_deployment(mut self, name: &str, match_labels: &[(&str, &str)]) -> Self {
        self.deployments.push(Workload {
            kind: WorkloadKind::Deployment,
            name: name.to_string(),
            match_labels: labels(match_labels),
        });
        self
    }

    pub fn with_stateful_set(mut self, name: &str, match_labels: &[(&str, &str)]) -> Self {
        self.stateful_sets.push(Workload {
            kind: WorkloadKind::StatefulSet,
            name: name.to_string(),
            match_labels: labels(match_labels),
        });
        self
    }

    /// Make pod listing fail for this exact selector string.
    pub fn failing_selector(mut self, selector: &str) -> Self {
        self.failing_selectors.insert(selector.to_string());
        self
    }

    pub fn with_exit_code(mut self, pod: &str, container: &str, code: i32) -> Self {
        self.exit_codes
            .insert((pod.to_string(), container.to_string()), code);
        self
    }

    /// Running `utility` alone in this container reports "command not found".
    pub fn without_utility(mut self, container: &str, utility: &str) -> Self {
        self.missing_utilities
            .insert((container.to_string(), utility.to_string()));
        self
    }

    pub fn api_calls(&self) -> usize {
        *self.api_calls.lock().unwrap()
    }

    pub fn executions(&self) -> Vec<RecordedExec> {
        self.executions.lock().unwrap().clone()
    }

    fn record_call(&self) {
        *self.api_calls.lock().unwrap() += 1;
    }
}

fn matches_selector(pod: &PodSnapshot, selector: &str) -> bool {
    selector
        .split(',')
        .filter(|term| !term.is_empty())
        .all(|term| match term.split_once('=') {
            Some((key, value)) => pod.labels.get(key).map(String::as_str) == Some(value),
            None => false,
        })
}

#[async_trait]
impl ClusterClient for MockCluster {
    async fn list_pods(
        &self,
        label_selector: Option<&str>,
    ) -> Result<Vec<PodSnapshot>, Report<KubernetesError>> {
        self.record_call();
        let selector = label_selector.unwrap_or_default();
        if self.failing_selectors.contains(selector) {
            return Err(Report::new(KubernetesError::ListFailed {
                kind: "pods".to_string(),
                message: format!("selector {selector:?} rejected"),
            }));
        }
        Ok(self
            .pods
            .iter()
            .filter(|pod| matches_selector(pod, selector))
            .cloned()
            .collect())
    }

    async fn list_deployments(&self) -> Result<Vec<Workload>, Report<KubernetesError>> {
        self.record_call();
        Ok(self.deployments.clone())
    }

    async fn list_stateful_sets(&self) -> Result<Vec<Workload>, Report<KubernetesError>> {
        self.record_call();
        Ok(self.stateful_sets.clone())
    }

    async fn get_pod(&self, name: &str) -> Result<PodSnapshot, Report<KubernetesError>> {
        self.record_call();
        self.pods
            .iter()
            .find(|pod| pod.name == name)
            .cloned()
            .ok_or_else(|| {
                Report::new(KubernetesError::PodNotFound {
                    pod_name: name.to_string(),
                    namespace: self.namespace.clone(),
                })
            })
    }
}

#[async_trait]
impl CommandExecutor for MockCluster {
    async fn execute(
        &self,
        target: &ExecutionTarget,
        command: &[String],
        stdin: &mut (dyn AsyncRead + Send + Unpin),
    ) -> ExecutionStatus {
        let mut input = Vec::new();
        stdin.read_to_end(&mut input).await.unwrap();
        self.executions.lock().unwrap().push(RecordedExec {
            target: target.clone(),
            command: command.to_vec(),
            stdin: input.clone(),
        });

        let utility_missing = command.len() == 1
            && self
                .missing_utilities
                .contains(&(target.container.clone(), command[0].clone()));
        if utility_missing {
            return ExecutionStatus::new(
                target,
                exit_code::COMMAND_NOT_FOUND,
                "command terminated with non-zero exit code",
                "",
                "sh: not found",
            );
        }

        let code = self
            .exit_codes
            .get(&(target.pod.clone(), target.container.clone()))
            .copied()
            .unwrap_or(0);
        let error = if code == 0 {
            String::new()
        } else {
            format!("command terminated with non-zero exit code {code}")
        };
        ExecutionStatus::new(target, code, &error, &String::from_utf8_lossy(&input), "")
    }
}
