//! Kubernetes integration module.
//!
//! This module wraps the cluster API behind the [`ClusterClient`] trait so the
//! resolver and orchestrator can run against either a live cluster or a mock.
//!
//! The main components are:
//! - [`KubeCluster`]: `kube` backed implementation of [`ClusterClient`]
//! - [`PodSnapshot`] / [`Workload`]: plain value records read from the API
//! - [`label_selector`]: formats workload match labels as a selector string

use core::error::Error;
use std::collections::BTreeMap;

use async_trait::async_trait;
use error_stack::Report;

pub mod cluster;
pub mod kube_client;
#[cfg(test)]
pub(crate) mod mock;
pub mod selector;

pub use cluster::KubeCluster;
pub use selector::label_selector;

/// Pod phase reported by the API for pods whose containers are up.
pub const RUNNING_PHASE: &str = "Running";

/// Errors that can occur during Kubernetes operations.
#[derive(Debug, derive_more::Display)]
pub enum KubernetesError {
    #[display("Failed to connect to Kubernetes API: {message}")]
    ConnectionFailed { message: String },
    #[display("Failed to list {kind}: {message}")]
    ListFailed { kind: String, message: String },
    #[display("Pod not found: {pod_name} in namespace {namespace}")]
    PodNotFound { pod_name: String, namespace: String },
}

impl Error for KubernetesError {}

/// Snapshot of a pod as returned by a list or get call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PodSnapshot {
    pub name: String,
    pub phase: Option<String>,
    pub labels: BTreeMap<String, String>,
    /// Container names in the order declared in the pod spec.
    pub containers: Vec<String>,
}

impl PodSnapshot {
    pub fn is_running(&self) -> bool {
        self.phase.as_deref() == Some(RUNNING_PHASE)
    }
}

/// Kind of controller that owns a group of replica pods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum WorkloadKind {
    #[display("deployment")]
    Deployment,
    #[display("statefulset")]
    StatefulSet,
}

/// A workload controller reduced to what target resolution needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workload {
    pub kind: WorkloadKind,
    pub name: String,
    /// `spec.selector.matchLabels` of the controller.
    pub match_labels: BTreeMap<String, String>,
}

/// Read access to the cluster objects used for target resolution.
///
/// All calls are scoped to the namespace the client was created for.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// List pods, optionally filtered by a label selector string.
    async fn list_pods(
        &self,
        label_selector: Option<&str>,
    ) -> Result<Vec<PodSnapshot>, Report<KubernetesError>>;

    async fn list_deployments(&self) -> Result<Vec<Workload>, Report<KubernetesError>>;

    async fn list_stateful_sets(&self) -> Result<Vec<Workload>, Report<KubernetesError>>;

    /// Fetch a single pod by name.
    ///
    /// # Errors
    ///
    /// - [`KubernetesError::PodNotFound`] if the pod cannot be retrieved
    async fn get_pod(&self, name: &str) -> Result<PodSnapshot, Report<KubernetesError>>;
}
