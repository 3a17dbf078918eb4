//! Reduces a namespace to one representative pod per workload.
//!
//! Replicas of a deployment or stateful set run the same image, so executing
//! against all of them repeats the same answer. Resolution keeps the first pod
//! each workload selector returns, then adds every pod no workload claimed.

use std::collections::HashMap;
use std::collections::HashSet;

use error_stack::Report;
use tracing::debug;
use tracing::warn;

use crate::k8s::label_selector;
use crate::k8s::ClusterClient;
use crate::k8s::KubernetesError;
use crate::k8s::PodSnapshot;
use crate::k8s::Workload;

/// Result of [`resolve_unique_pods`].
#[derive(Debug, Clone, Default)]
pub struct UniquePods {
    /// Number of pods in the namespace before reduction.
    pub total: usize,
    /// Representatives first (deployments, then stateful sets), then
    /// standalone pods, each pod at most once.
    pub pods: Vec<PodSnapshot>,
}

/// Resolves the unique pod set of the client's namespace.
///
/// A failing selector query skips that workload only.
///
/// # Errors
///
/// - [`KubernetesError::ListFailed`] if deployments, stateful sets or the
///   namespace pods cannot be listed
pub async fn resolve_unique_pods<C>(cluster: &C) -> Result<UniquePods, Report<KubernetesError>>
where
    C: ClusterClient + ?Sized,
{
    let mut resolution = Resolution::default();

    let deployments = cluster.list_deployments().await?;
    resolution.claim_workloads(cluster, &deployments).await;

    let stateful_sets = cluster.list_stateful_sets().await?;
    resolution.claim_workloads(cluster, &stateful_sets).await;

    let all_pods = cluster.list_pods(None).await?;
    let total = all_pods.len();
    for pod in all_pods {
        if !resolution.claimed.contains_key(&pod.name) {
            resolution.push(pod);
        }
    }

    debug!(
        total,
        unique = resolution.pods.len(),
        claimed = resolution.claimed.len(),
        "resolved unique pods"
    );

    Ok(UniquePods {
        total,
        pods: resolution.pods,
    })
}

#[derive(Default)]
struct Resolution {
    pods: Vec<PodSnapshot>,
    picked: HashSet<String>,
    /// Pod name to the number of workload selectors that matched it.
    claimed: HashMap<String, usize>,
}

impl Resolution {
    async fn claim_workloads<C>(&mut self, cluster: &C, workloads: &[Workload])
    where
        C: ClusterClient + ?Sized,
    {
        for workload in workloads {
            if workload.match_labels.is_empty() {
                debug!(kind = %workload.kind, name = %workload.name, "skipping workload without match labels");
                continue;
            }

            let selector = label_selector(&workload.match_labels);
            let pods = match cluster.list_pods(Some(&selector)).await {
                Ok(pods) => pods,
                Err(e) => {
                    warn!(kind = %workload.kind, name = %workload.name, %selector, "skipping workload: {e:?}");
                    continue;
                }
            };

            for pod in &pods {
                *self.claimed.entry(pod.name.clone()).or_default() += 1;
            }
            if let Some(first) = pods.into_iter().next() {
                self.push(first);
            }
        }
    }

    fn push(&mut self, pod: PodSnapshot) {
        if self.picked.insert(pod.name.clone()) {
            self.pods.push(pod);
        }
    }
}
