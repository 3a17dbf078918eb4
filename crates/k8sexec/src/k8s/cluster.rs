use async_trait::async_trait;
use error_stack::Report;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::apps::v1::StatefulSet;
use k8s_openapi::api::core::v1::Pod;
use kube::api::ListParams;
use kube::Api;
use kube::Client;

use super::ClusterClient;
use super::KubernetesError;
use super::PodSnapshot;
use super::Workload;
use super::WorkloadKind;

/// [`ClusterClient`] backed by a live `kube` client, scoped to one namespace.
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
    namespace: String,
}

impl KubeCluster {
    pub fn new(client: Client, namespace: impl Into<String>) -> Self {
        Self {
            client,
            namespace: namespace.into(),
        }
    }

    fn api<K>(&self) -> Api<K>
    where
        K: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope>,
        <K as kube::Resource>::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), &self.namespace)
    }

    fn list_failed(&self, kind: WorkloadKind, err: kube::Error) -> Report<KubernetesError> {
        Report::new(KubernetesError::ListFailed {
            kind: kind.to_string(),
            message: format!("namespace {}", self.namespace),
        })
        .attach_printable(format!("Kubernetes API error: {err}"))
    }
}

#[async_trait]
impl ClusterClient for KubeCluster {
    async fn list_pods(
        &self,
        label_selector: Option<&str>,
    ) -> Result<Vec<PodSnapshot>, Report<KubernetesError>> {
        let mut params = ListParams::default();
        if let Some(selector) = label_selector {
            params = params.labels(selector);
        }

        let pods = self.api::<Pod>().list(&params).await.map_err(|e| {
            Report::new(KubernetesError::ListFailed {
                kind: "pods".to_string(),
                message: format!(
                    "namespace {} selector {:?}",
                    self.namespace,
                    label_selector.unwrap_or_default()
                ),
            })
            .attach_printable(format!("Kubernetes API error: {e}"))
        })?;

        Ok(pods.items.into_iter().map(pod_snapshot).collect())
    }

    async fn list_deployments(&self) -> Result<Vec<Workload>, Report<KubernetesError>> {
        let deployments = self
            .api::<Deployment>()
            .list(&ListParams::default())
            .await
            .map_err(|e| self.list_failed(WorkloadKind::Deployment, e))?;

        Ok(deployments
            .items
            .into_iter()
            .map(|deployment| Workload {
                kind: WorkloadKind::Deployment,
                name: deployment.metadata.name.unwrap_or_default(),
                match_labels: deployment
                    .spec
                    .and_then(|spec| spec.selector.match_labels)
                    .unwrap_or_default(),
            })
            .collect())
    }

    async fn list_stateful_sets(&self) -> Result<Vec<Workload>, Report<KubernetesError>> {
        let stateful_sets = self
            .api::<StatefulSet>()
            .list(&ListParams::default())
            .await
            .map_err(|e| self.list_failed(WorkloadKind::StatefulSet, e))?;

        Ok(stateful_sets
            .items
            .into_iter()
            .map(|stateful_set| Workload {
                kind: WorkloadKind::StatefulSet,
                name: stateful_set.metadata.name.unwrap_or_default(),
                match_labels: stateful_set
                    .spec
                    .and_then(|spec| spec.selector.match_labels)
                    .unwrap_or_default(),
            })
            .collect())
    }

    async fn get_pod(&self, name: &str) -> Result<PodSnapshot, Report<KubernetesError>> {
        let pod = self.api::<Pod>().get(name).await.map_err(|e| {
            Report::new(KubernetesError::PodNotFound {
                pod_name: name.to_string(),
                namespace: self.namespace.clone(),
            })
            .attach_printable(format!("Kubernetes API error: {e}"))
        })?;

        Ok(pod_snapshot(pod))
    }
}

fn pod_snapshot(pod: Pod) -> PodSnapshot {
    let metadata = pod.metadata;
    PodSnapshot {
        name: metadata.name.unwrap_or_default(),
        phase: pod.status.and_then(|status| status.phase),
        labels: metadata.labels.unwrap_or_default(),
        containers: pod
            .spec
            .map(|spec| spec.containers.into_iter().map(|c| c.name).collect())
            .unwrap_or_default(),
    }
}
