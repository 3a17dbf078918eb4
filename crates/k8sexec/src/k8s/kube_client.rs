use std::path::PathBuf;

use error_stack::Report;
use error_stack::ResultExt;
use kube::config::KubeConfigOptions;
use kube::config::Kubeconfig;
use kube::Client;
use kube::Config;

use crate::k8s::KubernetesError;

/// Platform default kubeconfig location, `$HOME/.kube/config`.
pub fn default_kubeconfig_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".kube").join("config"))
}

pub async fn init_kube_client(
    kubeconfig: Option<PathBuf>,
) -> Result<Client, Report<KubernetesError>> {
    let client = match kubeconfig {
        Some(kubeconfig_path) => {
            tracing::debug!(path = %kubeconfig_path.display(), "loading kubeconfig");
            let kubeconfig = Kubeconfig::read_from(&kubeconfig_path).change_context(
                KubernetesError::ConnectionFailed {
                    message: format!(
                        "Failed to read kubeconfig file: {}",
                        kubeconfig_path.display()
                    ),
                },
            )?;

            let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .change_context(KubernetesError::ConnectionFailed {
                    message: format!(
                        "Failed to create config from kubeconfig: {}",
                        kubeconfig_path.display()
                    ),
                })?;

            Client::try_from(config).change_context(KubernetesError::ConnectionFailed {
                message: "Failed to create Kubernetes client from custom kubeconfig".to_string(),
            })?
        }
        None => {
            // Use default configuration (in-cluster or KUBECONFIG)
            Client::try_default()
                .await
                .change_context(KubernetesError::ConnectionFailed {
                    message: "Failed to create Kubernetes client".to_string(),
                })?
        }
    };
    Ok(client)
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test(tokio::test)]
    async fn missing_kubeconfig_is_a_connection_error() {
        let path = PathBuf::from("/nonexistent/k8sexec/kubeconfig");
        let err = init_kube_client(Some(path))
            .await
            .map(|_| ())
            .expect_err("reading a missing file should fail");

        assert!(matches!(
            err.current_context(),
            KubernetesError::ConnectionFailed { .. }
        ));
        assert!(err.to_string().contains("/nonexistent/k8sexec/kubeconfig"));
    }

    #[test]
    fn default_path_ends_with_kube_config() {
        if let Some(path) = default_kubeconfig_path() {
            assert!(path.ends_with(".kube/config"));
        }
    }
}
