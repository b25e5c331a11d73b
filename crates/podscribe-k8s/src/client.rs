use anyhow::{Context, Result};
use k8s_openapi::api::core::v1::Pod;
use kube::Api;
use kube::api::{ApiResource, DynamicObject, ListParams};
use kube::config::{KubeConfigOptions, Kubeconfig};

use podscribe_types::PodInfo;
use podscribe_watch::PatternList;

/// Which namespaces API calls are issued against
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PodScope {
    All,
    Namespace(String),
}

impl PodScope {
    /// A single exact namespace narrows every call; anything else lists all
    /// namespaces and leaves filtering to the watcher.
    pub fn from_namespaces(namespaces: &PatternList) -> Self {
        match namespaces.single_exact() {
            Some(namespace) => Self::Namespace(namespace.to_string()),
            None => Self::All,
        }
    }

    pub(crate) fn pods(&self, client: kube::Client) -> Api<Pod> {
        match self {
            Self::All => Api::all(client),
            Self::Namespace(namespace) => Api::namespaced(client, namespace),
        }
    }

    pub(crate) fn dynamic_pods(&self, client: kube::Client) -> Api<DynamicObject> {
        let resource = ApiResource::erase::<Pod>(&());
        match self {
            Self::All => Api::all_with(client, &resource),
            Self::Namespace(namespace) => Api::namespaced_with(client, namespace, &resource),
        }
    }
}

/// Initial pod listing plus the version to start watching from
#[derive(Debug)]
pub struct PodSnapshot {
    pub pods: Vec<PodInfo>,
    pub resource_version: String,
}

/// Kubernetes client wrapper
#[derive(Clone)]
pub struct KubeClient {
    client: kube::Client,
    context: Option<String>,
}

impl KubeClient {
    /// Connect using the kubeconfig (named or current context), falling back
    /// to the in-cluster service account when there is no kubeconfig.
    pub async fn new(context: Option<&str>) -> Result<Self> {
        let config = match Kubeconfig::read() {
            Ok(kubeconfig) => {
                let context = context.map(str::to_string).or(kubeconfig.current_context.clone());
                let config = kube::Config::from_custom_kubeconfig(
                    kubeconfig,
                    &KubeConfigOptions {
                        context: context.clone(),
                        ..Default::default()
                    },
                )
                .await
                .context(format!(
                    "Failed to create config for context: {}",
                    context.as_deref().unwrap_or("<current>")
                ))?;
                return Self::from_config(config, context);
            }
            Err(e) if context.is_none() => {
                tracing::debug!(error = %e, "No kubeconfig, trying in-cluster configuration");
                kube::Config::incluster()
                    .context("Failed to read kubeconfig. Is kubectl configured?")?
            }
            Err(e) => {
                return Err(e).context("Failed to read kubeconfig. Is kubectl configured?");
            }
        };

        Self::from_config(config, None)
    }

    fn from_config(config: kube::Config, context: Option<String>) -> Result<Self> {
        let client = kube::Client::try_from(config).context(format!(
            "Failed to create client for context: {}",
            context.as_deref().unwrap_or("<in-cluster>")
        ))?;

        Ok(Self { client, context })
    }

    /// Wrap an existing client
    pub fn from_client(client: kube::Client) -> Self {
        Self {
            client,
            context: None,
        }
    }

    pub fn client(&self) -> &kube::Client {
        &self.client
    }

    /// Name of the kubeconfig context in use, if any
    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    /// List pods in `scope`, narrowed server-side by `selector`.
    ///
    /// Pods that cannot be converted are skipped.
    pub async fn list_pods(&self, scope: &PodScope, selector: Option<&str>) -> Result<PodSnapshot> {
        let pods = scope.pods(self.client.clone());

        let mut params = ListParams::default();
        if let Some(selector) = selector.filter(|s| !s.is_empty()) {
            params = params.labels(selector);
        }

        let list = pods.list(&params).await.context(match scope {
            PodScope::All => "Failed to list pods".to_string(),
            PodScope::Namespace(ns) => format!("Failed to list pods in {}", ns),
        })?;

        let resource_version = list.metadata.resource_version.clone().unwrap_or_default();
        let pods = list
            .items
            .iter()
            .filter_map(|pod| match PodInfo::try_from(pod) {
                Ok(info) => Some(info),
                Err(e) => {
                    tracing::debug!(error = %e, "Skipping pod from initial listing");
                    None
                }
            })
            .collect();

        Ok(PodSnapshot {
            pods,
            resource_version,
        })
    }
}
