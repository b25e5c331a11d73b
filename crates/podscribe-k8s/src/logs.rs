use anyhow::Context;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::Api;
use kube::api::LogParams;

use podscribe_watch::{LogRequest, LogSource, LogStream};

use crate::client::KubeClient;

/// Opens container log streams through the pod `log` subresource
#[derive(Clone)]
pub struct KubeLogSource {
    client: kube::Client,
}

impl KubeLogSource {
    pub fn new(client: &KubeClient) -> Self {
        Self {
            client: client.client().clone(),
        }
    }
}

/// Translate a log request into API parameters
pub(crate) fn log_params(request: &LogRequest) -> LogParams {
    LogParams {
        follow: request.follow,
        container: Some(request.container.clone()),
        timestamps: request.timestamps,
        // Use since_seconds if provided, otherwise use tail_lines
        tail_lines: if request.since_seconds.is_some() {
            None
        } else {
            request.tail_lines
        },
        since_seconds: request.since_seconds,
        ..Default::default()
    }
}

#[async_trait]
impl LogSource for KubeLogSource {
    async fn open(&self, request: &LogRequest) -> anyhow::Result<LogStream> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), &request.namespace);

        let stream = pods
            .log_stream(&request.pod, &log_params(request))
            .await
            .with_context(|| {
                format!(
                    "Failed to open log stream for {}/{} container {}",
                    request.namespace, request.pod, request.container
                )
            })?;

        Ok(Box::pin(stream))
    }
}
