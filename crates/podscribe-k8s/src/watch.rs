use futures::StreamExt;
use kube::api::{DynamicObject, WatchEvent, WatchParams};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use podscribe_types::{PodEvent, PodEventKind};

use crate::client::{KubeClient, PodScope};

/// HTTP status the API server uses when a resource version is too old
const GONE: u16 = 410;

/// Feeds raw pod watch events into `tx`.
///
/// Each server-side watch window is resumed from the last seen resource
/// version. The channel closes when `cancel` fires, the version expires, a
/// watch request fails, or the receiver goes away. Events missed while
/// resuming are not reconciled.
pub fn spawn_pod_watch(
    client: &KubeClient,
    scope: PodScope,
    selector: Option<String>,
    resource_version: String,
    tx: mpsc::Sender<PodEvent>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    let api = scope.dynamic_pods(client.client().clone());

    tokio::spawn(async move {
        let mut params = WatchParams::default();
        if let Some(selector) = selector.as_deref().filter(|s| !s.is_empty()) {
            params = params.labels(selector);
        }

        let mut version = resource_version;
        loop {
            let started = tokio::select! {
                _ = cancel.cancelled() => return,
                started = api.watch(&params, &version) => started,
            };
            let mut stream = match started {
                Ok(stream) => stream.boxed(),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to watch pods");
                    return;
                }
            };

            loop {
                let item = tokio::select! {
                    _ = cancel.cancelled() => return,
                    item = stream.next() => item,
                };

                let event = match item {
                    Some(Ok(event)) => event,
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "Pod watch failed");
                        return;
                    }
                    None => break,
                };

                let Some(event) = translate(event, &mut version) else {
                    return;
                };
                if tx.send(event).await.is_err() {
                    return;
                }
            }

            tracing::debug!(resource_version = %version, "Watch window ended, resuming");
        }
    })
}

/// Convert a typed watch event into a raw [`PodEvent`], remembering the
/// newest resource version. Returns `None` once the watch has expired.
fn translate(event: WatchEvent<DynamicObject>, version: &mut String) -> Option<PodEvent> {
    let (kind, object) = match event {
        WatchEvent::Added(obj) => (PodEventKind::Added, obj),
        WatchEvent::Modified(obj) => (PodEventKind::Modified, obj),
        WatchEvent::Deleted(obj) => (PodEventKind::Deleted, obj),
        WatchEvent::Bookmark(bookmark) => {
            *version = bookmark.metadata.resource_version;
            return Some(PodEvent::new(PodEventKind::Bookmark, serde_json::Value::Null));
        }
        WatchEvent::Error(e) if e.code == GONE => {
            tracing::warn!(error = %e, "Pod watch expired");
            return None;
        }
        WatchEvent::Error(e) => {
            tracing::warn!(error = %e, "Pod watch reported an error");
            let payload = serde_json::to_value(&e).unwrap_or_default();
            return Some(PodEvent::new(PodEventKind::Error, payload));
        }
    };

    if let Some(v) = &object.metadata.resource_version {
        version.clone_from(v);
    }

    match serde_json::to_value(&object) {
        Ok(payload) => Some(PodEvent::new(kind, payload)),
        Err(e) => {
            // keep the watch alive; the watcher skips undecodable payloads
            tracing::debug!(error = %e, "Failed to serialize watch object");
            Some(PodEvent::new(kind, serde_json::Value::Null))
        }
    }
}
