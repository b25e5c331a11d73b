use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use podscribe_types::{ContainerStatusInfo, IncarnationId, PodInfo};

use crate::collect::{CollectionReport, CollectionTask};
use crate::options::WatchOptions;
use crate::source::{LogRequest, LogSink, LogSource, LogTarget};
use crate::tracker::IncarnationTracker;

/// Starts one collection task per new container incarnation
#[derive(Clone)]
pub struct Dispatcher {
    options: Arc<WatchOptions>,
    tracker: IncarnationTracker,
    source: Arc<dyn LogSource>,
    sink: Arc<dyn LogSink>,
}

impl Dispatcher {
    pub fn new(
        options: Arc<WatchOptions>,
        tracker: IncarnationTracker,
        source: Arc<dyn LogSource>,
        sink: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            options,
            tracker,
            source,
            sink,
        }
    }

    /// Inspect init containers, then regular containers, and spawn a task onto
    /// `tasks` for every incarnation not seen before.
    ///
    /// Returns the number of tasks spawned.
    pub fn dispatch(
        &self,
        pod: &Arc<PodInfo>,
        tasks: &mut JoinSet<CollectionReport>,
        cancel: &CancellationToken,
    ) -> usize {
        let init = pod
            .init_containers
            .iter()
            .map(|name| (name, pod.init_container_status(name)));
        let regular = pod
            .containers
            .iter()
            .map(|name| (name, pod.container_status(name)));

        let mut spawned = 0;
        for (container, status) in init.chain(regular) {
            let Some(restart_count) = self.ready_incarnation(pod, container, status) else {
                continue;
            };

            let id = IncarnationId::new(pod, container, restart_count);
            if !self.tracker.try_insert(id) {
                continue;
            }

            self.spawn(pod, container, restart_count, tasks, cancel);
            spawned += 1;
        }

        spawned
    }

    /// The restart count of a container that qualifies for collection
    fn ready_incarnation(
        &self,
        pod: &PodInfo,
        container: &str,
        status: Option<&ContainerStatusInfo>,
    ) -> Option<i32> {
        let skip = |reason: &str| {
            tracing::debug!(
                namespace = %pod.namespace,
                pod = %pod.name,
                container,
                "{reason}"
            );
        };

        if !self.options.container_names.matches(container) {
            skip("Container name does not match.");
            return None;
        }

        let Some(status) = status else {
            skip("Container has no status yet.");
            return None;
        };

        if self.options.running_only {
            if !status.is_running() {
                skip("Container is not running.");
                return None;
            }
        } else if !status.is_running() && !status.is_terminated() {
            skip("Container is still waiting.");
            return None;
        }

        Some(status.restart_count)
    }

    fn spawn(
        &self,
        pod: &Arc<PodInfo>,
        container: &str,
        restart_count: i32,
        tasks: &mut JoinSet<CollectionReport>,
        cancel: &CancellationToken,
    ) {
        let logs = &self.options.logs;
        let request = LogRequest {
            namespace: pod.namespace.clone(),
            pod: pod.name.clone(),
            container: container.to_string(),
            follow: !self.options.one_shot,
            timestamps: logs.timestamps,
            tail_lines: logs.tail_lines,
            since_seconds: logs.since_seconds,
        };
        let target = LogTarget {
            pod: Arc::clone(pod),
            container: container.to_string(),
            restart_count,
        };

        let span = tracing::info_span!(
            "collect",
            namespace = %pod.namespace,
            pod = %pod.name,
            container,
            restart_count
        );

        let task = CollectionTask::new(
            target,
            request,
            Arc::clone(&self.source),
            Arc::clone(&self.sink),
            cancel.child_token(),
        );
        tasks.spawn(task.run().instrument(span));
    }
}
