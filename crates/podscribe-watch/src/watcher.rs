use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

use podscribe_types::{PodEvent, PodInfo};

use crate::collect::{CollectionOutcome, CollectionReport};
use crate::criteria::Criteria;
use crate::dispatch::Dispatcher;
use crate::options::WatchOptions;
use crate::source::{LogSink, LogSource};
use crate::tracker::IncarnationTracker;

/// Lifecycle of a [`Watcher`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WatchState {
    Initializing,
    DrainingSnapshot,
    LiveWatching,
    Finished,
}

/// Tally of every collection task a watch started
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WatchSummary {
    pub spawned: usize,
    pub completed: usize,
    pub open_failed: usize,
    pub sink_failed: usize,
    pub cancelled: usize,
    pub panicked: usize,

    /// Incarnations remembered by the tracker when the watch ended
    pub incarnations: usize,
}

impl WatchSummary {
    /// Number of tasks that reached a terminal outcome
    pub fn finished(&self) -> usize {
        self.completed + self.open_failed + self.sink_failed + self.cancelled + self.panicked
    }

    fn record(&mut self, result: Result<CollectionReport, JoinError>) {
        match result {
            Ok(report) => match report.outcome {
                CollectionOutcome::Completed => self.completed += 1,
                CollectionOutcome::OpenFailed(_) => self.open_failed += 1,
                CollectionOutcome::SinkFailed(_) => self.sink_failed += 1,
                CollectionOutcome::Cancelled => self.cancelled += 1,
            },
            Err(e) => {
                tracing::error!(error = %e, "Collection task panicked");
                self.panicked += 1;
            }
        }
    }
}

impl fmt::Display for WatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} collectors: {} completed, {} failed to open, {} failed in sink, {} cancelled, {} panicked",
            self.spawned,
            self.completed,
            self.open_failed,
            self.sink_failed,
            self.cancelled,
            self.panicked
        )
    }
}

/// Drives discovery: snapshot first, then live events, then joins every
/// collection task before returning.
pub struct Watcher {
    criteria: Criteria,
    dispatcher: Dispatcher,
    tracker: IncarnationTracker,
    state: RwLock<WatchState>,
}

impl Watcher {
    pub fn new(
        options: WatchOptions,
        source: Arc<dyn LogSource>,
        sink: Arc<dyn LogSink>,
    ) -> Self {
        let options = Arc::new(options);
        let tracker = IncarnationTracker::new();

        Self {
            criteria: Criteria::new(Arc::clone(&options)),
            dispatcher: Dispatcher::new(options, tracker.clone(), source, sink),
            tracker,
            state: RwLock::new(WatchState::Initializing),
        }
    }

    pub fn state(&self) -> WatchState {
        *self.state.read()
    }

    /// Collect logs for `initial` and, unless `events` is `None` (one-shot
    /// mode), for every pod observed on `events` until it closes or `cancel`
    /// fires.
    ///
    /// Individual task failures are counted in the summary, never returned.
    pub async fn watch(
        &self,
        initial: Vec<PodInfo>,
        events: Option<mpsc::Receiver<PodEvent>>,
        cancel: &CancellationToken,
    ) -> WatchSummary {
        let mut tasks = JoinSet::new();
        let mut summary = WatchSummary::default();

        self.set_state(WatchState::DrainingSnapshot);
        for pod in initial {
            summary.spawned += self.observe(pod, &mut tasks, cancel);
        }

        if let Some(mut events) = events {
            self.set_state(WatchState::LiveWatching);

            loop {
                let event = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        tracing::debug!("Watch cancelled");
                        break;
                    }
                    event = events.recv() => match event {
                        Some(event) => event,
                        None => {
                            tracing::debug!("Event source closed");
                            break;
                        }
                    },
                };

                match event.decode() {
                    Ok(pod) => summary.spawned += self.observe(pod, &mut tasks, cancel),
                    Err(e) => {
                        tracing::debug!(kind = ?event.kind, error = %e, "Skipping watch event");
                    }
                }

                while let Some(result) = tasks.try_join_next() {
                    summary.record(result);
                }
            }
        }

        self.set_state(WatchState::Finished);
        tracing::debug!(running = tasks.len(), "Waiting for collectors to finish");
        while let Some(result) = tasks.join_next().await {
            summary.record(result);
        }

        summary.incarnations = self.tracker.len();
        summary
    }

    fn observe(
        &self,
        pod: PodInfo,
        tasks: &mut JoinSet<CollectionReport>,
        cancel: &CancellationToken,
    ) -> usize {
        if !self.criteria.admit(&pod) {
            return 0;
        }
        self.dispatcher.dispatch(&Arc::new(pod), tasks, cancel)
    }

    fn set_state(&self, state: WatchState) {
        tracing::debug!(?state, "Watcher state changed");
        *self.state.write() = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use podscribe_types::PodEventKind;
    use serde_json::json;

    use crate::pattern::PatternList;
    use crate::test_support::{FakeSource, RecordingSink, running_pod};

    fn pod_event(name: &str, container: &str, restart_count: i32) -> PodEvent {
        PodEvent::new(
            PodEventKind::Modified,
            json!({
                "kind": "Pod",
                "metadata": { "name": name, "namespace": "default" },
                "spec": { "containers": [{ "name": container }] },
                "status": {
                    "containerStatuses": [{
                        "name": container,
                        "ready": true,
                        "restartCount": restart_count,
                        "image": "img",
                        "imageID": "",
                        "state": { "running": {} }
                    }]
                }
            }),
        )
    }

    fn web_options() -> WatchOptions {
        WatchOptions {
            resource_names: PatternList::new(["web-*"]),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_one_shot_processes_snapshot_only() {
        let sink = Arc::new(RecordingSink::default());
        let watcher = Watcher::new(
            WatchOptions {
                one_shot: true,
                ..web_options()
            },
            Arc::new(FakeSource::with_output("hello\n")),
            sink.clone(),
        );

        let summary = watcher
            .watch(
                vec![running_pod("web-1", "app", 0), running_pod("api-1", "app", 0)],
                None,
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(watcher.state(), WatchState::Finished);
        assert_eq!(summary.spawned, 1);
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.incarnations, 1);

        let collected: Vec<String> = sink.collected().iter().map(ToString::to_string).collect();
        assert_eq!(collected, vec!["default:web-1:app:0"]);
    }

    #[tokio::test]
    async fn test_live_events_spawn_per_restart() {
        let sink = Arc::new(RecordingSink::default());
        let watcher = Watcher::new(
            web_options(),
            Arc::new(FakeSource::with_output("hello\n")),
            sink.clone(),
        );

        let (tx, rx) = mpsc::channel(16);
        tx.send(pod_event("web-1", "app", 0)).await.unwrap();
        tx.send(pod_event("web-1", "app", 0)).await.unwrap();
        tx.send(PodEvent::new(PodEventKind::Bookmark, json!({}))).await.unwrap();
        tx.send(PodEvent::new(PodEventKind::Added, json!({ "metadata": 1 })))
            .await
            .unwrap();
        tx.send(pod_event("api-1", "app", 0)).await.unwrap();
        tx.send(pod_event("web-1", "app", 1)).await.unwrap();
        drop(tx);

        let summary = watcher
            .watch(vec![running_pod("web-1", "app", 0)], Some(rx), &CancellationToken::new())
            .await;

        assert_eq!(summary.spawned, 2);
        assert_eq!(summary.completed, 2);
        assert_eq!(summary.finished(), 2);

        let mut collected: Vec<String> =
            sink.collected().iter().map(ToString::to_string).collect();
        collected.sort();
        assert_eq!(collected, vec!["default:web-1:app:0", "default:web-1:app:1"]);
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_the_watch() {
        let watcher = Watcher::new(
            WatchOptions::default(),
            Arc::new(FakeSource::with_output("x\n").failing("broken")),
            Arc::new(RecordingSink::default()),
        );

        let summary = watcher
            .watch(
                vec![
                    running_pod("web-1", "broken", 0),
                    running_pod("web-2", "app", 0),
                ],
                None,
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(summary.spawned, 2);
        assert_eq!(summary.open_failed, 1);
        assert_eq!(summary.completed, 1);
    }

    #[tokio::test]
    async fn test_cancellation_waits_for_every_task() {
        let (started_tx, mut started_rx) = mpsc::unbounded_channel();
        let watcher = Arc::new(Watcher::new(
            WatchOptions::default(),
            Arc::new(FakeSource::never_ready()),
            Arc::new(RecordingSink::holding(started_tx)),
        ));

        let (tx, rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();

        let handle = {
            let watcher = Arc::clone(&watcher);
            let cancel = cancel.clone();
            tokio::spawn(async move {
                watcher
                    .watch(
                        vec![running_pod("web-1", "app", 0), running_pod("web-2", "app", 0)],
                        Some(rx),
                        &cancel,
                    )
                    .await
            })
        };

        for _ in 0..2 {
            tokio::time::timeout(Duration::from_secs(5), started_rx.recv())
                .await
                .unwrap()
                .unwrap();
        }
        assert_eq!(watcher.state(), WatchState::LiveWatching);

        cancel.cancel();
        let summary = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(summary.spawned, 2);
        assert_eq!(summary.cancelled, 2);
        assert_eq!(summary.finished(), 2);
        drop(tx);
    }
}
