use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use podscribe_types::IncarnationId;

use crate::source::{LogRequest, LogSink, LogSource, LogTarget};

/// How a collection task ended
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CollectionOutcome {
    /// The stream was exhausted
    Completed,

    /// The log stream could not be opened
    OpenFailed(String),

    /// The sink gave up on the stream
    SinkFailed(String),

    /// The governing token was cancelled
    Cancelled,
}

/// Final report of one collection task
#[derive(Clone, Debug)]
pub struct CollectionReport {
    pub id: IncarnationId,
    pub outcome: CollectionOutcome,
}

/// Streams the logs of a single container incarnation into the sink
pub struct CollectionTask {
    target: LogTarget,
    request: LogRequest,
    source: Arc<dyn LogSource>,
    sink: Arc<dyn LogSink>,
    cancel: CancellationToken,
}

impl CollectionTask {
    pub fn new(
        target: LogTarget,
        request: LogRequest,
        source: Arc<dyn LogSource>,
        sink: Arc<dyn LogSink>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            target,
            request,
            source,
            sink,
            cancel,
        }
    }

    /// Run until the stream ends, fails or is cancelled. Never retries.
    pub async fn run(self) -> CollectionReport {
        tracing::info!("Starting to collect logs");

        let outcome = self.collect().await;
        match &outcome {
            CollectionOutcome::Completed => tracing::info!("Logs have finished"),
            CollectionOutcome::Cancelled => tracing::info!("Log collection cancelled"),
            CollectionOutcome::OpenFailed(error) => {
                tracing::error!(error = %error, "Failed to stream logs")
            }
            CollectionOutcome::SinkFailed(error) => {
                tracing::error!(error = %error, "Failed to collect logs")
            }
        }

        CollectionReport {
            id: self.target.id(),
            outcome,
        }
    }

    async fn collect(&self) -> CollectionOutcome {
        let stream = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return CollectionOutcome::Cancelled,
            result = self.source.open(&self.request) => match result {
                Ok(stream) => stream,
                Err(e) => return CollectionOutcome::OpenFailed(format!("{e:#}")),
            },
        };

        // Dropping the sink future on cancellation drops the stream with it.
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => CollectionOutcome::Cancelled,
            result = self.sink.collect(&self.target, stream, &self.cancel) => match result {
                Ok(()) => CollectionOutcome::Completed,
                Err(e) => CollectionOutcome::SinkFailed(format!("{e:#}")),
            },
        }
    }
}
