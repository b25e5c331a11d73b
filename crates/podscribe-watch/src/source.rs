//! Collaborator interfaces: where log bytes come from and where they go

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::io::AsyncBufRead;
use tokio_util::sync::CancellationToken;

use podscribe_types::{IncarnationId, PodInfo};

/// A readable log byte stream, released when dropped
pub type LogStream = Pin<Box<dyn AsyncBufRead + Send>>;

/// Parameters for opening one container's log stream
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogRequest {
    pub namespace: String,
    pub pod: String,
    pub container: String,

    /// Keep the stream open for new output
    pub follow: bool,

    pub timestamps: bool,
    pub tail_lines: Option<i64>,
    pub since_seconds: Option<i64>,
}

/// Opens log streams for containers
#[async_trait]
pub trait LogSource: Send + Sync {
    async fn open(&self, request: &LogRequest) -> anyhow::Result<LogStream>;
}

/// The container incarnation a stream belongs to
#[derive(Clone, Debug)]
pub struct LogTarget {
    pub pod: Arc<PodInfo>,
    pub container: String,
    pub restart_count: i32,
}

impl LogTarget {
    pub fn id(&self) -> IncarnationId {
        IncarnationId::new(&self.pod, &self.container, self.restart_count)
    }
}

/// Consumes log streams.
///
/// `collect` runs inside the collection task's tracing span, so events it
/// emits carry the namespace, pod, container and restart count.
#[async_trait]
pub trait LogSink: Send + Sync {
    async fn collect(
        &self,
        target: &LogTarget,
        stream: LogStream,
        cancel: &CancellationToken,
    ) -> anyhow::Result<()>;
}
