//! In-memory collaborators for tests

use std::collections::HashSet;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::io::{AsyncRead, AsyncReadExt, BufReader, Cursor};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use podscribe_types::{ContainerState, ContainerStatusInfo, IncarnationId, PodInfo};

use crate::source::{LogRequest, LogSink, LogSource, LogStream, LogTarget};

pub fn running_pod(name: &str, container: &str, restart_count: i32) -> PodInfo {
    PodInfo::new(name, "default").with_container(ContainerStatusInfo::new(
        container,
        ContainerState::Running,
        restart_count,
    ))
}

/// A reader that never yields any bytes
struct NeverReady;

impl AsyncRead for NeverReady {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut [u8],
    ) -> Poll<io::Result<usize>> {
        Poll::Pending
    }
}

pub struct FakeSource {
    output: String,
    failing: HashSet<String>,
    never_ready: bool,
    requests: Arc<Mutex<Vec<LogRequest>>>,
}

impl FakeSource {
    pub fn with_output(output: &str) -> Self {
        Self {
            output: output.to_string(),
            failing: HashSet::new(),
            never_ready: false,
            requests: Arc::default(),
        }
    }

    /// Streams that stay open without producing output
    pub fn never_ready() -> Self {
        Self {
            never_ready: true,
            ..Self::with_output("")
        }
    }

    /// Fail to open streams for `container`
    pub fn failing(mut self, container: &str) -> Self {
        self.failing.insert(container.to_string());
        self
    }

    pub fn requests(&self) -> Arc<Mutex<Vec<LogRequest>>> {
        Arc::clone(&self.requests)
    }
}

#[async_trait]
impl LogSource for FakeSource {
    async fn open(&self, request: &LogRequest) -> anyhow::Result<LogStream> {
        self.requests.lock().push(request.clone());

        if self.failing.contains(&request.container) {
            anyhow::bail!("container {} not found", request.container);
        }
        if self.never_ready {
            return Ok(Box::pin(BufReader::new(NeverReady)));
        }
        Ok(Box::pin(Cursor::new(self.output.clone().into_bytes())))
    }
}

#[derive(Default)]
pub struct RecordingSink {
    collected: Mutex<Vec<(IncarnationId, String)>>,
    fail: bool,
    started: Option<mpsc::UnboundedSender<IncarnationId>>,
}

impl RecordingSink {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    /// Announce each stream on `started`, then hold it until cancelled
    pub fn holding(started: mpsc::UnboundedSender<IncarnationId>) -> Self {
        Self {
            started: Some(started),
            ..Default::default()
        }
    }

    pub fn collected(&self) -> Vec<IncarnationId> {
        self.collected.lock().iter().map(|(id, _)| id.clone()).collect()
    }

    pub fn output(&self, id: &IncarnationId) -> Option<String> {
        self.collected
            .lock()
            .iter()
            .find(|(seen, _)| seen == id)
            .map(|(_, output)| output.clone())
    }
}

#[async_trait]
impl LogSink for RecordingSink {
    async fn collect(
        &self,
        target: &LogTarget,
        mut stream: LogStream,
        cancel: &CancellationToken,
    ) -> anyhow::Result<()> {
        if let Some(started) = &self.started {
            let _ = started.send(target.id());
            cancel.cancelled().await;
            return Ok(());
        }

        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).await?;
        self.collected
            .lock()
            .push((target.id(), String::from_utf8_lossy(&buf).into_owned()));

        if self.fail {
            anyhow::bail!("sink closed");
        }
        Ok(())
    }
}
