use std::io::{self, Write};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use podscribe_watch::{LogSink, LogStream, LogTarget};

use crate::lines::{LineReader, trim_newline};

/// Writes every line as `[namespace/pod/container] line`
pub struct TextSink<W> {
    out: Mutex<W>,
}

impl TextSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> TextSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }
}

#[async_trait]
impl<W: Write + Send + 'static> LogSink for TextSink<W> {
    async fn collect(
        &self,
        target: &LogTarget,
        stream: LogStream,
        cancel: &CancellationToken,
    ) -> anyhow::Result<()> {
        let prefix = format!(
            "[{}/{}/{}]",
            target.pod.namespace, target.pod.name, target.container
        );

        let mut lines = LineReader::new(stream);
        while let Some(line) = lines.next_line(cancel).await? {
            let text = String::from_utf8_lossy(trim_newline(line));

            // one lock per line keeps lines of different containers whole
            let mut out = self.out.lock();
            writeln!(out, "{prefix} {text}")?;
            out.flush()?;
        }

        Ok(())
    }
}
