use std::io::{self, Write};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use podscribe_watch::{LogSink, LogStream, LogTarget};

use crate::lines::{LineReader, trim_newline};
use crate::parser::{LogLevel, LogParser};

#[derive(Serialize)]
struct Record<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    ts: Option<DateTime<Utc>>,
    namespace: &'a str,
    pod: &'a str,
    container: &'a str,
    restart_count: i32,
    level: LogLevel,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<&'a Map<String, Value>>,
}

/// Writes one JSON object per log line (NDJSON)
pub struct JsonSink<W> {
    out: Mutex<W>,
}

impl JsonSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> JsonSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }
}

#[async_trait]
impl<W: Write + Send + 'static> LogSink for JsonSink<W> {
    async fn collect(
        &self,
        target: &LogTarget,
        stream: LogStream,
        cancel: &CancellationToken,
    ) -> anyhow::Result<()> {
        let mut lines = LineReader::new(stream);
        while let Some(line) = lines.next_line(cancel).await? {
            let text = String::from_utf8_lossy(trim_newline(line));
            if text.is_empty() {
                continue;
            }

            let parsed = LogParser::parse(&text);
            let record = Record {
                ts: parsed.timestamp,
                namespace: &target.pod.namespace,
                pod: &target.pod.name,
                container: &target.container,
                restart_count: target.restart_count,
                level: parsed.level,
                message: parsed.message(),
                fields: parsed.fields.as_ref(),
            };

            let mut out = self.out.lock();
            serde_json::to_writer(&mut *out, &record)?;
            out.write_all(b"\n")?;
            out.flush()?;
        }

        Ok(())
    }
}
