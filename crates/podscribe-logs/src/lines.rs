use std::io;

use futures::AsyncBufReadExt;
use tokio_util::sync::CancellationToken;

use podscribe_watch::LogStream;

/// Reads a log stream line by line until it ends or is cancelled
pub(crate) struct LineReader {
    stream: LogStream,
    buf: Vec<u8>,
}

impl LineReader {
    pub(crate) fn new(stream: LogStream) -> Self {
        Self {
            stream,
            buf: Vec::with_capacity(8 * 1024),
        }
    }

    /// The next line including its newline, or `None` at end of stream or
    /// once `cancel` fires
    pub(crate) async fn next_line(&mut self, cancel: &CancellationToken) -> io::Result<Option<&[u8]>> {
        self.buf.clear();

        let read = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(None),
            read = self.stream.read_until(b'\n', &mut self.buf) => read?,
        };

        if read == 0 {
            return Ok(None);
        }
        Ok(Some(&self.buf))
    }
}

pub(crate) fn trim_newline(bytes: &[u8]) -> &[u8] {
    let mut end = bytes.len();
    while end > 0 && (bytes[end - 1] == b'\n' || bytes[end - 1] == b'\r') {
        end -= 1;
    }
    &bytes[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::io::Cursor;

    #[tokio::test]
    async fn test_reads_lines_in_order() {
        let stream: LogStream = Box::pin(Cursor::new(b"one\r\ntwo\nthree".to_vec()));
        let mut reader = LineReader::new(stream);
        let cancel = CancellationToken::new();

        let mut lines = Vec::new();
        while let Some(line) = reader.next_line(&cancel).await.unwrap() {
            lines.push(String::from_utf8_lossy(trim_newline(line)).into_owned());
        }
        assert_eq!(lines, vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn test_stops_when_cancelled() {
        let stream: LogStream = Box::pin(Cursor::new(b"one\n".to_vec()));
        let mut reader = LineReader::new(stream);
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert!(reader.next_line(&cancel).await.unwrap().is_none());
    }
}
