use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use podscribe_watch::{LogSink, LogStream, LogTarget};

use crate::lines::LineReader;

/// Appends each incarnation's raw output to
/// `<root>/<namespace>/<pod>/<container>.<restart_count>.log`
#[derive(Clone, Debug)]
pub struct DirectorySink {
    root: PathBuf,
}

impl DirectorySink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File the logs of `target` are written to
    pub fn path_for(&self, target: &LogTarget) -> PathBuf {
        self.root
            .join(&target.pod.namespace)
            .join(&target.pod.name)
            .join(format!("{}.{}.log", target.container, target.restart_count))
    }
}

#[async_trait]
impl LogSink for DirectorySink {
    async fn collect(
        &self,
        target: &LogTarget,
        stream: LogStream,
        cancel: &CancellationToken,
    ) -> anyhow::Result<()> {
        let path = self.path_for(target);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .with_context(|| format!("Failed to open {}", path.display()))?;
        tracing::debug!(path = %path.display(), "Writing logs to file");

        let mut lines = LineReader::new(stream);
        while let Some(line) = lines.next_line(cancel).await? {
            file.write_all(line)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
        file.flush().await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{stream, target};

    #[tokio::test]
    async fn test_writes_one_file_per_incarnation() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(dir.path());
        let cancel = CancellationToken::new();

        let first = target("web-1", "app", 0);
        let second = target("web-1", "app", 1);
        sink.collect(&first, stream("a\nb\n"), &cancel).await.unwrap();
        sink.collect(&second, stream("c"), &cancel).await.unwrap();

        let first_path = dir.path().join("default/web-1/app.0.log");
        assert_eq!(sink.path_for(&first), first_path);
        assert_eq!(std::fs::read_to_string(first_path).unwrap(), "a\nb\n");
        assert_eq!(
            std::fs::read_to_string(dir.path().join("default/web-1/app.1.log")).unwrap(),
            "c"
        );
    }

    #[tokio::test]
    async fn test_appends_to_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(dir.path());
        let cancel = CancellationToken::new();
        let target = target("web-1", "app", 0);

        sink.collect(&target, stream("one\n"), &cancel).await.unwrap();
        sink.collect(&target, stream("two\n"), &cancel).await.unwrap();

        assert_eq!(
            std::fs::read_to_string(sink.path_for(&target)).unwrap(),
            "one\ntwo\n"
        );
    }
}
