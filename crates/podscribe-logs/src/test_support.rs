use std::io::{self, Write};
use std::sync::Arc;

use futures::io::Cursor;
use parking_lot::Mutex;

use podscribe_types::{ContainerState, ContainerStatusInfo, PodInfo};
use podscribe_watch::{LogStream, LogTarget};

pub fn target(pod: &str, container: &str, restart_count: i32) -> LogTarget {
    let pod = PodInfo::new(pod, "default").with_container(ContainerStatusInfo::new(
        container,
        ContainerState::Running,
        restart_count,
    ));
    LogTarget {
        pod: Arc::new(pod),
        container: container.to_string(),
        restart_count,
    }
}

pub fn stream(output: &str) -> LogStream {
    Box::pin(Cursor::new(output.as_bytes().to_vec()))
}

/// A cloneable in-memory writer
#[derive(Clone, Default)]
pub struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
