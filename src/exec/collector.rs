// src/exec/collector.rs

//! Thread-safe capture of a child process's stdout/stderr lines.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Ordered buffer of the lines a process produced on stdout and stderr.
///
/// Lines are appended from reader tasks as they arrive, so stdout and stderr
/// interleave in delivery order. Blank and whitespace-only lines are dropped.
///
/// The reader tasks are the collector's "registration" on the process. They
/// are revoked exactly once, either by [`OutputCollector::close`] or by the
/// exit path via [`OutputCollector::drain`]; after that further lines are
/// ignored and closing again is a no-op.
#[derive(Debug, Default)]
pub struct OutputCollector {
    state: Mutex<CollectorState>,
}

#[derive(Debug, Default)]
struct CollectorState {
    lines: Vec<String>,
    readers: Vec<JoinHandle<()>>,
    closed: bool,
}

impl OutputCollector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Start reader tasks for the given streams.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn attach<O, E>(self: &Arc<Self>, stdout: Option<O>, stderr: Option<E>)
    where
        O: AsyncRead + Unpin + Send + 'static,
        E: AsyncRead + Unpin + Send + 'static,
    {
        let mut handles = Vec::with_capacity(2);
        if let Some(stdout) = stdout {
            handles.push(self.spawn_reader(stdout, "stdout"));
        }
        if let Some(stderr) = stderr {
            handles.push(self.spawn_reader(stderr, "stderr"));
        }

        let mut state = self.state.lock();
        if state.closed {
            drop(state);
            for handle in handles {
                handle.abort();
            }
            return;
        }
        state.readers.extend(handles);
    }

    fn spawn_reader<R>(self: &Arc<Self>, stream: R, source: &'static str) -> JoinHandle<()>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let collector = Arc::clone(self);
        tokio::spawn(async move {
            let mut reader = BufReader::new(stream);
            let mut buf = Vec::new();
            loop {
                buf.clear();
                match reader.read_until(b'\n', &mut buf).await {
                    Ok(0) => break,
                    Ok(_) => {
                        let line = String::from_utf8_lossy(&buf);
                        collector.append(line.trim_end_matches(['\r', '\n']));
                    }
                    Err(e) => {
                        debug!(source, error = %e, "output reader stopped on read error");
                        break;
                    }
                }
            }
            trace!(source, "output reader reached end of stream");
        })
    }

    /// Add one line. Blank lines and lines arriving after close are ignored.
    pub fn append(&self, line: &str) {
        if line.trim().is_empty() {
            return;
        }
        let mut state = self.state.lock();
        if !state.closed {
            state.lines.push(line.to_string());
        }
    }

    /// Copy of the lines captured so far.
    pub fn snapshot(&self) -> Vec<String> {
        self.state.lock().lines.clone()
    }

    pub fn len(&self) -> usize {
        self.state.lock().lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Detach from the process. Returns `true` only for the call that
    /// actually closed the collector.
    pub fn close(&self) -> bool {
        let readers = {
            let mut state = self.state.lock();
            if state.closed {
                return false;
            }
            state.closed = true;
            std::mem::take(&mut state.readers)
        };

        for reader in readers {
            reader.abort();
        }
        true
    }

    /// Give the readers up to `grace` to reach end-of-stream, then close.
    ///
    /// Used once the process has exited, so trailing output still sitting in
    /// the pipes makes it into the buffer.
    pub async fn drain(&self, grace: Duration) {
        let mut readers = std::mem::take(&mut self.state.lock().readers);

        let finished = tokio::time::timeout(grace, async {
            for reader in readers.iter_mut() {
                let _ = reader.await;
            }
        })
        .await;

        if finished.is_err() {
            debug!(?grace, "output readers still busy after grace period; detaching");
            for reader in &readers {
                reader.abort();
            }
        }

        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_lines_are_skipped() {
        let collector = OutputCollector::new();
        collector.append("first");
        collector.append("");
        collector.append("   \t");
        collector.append("second");
        assert_eq!(collector.snapshot(), vec!["first", "second"]);
    }

    #[test]
    fn close_is_idempotent_and_stops_appends() {
        let collector = OutputCollector::new();
        collector.append("kept");
        assert!(collector.close());
        assert!(!collector.close());
        collector.append("dropped");
        assert_eq!(collector.snapshot(), vec!["kept"]);
        assert!(collector.is_closed());
    }

    #[tokio::test]
    async fn attached_streams_are_captured_in_order() {
        let collector = OutputCollector::new();
        let stdout: &[u8] = b"one\n\ntwo\r\nthree";
        collector.attach(Some(stdout), None::<&[u8]>);
        collector.drain(Duration::from_secs(1)).await;

        assert_eq!(collector.snapshot(), vec!["one", "two", "three"]);
        assert!(collector.is_closed());
    }

    #[tokio::test]
    async fn invalid_utf8_is_replaced_not_dropped() {
        let collector = OutputCollector::new();
        let stderr: &[u8] = b"bad \xff byte\n";
        collector.attach(None::<&[u8]>, Some(stderr));
        collector.drain(Duration::from_secs(1)).await;

        let lines = collector.snapshot();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("bad "));
    }

    #[tokio::test]
    async fn attach_after_close_captures_nothing() {
        let collector = OutputCollector::new();
        collector.close();
        let stdout: &[u8] = b"late\n";
        collector.attach(Some(stdout), None::<&[u8]>);
        tokio::task::yield_now().await;
        assert!(collector.is_empty());
    }
}
