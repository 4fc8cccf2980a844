//! Background relays that drain the child's output channels.
//!
//! Each relay owns exactly one readable stream and forwards complete lines,
//! tagged with the stream's label, to a shared [`LineSink`]. A relay runs
//! until end-of-stream and is restartable only by spawning a new instance.
//! No backpressure is applied; a sink slower than the producer queues lines
//! in the relay thread, which is acceptable for a test harness but not for a
//! library primitive.

use crate::runner::HarnessError;
use std::io::{BufRead, BufReader, Read, Write};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

/// Destination for relayed lines. Shared by both relays, so implementations
/// must write each line atomically; partial lines must never interleave.
pub trait LineSink: Send + Sync {
    fn write_line(&self, label: &str, line: &str);
}

/// Echoes labelled lines to the harness's own stdout.
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl LineSink for ConsoleSink {
    fn write_line(&self, label: &str, line: &str) {
        // One formatted write under the stdout lock keeps the line atomic.
        let stdout = std::io::stdout();
        let mut guard = stdout.lock();
        let _ = writeln!(guard, "[{label}] {line}");
    }
}

/// Capture sink used by tests and report assembly.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All captured lines in arrival order, formatted `[LABEL] text`.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|guard| guard.clone()).unwrap_or_default()
    }

    /// Captured lines from one label, with the label tag stripped.
    #[must_use]
    pub fn lines_for(&self, label: &str) -> Vec<String> {
        let tag = format!("[{label}] ");
        self.lines()
            .iter()
            .filter_map(|line| line.strip_prefix(&tag).map(str::to_string))
            .collect()
    }
}

impl LineSink for MemorySink {
    fn write_line(&self, label: &str, line: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(format!("[{label}] {line}"));
        }
    }
}

/// One background reader bound to one output channel and one sink.
pub struct Relay {
    label: &'static str,
    handle: JoinHandle<std::io::Result<u64>>,
}

impl Relay {
    /// Start draining `stream` on a dedicated thread.
    ///
    /// The thread reads one line at a time and forwards each to the sink
    /// until the stream reaches end-of-stream, which happens naturally when
    /// the producing process exits and its pipe closes. End-of-stream is not
    /// an error.
    pub fn spawn<R>(
        stream: R,
        label: &'static str,
        sink: Arc<dyn LineSink>,
    ) -> Result<Self, HarnessError>
    where
        R: Read + Send + 'static,
    {
        let handle = thread::Builder::new()
            .name(format!("relay-{label}"))
            .spawn(move || -> std::io::Result<u64> {
                let reader = BufReader::new(stream);
                let mut forwarded = 0u64;
                for line in reader.lines() {
                    let line = line?;
                    sink.write_line(label, &line);
                    forwarded += 1;
                }
                Ok(forwarded)
            })
            .map_err(|err| HarnessError::io("failed to start relay thread", err))?;
        Ok(Self { label, handle })
    }

    /// The stream label this relay tags lines with.
    #[must_use]
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Wait for the relay to reach end-of-stream. Returns the number of
    /// lines forwarded.
    pub fn join(self) -> Result<u64, HarnessError> {
        let label = self.label;
        match self.handle.join() {
            Ok(Ok(forwarded)) => Ok(forwarded),
            Ok(Err(err)) => Err(HarnessError::io(
                format!("relay {label} failed while reading"),
                err,
            )),
            Err(_) => Err(HarnessError::internal(format!("relay {label} panicked"))),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use std::io::Cursor;

    #[test]
    fn relay_forwards_lines_in_producer_order() {
        let sink = Arc::new(MemorySink::new());
        let stream = Cursor::new(b"alpha\nbeta\ngamma\n".to_vec());
        let relay = Relay::spawn(stream, "STDOUT", Arc::clone(&sink) as Arc<dyn LineSink>).unwrap();
        assert_eq!(relay.join().unwrap(), 3);
        assert_eq!(
            sink.lines_for("STDOUT"),
            vec!["alpha", "beta", "gamma"]
        );
    }

    #[test]
    fn relay_completes_on_empty_stream() {
        let sink = Arc::new(MemorySink::new());
        let stream = Cursor::new(Vec::new());
        let relay = Relay::spawn(stream, "STDERR", Arc::clone(&sink) as Arc<dyn LineSink>).unwrap();
        assert_eq!(relay.join().unwrap(), 0);
        assert!(sink.lines().is_empty());
    }

    #[test]
    fn two_relays_share_one_sink_without_losing_lines() {
        let sink: Arc<MemorySink> = Arc::new(MemorySink::new());
        let out = Relay::spawn(
            Cursor::new(b"one\ntwo\n".to_vec()),
            "STDOUT",
            Arc::clone(&sink) as Arc<dyn LineSink>,
        )
        .unwrap();
        let err = Relay::spawn(
            Cursor::new(b"warn\n".to_vec()),
            "STDERR",
            Arc::clone(&sink) as Arc<dyn LineSink>,
        )
        .unwrap();
        assert_eq!(out.join().unwrap(), 2);
        assert_eq!(err.join().unwrap(), 1);
        assert_eq!(sink.lines_for("STDOUT"), vec!["one", "two"]);
        assert_eq!(sink.lines_for("STDERR"), vec!["warn"]);
    }
}
