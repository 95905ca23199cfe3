//! Per-operation diagnostic capture.
//!
//! A [`LogSink`] lives for exactly one guarded operation. Everything the tool
//! prints while it runs is written into the sink, either as whole lines via
//! [`LogSink::record`] or as raw bytes through a [`SinkWriter`]. Once the
//! sink is closed every further write fails, so a writer leaked out of an
//! operation cannot append to a later one.

use crate::RuntimeError;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::trace;

/// Append-only lines collected during one operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedLog {
    lines: Vec<String>,
}

impl CapturedLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

impl<S: Into<String>> FromIterator<S> for CapturedLog {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            lines: iter.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Default)]
struct SinkState {
    log: CapturedLog,
    closed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct LogSink {
    state: Arc<Mutex<SinkState>>,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SinkState> {
        // Only plain pushes happen under this lock.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append one diagnostic message; embedded newlines split it into lines.
    pub fn record(&self, message: &str) -> Result<(), RuntimeError> {
        let mut state = self.lock();
        if state.closed {
            return Err(RuntimeError::SinkClosed);
        }
        for line in message.split(['\n', '\r']).filter(|l| !l.trim().is_empty()) {
            trace!("captured: {line}");
            state.log.push(line);
        }
        Ok(())
    }

    /// A byte writer feeding this sink, split into lines on `\n` and `\r`.
    pub fn writer(&self) -> SinkWriter {
        SinkWriter {
            sink: self.clone(),
            partial: Vec::new(),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn snapshot(&self) -> CapturedLog {
        self.lock().log.clone()
    }

    /// Stop accepting writes. Captured lines stay available to [`Self::close`].
    pub fn seal(&self) {
        self.lock().closed = true;
    }

    /// Stop accepting writes and hand back what was captured.
    pub fn close(&self) -> CapturedLog {
        let mut state = self.lock();
        state.closed = true;
        std::mem::take(&mut state.log)
    }
}

pub struct SinkWriter {
    sink: LogSink,
    partial: Vec<u8>,
}

impl SinkWriter {
    fn flush_record(&mut self) -> io::Result<()> {
        let bytes = std::mem::take(&mut self.partial);
        let record = String::from_utf8_lossy(&bytes);
        self.sink
            .record(&record)
            .map_err(|e| io::Error::new(io::ErrorKind::BrokenPipe, e))
    }
}

impl io::Write for SinkWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.sink.is_closed() {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                RuntimeError::SinkClosed,
            ));
        }
        for &byte in buf {
            if byte == b'\n' || byte == b'\r' {
                self.flush_record()?;
            } else {
                self.partial.push(byte);
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for SinkWriter {
    fn drop(&mut self) {
        if !self.partial.is_empty() && !self.sink.is_closed() {
            let _ = self.flush_record();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn record_splits_and_skips_blank_lines() {
        let sink = LogSink::new();
        sink.record("E: Broken packages\n\nE: Aborting Install")
            .unwrap();
        assert_eq!(
            sink.snapshot().lines(),
            ["E: Broken packages", "E: Aborting Install"]
        );
    }

    #[test]
    fn writer_splits_on_cr_and_lf() {
        let sink = LogSink::new();
        let mut w = sink.writer();
        w.write_all(b"10% [1 a 1/2KB 50%]\r20% [1 a 2/2KB 100%]\r\nDone.\npartial")
            .unwrap();
        assert_eq!(sink.snapshot().len(), 3);
        drop(w);
        assert_eq!(sink.snapshot().lines().last().unwrap(), "partial");
    }

    #[test]
    fn closed_sink_rejects_writes() {
        let sink = LogSink::new();
        let leaked = sink.clone();
        sink.record("before").unwrap();
        let log = sink.close();
        assert_eq!(log.lines(), ["before"]);
        assert!(matches!(leaked.record("after"), Err(RuntimeError::SinkClosed)));
        let err = leaked.writer().write(b"after\n").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert!(sink.snapshot().is_empty());
    }

    #[test]
    fn sealed_sink_keeps_lines_for_close() {
        let sink = LogSink::new();
        sink.record("kept").unwrap();
        sink.seal();
        assert!(sink.record("dropped").is_err());
        assert_eq!(sink.close().lines(), ["kept"]);
    }

    #[test]
    fn captured_log_collects_from_iter() {
        let log: CapturedLog = ["a", "b"].into_iter().collect();
        assert_eq!(log.into_lines(), vec!["a".to_owned(), "b".to_owned()]);
    }
}
