//! Child output streaming.
//!
//! A reader thread splits the child's output into records and forwards them
//! over a channel; the calling thread owns the parser and the observer, polls
//! the child for exit, and enforces cancellation. The call only returns after
//! the reader has hit end-of-stream and been joined, so no buffered output is
//! lost even when the child exits first.

use crate::observer::ProgressObserver;
use crate::parser::ProgressParser;
use crate::RuntimeError;
use std::io::{self, Read, Write};
use std::process::{Child, ExitStatus};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const READ_CHUNK: usize = 4096;

/// Shared cancellation flag for a running operation.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// The parts of a child process the stream loop drives.
pub trait Supervised {
    fn try_wait(&mut self) -> io::Result<Option<ExitStatus>>;
    fn wait(&mut self) -> io::Result<ExitStatus>;
    fn kill(&mut self) -> io::Result<()>;
}

impl Supervised for Child {
    fn try_wait(&mut self) -> io::Result<Option<ExitStatus>> {
        Child::try_wait(self)
    }

    fn wait(&mut self) -> io::Result<ExitStatus> {
        Child::wait(self)
    }

    fn kill(&mut self) -> io::Result<()> {
        Child::kill(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamOutcome {
    pub status: ExitStatus,
    pub records: usize,
}

fn send_record(tx: &Sender<String>, partial: &mut Vec<u8>) -> bool {
    if partial.is_empty() {
        return true;
    }
    let record = String::from_utf8_lossy(&std::mem::take(partial)).into_owned();
    tx.send(record).is_ok()
}

fn read_records<R: Read>(mut output: R, tx: &Sender<String>) -> io::Result<()> {
    let mut buf = [0u8; READ_CHUNK];
    let mut partial = Vec::new();
    loop {
        let n = match output.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            // A pty master reports EIO once every slave descriptor is closed.
            Err(e) if e.raw_os_error() == Some(libc::EIO) => break,
            Err(e) => return Err(e),
        };
        for &byte in &buf[..n] {
            if byte == b'\n' || byte == b'\r' {
                if !send_record(tx, &mut partial) {
                    return Ok(());
                }
            } else {
                partial.push(byte);
            }
        }
    }
    send_record(tx, &mut partial);
    Ok(())
}

/// Kill `child`, treating an already reaped child as success.
fn kill_child<C: Supervised>(child: &mut C) -> io::Result<()> {
    match child.kill() {
        Err(e) if e.kind() == io::ErrorKind::InvalidInput => Ok(()),
        other => other,
    }
}

fn spawn_reader<R>(output: R) -> io::Result<(Receiver<String>, JoinHandle<io::Result<()>>)>
where
    R: Read + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    let handle = thread::Builder::new()
        .name("aptward-output".to_owned())
        .spawn(move || read_records(output, &tx))?;
    Ok((rx, handle))
}

/// Drive `child` to completion while feeding its output through `parser`.
///
/// Every record is also written as a line to `log`. On cancellation or
/// timeout the child is killed and its remaining output still drained.
/// A non-zero exit is reported as [`RuntimeError::Failed`] after draining.
/// If polling or killing the child fails, the child is killed and the
/// reader joined before that error is returned.
#[allow(clippy::too_many_arguments)]
pub fn stream_child<C, R>(
    child: &mut C,
    output: R,
    parser: &mut ProgressParser,
    observer: &mut dyn ProgressObserver,
    log: &mut dyn Write,
    cancel: &CancelToken,
    timeout: Option<Duration>,
) -> Result<StreamOutcome, RuntimeError>
where
    C: Supervised,
    R: Read + Send + 'static,
{
    let (rx, reader) = spawn_reader(output)?;
    let deadline = timeout.map(|t| Instant::now() + t);
    let mut status: Option<ExitStatus> = None;
    let mut stopped: Option<RuntimeError> = None;
    let mut log_failed = false;
    let mut fault: Option<io::Error> = None;

    loop {
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(record) => {
                if !log_failed {
                    if let Err(e) = writeln!(log, "{record}") {
                        warn!("failed to capture tool output: {e}");
                        log_failed = true;
                    }
                }
                parser.feed(&record, observer);
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        if status.is_some() || fault.is_some() {
            continue;
        }

        match child.try_wait() {
            Ok(Some(exit)) => {
                debug!("child exited with {exit}");
                parser.child_exited();
                status = Some(exit);
                continue;
            }
            Ok(None) => {}
            Err(e) => {
                warn!("failed to poll child: {e}");
                if let Err(kill_err) = kill_child(child) {
                    warn!("failed to kill child: {kill_err}");
                }
                fault = Some(e);
                continue;
            }
        }

        if stopped.is_none() {
            if cancel.is_cancelled() {
                stopped = Some(RuntimeError::Cancelled);
            } else if let (Some(deadline), Some(limit)) = (deadline, timeout) {
                if Instant::now() >= deadline {
                    stopped = Some(RuntimeError::TimedOut(limit));
                }
            }
            if let Some(reason) = &stopped {
                info!("stopping child: {reason}");
                if let Err(e) = kill_child(child) {
                    warn!("failed to kill child: {e}");
                    fault = Some(e);
                }
            }
        }
    }

    let read_result = reader
        .join()
        .map_err(|_| RuntimeError::Failed("output reader panicked".to_owned()))?;
    if let Some(e) = fault {
        if status.is_none() {
            parser.child_exited();
            if let Err(wait_err) = child.wait() {
                warn!("failed to reap child: {wait_err}");
            }
        }
        parser.finish();
        return Err(e.into());
    }
    let status = match status {
        Some(status) => status,
        None => {
            parser.child_exited();
            child.wait()?
        }
    };
    parser.finish();
    debug!("stream finished after {} records", parser.records());

    read_result?;
    if let Some(reason) = stopped {
        return Err(reason);
    }
    if !status.success() {
        return Err(RuntimeError::Failed(format!("child process {status}")));
    }
    Ok(StreamOutcome {
        status,
        records: parser.records(),
    })
}
