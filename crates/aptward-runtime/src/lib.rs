//! Execution layer for the wrapped package tool.
//!
//! This crate defines the pluggable `ToolBackend` trait with a command backend
//! (the real tool run through a pseudo-terminal) and a mock backend, the
//! per-operation log sink, and the progress stream parser that turns the
//! tool's live output into progress notifications.

pub mod backend;
pub mod capture;
pub mod command;
pub mod mock;
pub mod observer;
pub mod parser;
pub mod prereq;
pub mod pty;
pub mod stream;

pub use backend::ToolBackend;
pub use capture::{CapturedLog, LogSink, SinkWriter};
pub use command::{CommandBackend, CommandHandle, RunRequest, ToolCommand};
pub use mock::{MockBackend, MockHandle};
pub use observer::{Phase, ProgressNotification, ProgressObserver, RecordingObserver};
pub use parser::{OperationKind, ParserState, ProgressParser, COMPLETION_MARKER};
pub use prereq::{check_tool_prereqs, format_missing, MissingPrereq};
pub use stream::{stream_child, CancelToken, StreamOutcome, Supervised};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("runtime I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("package tool is not available: {0}")]
    ToolUnavailable(String),
    #[error("{0}")]
    InitFailed(String),
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("{0}")]
    Failed(String),
    #[error("operation cancelled")]
    Cancelled,
    #[error("operation timed out after {0:?}")]
    TimedOut(std::time::Duration),
    #[error("log sink is closed")]
    SinkClosed,
}
