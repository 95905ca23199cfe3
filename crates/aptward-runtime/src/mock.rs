use crate::backend::ToolBackend;
use crate::command::RunRequest;
use crate::observer::ProgressObserver;
use crate::parser::ProgressParser;
use crate::stream::StreamOutcome;
use crate::RuntimeError;
use std::io::Write;
use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// In-process stand-in for the tool.
///
/// Each run replays a fixed output script through the progress parser and
/// into the log, then exits with the configured code.
#[derive(Default)]
pub struct MockBackend {
    inits: AtomicUsize,
    init_failure: Mutex<Option<String>>,
    script: Vec<String>,
    exit_code: i32,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_output<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.script = lines.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_exit_code(mut self, code: i32) -> Self {
        self.exit_code = code;
        self
    }

    /// Make every `init` fail with `message` until cleared.
    pub fn fail_init(&self, message: Option<&str>) -> Result<(), RuntimeError> {
        let mut failure = self
            .init_failure
            .lock()
            .map_err(|e| RuntimeError::InitFailed(format!("mutex poisoned: {e}")))?;
        *failure = message.map(str::to_owned);
        Ok(())
    }

    pub fn init_count(&self) -> usize {
        self.inits.load(Ordering::SeqCst)
    }
}

impl ToolBackend for MockBackend {
    type Handle = MockHandle;

    fn name(&self) -> &'static str {
        "mock"
    }

    fn init(&self) -> Result<MockHandle, RuntimeError> {
        let id = self.inits.fetch_add(1, Ordering::SeqCst) + 1;
        let failure = self
            .init_failure
            .lock()
            .map_err(|e| RuntimeError::InitFailed(format!("mutex poisoned: {e}")))?
            .clone();
        if let Some(message) = failure {
            return Err(RuntimeError::InitFailed(message));
        }
        Ok(MockHandle {
            id,
            script: self.script.clone(),
            exit_code: self.exit_code,
            runs: 0,
        })
    }
}

#[derive(Debug)]
pub struct MockHandle {
    id: usize,
    script: Vec<String>,
    exit_code: i32,
    runs: usize,
}

impl MockHandle {
    /// Which `init` call produced this handle, starting at 1.
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn runs(&self) -> usize {
        self.runs
    }

    pub fn run(
        &mut self,
        request: &RunRequest,
        observer: &mut dyn ProgressObserver,
        log: &mut dyn Write,
    ) -> Result<StreamOutcome, RuntimeError> {
        self.runs += 1;
        let mut parser = ProgressParser::new(request.kind);
        for line in &self.script {
            if request.cancel.is_cancelled() {
                parser.finish();
                return Err(RuntimeError::Cancelled);
            }
            writeln!(log, "{line}")?;
            parser.feed(line, observer);
        }
        parser.child_exited();
        parser.finish();

        // Wait statuses carry the exit code in the second byte.
        let status = ExitStatus::from_raw(self.exit_code << 8);
        if !status.success() {
            return Err(RuntimeError::Failed(format!("child process {status}")));
        }
        Ok(StreamOutcome {
            status,
            records: parser.records(),
        })
    }
}
