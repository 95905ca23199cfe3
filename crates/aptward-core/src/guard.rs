use crate::config::AptwardConfig;
use crate::external_lock::ExternalLock;
use crate::pipeline;
use crate::session::Session;
use crate::{BoxError, OperationError};
use aptward_catalog::ErrorCatalog;
use aptward_runtime::{CommandBackend, LogSink, RuntimeError, SinkWriter, ToolBackend};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Serializes every interaction with the wrapped tool.
///
/// Operations run one at a time, process-wide. Each one gets the shared
/// tool handle and a fresh log sink; whatever the tool printed is then
/// matched against the catalog before the result is returned.
pub struct OperationGuard<B: ToolBackend> {
    backend: B,
    session: Mutex<Session<B::Handle>>,
    external: ExternalLock,
    catalog: &'static ErrorCatalog,
    busy: Busy,
}

/// What an operation body gets to work with.
pub struct OperationContext<'a, H> {
    handle: &'a mut H,
    sink: &'a LogSink,
}

impl<H> OperationContext<'_, H> {
    pub fn handle(&mut self) -> &mut H {
        self.handle
    }

    pub fn log(&self) -> &LogSink {
        self.sink
    }

    /// Record one diagnostic message directly.
    pub fn record(&self, message: &str) -> Result<(), RuntimeError> {
        self.sink.record(message)
    }

    pub fn stdout(&self) -> SinkWriter {
        self.sink.writer()
    }

    pub fn stderr(&self) -> SinkWriter {
        self.sink.writer()
    }
}

impl<B: ToolBackend> OperationGuard<B> {
    /// Guard `backend`, checking the default apt lock files.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            session: Mutex::new(Session::new()),
            external: ExternalLock::default(),
            catalog: ErrorCatalog::builtin(),
            busy: Busy::default(),
        }
    }

    #[must_use]
    pub fn with_external_lock(mut self, external: ExternalLock) -> Self {
        self.external = external;
        self
    }

    #[must_use]
    pub fn with_catalog(mut self, catalog: &'static ErrorCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn catalog(&self) -> &ErrorCatalog {
        self.catalog
    }

    pub fn external_lock(&self) -> &ExternalLock {
        &self.external
    }

    /// Run `body` as one guarded operation.
    ///
    /// Blocks until no other operation is running. Fails with
    /// [`OperationError::Locked`] without touching the session if another
    /// process holds a tool lock file. The sink handed to `body` is closed
    /// before the operation lock is released, on every exit path.
    pub fn execute<T, E, F>(&self, body: F) -> Result<T, OperationError>
    where
        F: FnOnce(&mut OperationContext<'_, B::Handle>) -> Result<T, E>,
        E: Into<BoxError>,
    {
        let _busy = self.busy.enter();
        let mut session = self.lock_session();
        debug!("operation lock acquired");

        if let Some(path) = self.external.held_by() {
            info!("{} is locked by another process", path.display());
            return Err(OperationError::Locked(path));
        }

        let handle = match session.get_or_init(&self.backend) {
            Ok(handle) => handle,
            Err(err) => return Err(pipeline::init_failure(self.catalog, err)),
        };

        let sink = LogSink::new();
        let (result, log) = {
            let _seal = SealOnDrop(&sink);
            let mut context = OperationContext {
                handle,
                sink: &sink,
            };
            let result = body(&mut context);
            (result, sink.close())
        };
        debug!("log sink closed with {} lines", log.len());

        drop(session);
        debug!("operation lock released");
        pipeline::resolve(self.catalog, &log, result)
    }

    /// Drop the session handle and any cached initialization failure.
    pub fn reset(&self) {
        let _busy = self.busy.enter();
        self.lock_session().reset(&self.backend);
    }

    /// Whether an operation is running or waiting to run.
    pub fn is_busy(&self) -> bool {
        self.busy.is_busy()
    }

    /// Block until no operation is running or waiting. Returns `false` if
    /// `timeout` elapsed first.
    pub fn wait_idle(&self, timeout: Option<Duration>) -> bool {
        self.busy.wait_idle(timeout)
    }

    fn lock_session(&self) -> MutexGuard<'_, Session<B::Handle>> {
        self.session.lock().unwrap_or_else(|poisoned| {
            warn!("a previous operation panicked; recovering the session");
            self.session.clear_poison();
            poisoned.into_inner()
        })
    }
}

impl OperationGuard<CommandBackend> {
    pub fn from_config(config: &AptwardConfig, skip_prereqs: bool) -> Self {
        let mut backend = CommandBackend::new(config.tool.clone());
        if skip_prereqs {
            backend = backend.skip_prereqs();
        }
        Self::new(backend).with_external_lock(config.external_lock())
    }
}

struct SealOnDrop<'a>(&'a LogSink);

impl Drop for SealOnDrop<'_> {
    fn drop(&mut self) {
        self.0.seal();
    }
}

/// Number of operations running or queued.
#[derive(Default)]
struct Busy {
    count: Mutex<usize>,
    idle: Condvar,
}

struct BusyToken<'a>(&'a Busy);

impl Busy {
    fn count(&self) -> MutexGuard<'_, usize> {
        self.count.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enter(&self) -> BusyToken<'_> {
        *self.count() += 1;
        BusyToken(self)
    }

    fn is_busy(&self) -> bool {
        *self.count() > 0
    }

    fn wait_idle(&self, timeout: Option<Duration>) -> bool {
        let count = self.count();
        match timeout {
            None => {
                let _count = self
                    .idle
                    .wait_while(count, |n| *n > 0)
                    .unwrap_or_else(PoisonError::into_inner);
                true
            }
            Some(timeout) => {
                let (count, _) = self
                    .idle
                    .wait_timeout_while(count, timeout, |n| *n > 0)
                    .unwrap_or_else(PoisonError::into_inner);
                *count == 0
            }
        }
    }
}

impl Drop for BusyToken<'_> {
    fn drop(&mut self) {
        let mut count = self.0.count();
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.0.idle.notify_all();
        }
    }
}
