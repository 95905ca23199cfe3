use aptward_runtime::{RuntimeError, ToolBackend};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The process-wide tool handle, created on first use.
///
/// A failed initialization is remembered and returned again on every later
/// call until [`Session::reset`], so a broken tool is not re-initialized on
/// each operation.
pub struct Session<H> {
    handle: Option<H>,
    init_error: Option<Arc<RuntimeError>>,
    generation: u64,
}

impl<H> Default for Session<H> {
    fn default() -> Self {
        Self {
            handle: None,
            init_error: None,
            generation: 0,
        }
    }
}

impl<H> Session<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_initialized(&self) -> bool {
        self.handle.is_some()
    }

    pub fn cached_error(&self) -> Option<&RuntimeError> {
        self.init_error.as_deref()
    }

    /// How many times a handle has been successfully created.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn get_or_init<B>(&mut self, backend: &B) -> Result<&mut H, Arc<RuntimeError>>
    where
        B: ToolBackend<Handle = H>,
    {
        if let Some(err) = &self.init_error {
            debug!("reusing cached initialization failure");
            return Err(Arc::clone(err));
        }
        if self.handle.is_none() {
            match backend.init() {
                Ok(handle) => {
                    self.generation += 1;
                    info!(
                        "{} session initialized (generation {})",
                        backend.name(),
                        self.generation
                    );
                    self.handle = Some(handle);
                }
                Err(err) => {
                    warn!("{} session initialization failed: {err}", backend.name());
                    let err = Arc::new(err);
                    self.init_error = Some(Arc::clone(&err));
                    return Err(err);
                }
            }
        }
        self.handle.as_mut().ok_or_else(|| {
            Arc::new(RuntimeError::InitFailed(
                "session handle missing after initialization".to_owned(),
            ))
        })
    }

    /// Drop the handle and any cached failure; the next call initializes anew.
    pub fn reset<B>(&mut self, backend: &B)
    where
        B: ToolBackend<Handle = H>,
    {
        if let Some(handle) = self.handle.take() {
            backend.close(handle);
        }
        if self.init_error.take().is_some() {
            debug!("cleared cached initialization failure");
        }
        info!("{} session reset", backend.name());
    }
}
