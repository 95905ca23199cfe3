use crate::RuntimeError;

/// A way of reaching the wrapped package tool.
///
/// `init` produces the process-wide handle; it is called at most once per
/// session and its failure is cached by the caller until an explicit reset.
pub trait ToolBackend: Send + Sync {
    type Handle: Send;

    fn name(&self) -> &str;

    fn init(&self) -> Result<Self::Handle, RuntimeError>;

    /// Release a handle when the session is reset.
    fn close(&self, handle: Self::Handle) {
        drop(handle);
    }
}
