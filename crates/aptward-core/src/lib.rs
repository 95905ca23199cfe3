//! Guarded access to the wrapped package tool.
//!
//! Every interaction with the tool goes through [`OperationGuard::execute`],
//! which serializes operations process-wide, refuses to run while another
//! process holds the tool's lock files, lazily initializes the shared tool
//! handle, captures everything the tool prints, and turns the outcome into a
//! classified error where the diagnostic catalog recognizes it.

pub mod config;
pub mod external_lock;
pub mod guard;
pub mod pipeline;
pub mod session;

pub use config::{AptwardConfig, I18nConfig, LockConfig, CONFIG_ENV};
pub use external_lock::{ExternalLock, LockState};
pub use guard::{OperationContext, OperationGuard};
pub use pipeline::{find_critical, resolve};
pub use session::Session;

use aptward_catalog::{CatalogError, ClassifiedError};
use aptward_runtime::RuntimeError;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config {}: {source}", path.display())]
    Config {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),
}

/// Outcome of a failed guarded operation.
#[derive(Debug, Error)]
pub enum OperationError {
    #[error("package tool is locked by another process ({})", .0.display())]
    Locked(PathBuf),
    #[error("{0}")]
    Classified(ClassifiedError),
    #[error("{0}")]
    Init(Arc<RuntimeError>),
    #[error(transparent)]
    Unclassified(BoxError),
}

impl OperationError {
    pub fn classified(&self) -> Option<&ClassifiedError> {
        match self {
            Self::Classified(err) => Some(err),
            _ => None,
        }
    }

    /// Anything but a benign classified outcome is critical.
    pub fn is_critical(&self) -> bool {
        self.classified().is_none_or(ClassifiedError::is_critical)
    }

    pub fn needs_refresh(&self) -> bool {
        self.classified().is_some_and(ClassifiedError::needs_refresh)
    }
}

impl From<ClassifiedError> for OperationError {
    fn from(err: ClassifiedError) -> Self {
        Self::Classified(err)
    }
}
