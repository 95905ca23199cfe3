//! Diagnostic signature catalog for the package tool.
//!
//! The catalog is an ordered table of message templates. Each template maps a
//! line the tool prints to a stable [`ErrorCode`] plus the parameters captured
//! from the line, and renders back to a (possibly localized) message.

pub mod catalog;
pub mod classified;
pub mod code;
pub mod i18n;
pub mod signature;
pub mod template;

pub use catalog::{ErrorCatalog, BUILTIN_SIGNATURES, HINT_PREFIX, LINE_PREFIXES};
pub use classified::{ClassifiedError, ClassifiedReport};
pub use code::{ErrorCode, ErrorSource};
pub use i18n::Translations;
pub use signature::ErrorSignature;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse translations: {0}")]
    ParseToml(#[from] toml::de::Error),
    #[error("a translation table is already installed")]
    TranslationsInstalled,
}

