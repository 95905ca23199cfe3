//! Turning an operation's captured output and returned error into one result.

use crate::{BoxError, OperationError};
use aptward_catalog::{ClassifiedError, ErrorCatalog};
use aptward_runtime::{CapturedLog, RuntimeError};
use std::sync::Arc;
use tracing::debug;

/// Resolve an operation outcome.
///
/// The first critical diagnostic recognized in `log` wins, even over a
/// successful return. Benign lines are ignored. Otherwise a returned error
/// is replaced by its classification only when that is critical, and passed
/// through unchanged in every other case.
pub fn resolve<T, E>(
    catalog: &ErrorCatalog,
    log: &CapturedLog,
    result: Result<T, E>,
) -> Result<T, OperationError>
where
    E: Into<BoxError>,
{
    let critical = catalog
        .match_all(log.lines())
        .into_iter()
        .find(ClassifiedError::is_critical);
    if let Some(found) = critical {
        debug!("classified from log: {} ({})", found.code(), found.code().number());
        return Err(OperationError::Classified(found));
    }

    let err: BoxError = match result {
        Ok(value) => return Ok(value),
        Err(err) => err.into(),
    };
    match catalog.classify(err.to_string().trim()) {
        Some(found) if found.is_critical() => {
            debug!("classified returned error: {}", found.code());
            Err(OperationError::Classified(found))
        }
        _ => Err(OperationError::Unclassified(err)),
    }
}

/// Classify a session initialization failure, keeping it as-is if unknown.
pub fn init_failure(catalog: &ErrorCatalog, err: Arc<RuntimeError>) -> OperationError {
    match catalog.classify(&err.to_string()) {
        Some(found) => OperationError::Classified(found),
        None => OperationError::Init(err),
    }
}

/// First error that is unclassified or classified as critical.
pub fn find_critical<I>(errors: I) -> Option<OperationError>
where
    I: IntoIterator<Item = OperationError>,
{
    errors.into_iter().find(OperationError::is_critical)
}
