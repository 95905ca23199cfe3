use super::{json_pretty, EXIT_SUCCESS};
use crate::render::colorize_source;
use aptward_catalog::{ErrorCatalog, ErrorCode, ErrorSignature, ErrorSource};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct CatalogEntry {
    number: u16,
    code: ErrorCode,
    source: ErrorSource,
    critical: bool,
    needs_refresh: bool,
    params: usize,
    pattern: &'static str,
    message: String,
}

impl From<&ErrorSignature> for CatalogEntry {
    fn from(sig: &ErrorSignature) -> Self {
        Self {
            number: sig.code.number(),
            code: sig.code,
            source: sig.code.source(),
            critical: sig.code.is_critical(),
            needs_refresh: sig.code.needs_refresh(),
            params: sig.params,
            pattern: sig.pattern,
            message: sig.render(),
        }
    }
}

pub fn run(json: bool) -> Result<u8, String> {
    let entries: Vec<CatalogEntry> = ErrorCatalog::builtin()
        .signatures()
        .map(CatalogEntry::from)
        .collect();

    if json {
        println!("{}", json_pretty(&entries)?);
    } else {
        println!("{:<5} {:<38} {:<12} PATTERN", "NUM", "CODE", "SOURCE");
        for entry in &entries {
            println!(
                "{:<5} {:<38} {:<12} {}",
                entry.number,
                entry.code.to_string(),
                colorize_source(entry.source),
                entry.pattern
            );
        }
    }
    Ok(EXIT_SUCCESS)
}
