pub mod catalog;
pub mod classify;
pub mod completions;
pub mod exec;
pub mod lock_status;

use aptward_core::AptwardConfig;
use aptward_runtime::CancelToken;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_LOCKED: u8 = 2;
pub const EXIT_CLASSIFIED: u8 = 3;

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

/// Resolve the config and install its translations, if any.
pub fn load_config(path: Option<&Path>) -> Result<AptwardConfig, String> {
    let config = AptwardConfig::resolve(path).map_err(|e| format!("config error: {e}"))?;
    if config
        .install_translations()
        .map_err(|e| format!("config error: {e}"))?
    {
        debug!("translations installed");
    }
    Ok(config)
}

static CANCEL_REQUESTED: AtomicBool = AtomicBool::new(false);

/// First Ctrl-C cancels `token`; a second one exits immediately.
pub fn install_cancel_handler(token: &CancelToken) {
    let token = token.clone();
    let _ = ctrlc::set_handler(move || {
        if CANCEL_REQUESTED.swap(true, Ordering::SeqCst) {
            std::process::exit(i32::from(EXIT_FAILURE));
        }
        token.cancel();
        eprintln!("\ncancellation requested, stopping the package tool...");
    });
}
