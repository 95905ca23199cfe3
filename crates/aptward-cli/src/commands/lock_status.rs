use super::{json_pretty, load_config, EXIT_LOCKED, EXIT_SUCCESS};
use aptward_core::{ExternalLock, LockState};
use console::Style;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize)]
struct LockRow {
    path: PathBuf,
    held: bool,
    #[serde(flatten)]
    state: LockState,
}

pub fn run(config: Option<&Path>, json: bool) -> Result<u8, String> {
    let config = load_config(config)?;
    let rows = collect(&config.external_lock());
    let any_held = rows.iter().any(|r| r.held);

    if json {
        let payload = serde_json::json!({ "locked": any_held, "files": rows });
        println!("{}", json_pretty(&payload)?);
    } else if rows.is_empty() {
        println!("no lock files configured");
    } else {
        println!("{:<10} PATH", "STATE");
        for row in &rows {
            println!("{:<10} {}", describe(&row.state), row.path.display());
        }
    }

    Ok(if any_held { EXIT_LOCKED } else { EXIT_SUCCESS })
}

fn collect(lock: &ExternalLock) -> Vec<LockRow> {
    lock.status()
        .into_iter()
        .map(|(path, state)| LockRow {
            path,
            held: state.is_held(),
            state,
        })
        .collect()
}

fn describe(state: &LockState) -> String {
    match state {
        LockState::Missing => Style::new().dim().apply_to("missing").to_string(),
        LockState::Unreadable { .. } => Style::new().yellow().apply_to("unreadable").to_string(),
        LockState::Free => Style::new().green().apply_to("free").to_string(),
        LockState::RecordLock { pid } => Style::new()
            .red()
            .bold()
            .apply_to(format!("held by {pid}"))
            .to_string(),
        LockState::Flock => Style::new().red().bold().apply_to("held").to_string(),
    }
}
