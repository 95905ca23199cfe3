use super::{install_cancel_handler, json_pretty, load_config, EXIT_CLASSIFIED, EXIT_SUCCESS};
use crate::render::{classified_line, JsonLines, ProgressBars};
use aptward_core::{OperationError, OperationGuard};
use aptward_runtime::{
    CancelToken, CommandBackend, OperationKind, ProgressObserver, RunRequest, StreamOutcome,
};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub struct ExecOptions {
    pub kind: OperationKind,
    pub timeout: Option<u64>,
    pub skip_prereqs: bool,
}

pub fn run(
    config: Option<&Path>,
    options: &ExecOptions,
    args: &[String],
    json: bool,
) -> Result<u8, String> {
    let config = load_config(config)?;
    let guard = OperationGuard::from_config(&config, options.skip_prereqs);

    let cancel = CancelToken::new();
    install_cancel_handler(&cancel);
    let mut request = RunRequest::new(args.iter().cloned())
        .kind(options.kind)
        .cancel_with(cancel);
    if let Some(secs) = options.timeout {
        request = request.timeout(Duration::from_secs(secs));
    }

    let result = if json {
        let mut observer = JsonLines::new(std::io::stdout());
        run_guarded(&guard, &request, &mut observer)
    } else {
        let mut bars = ProgressBars::default();
        let result = run_guarded(&guard, &request, &mut bars);
        bars.abandon();
        result
    };
    report(result, json)
}

fn run_guarded(
    guard: &OperationGuard<CommandBackend>,
    request: &RunRequest,
    observer: &mut dyn ProgressObserver,
) -> Result<StreamOutcome, OperationError> {
    guard.execute(|ctx| {
        let mut log = ctx.stdout();
        ctx.handle().run(request, observer, &mut log)
    })
}

fn report(result: Result<StreamOutcome, OperationError>, json: bool) -> Result<u8, String> {
    match result {
        Ok(outcome) => {
            info!("package tool finished: {}", outcome.status);
            if json {
                let payload = serde_json::json!({
                    "status": "ok",
                    "records": outcome.records,
                });
                println!("{}", json_pretty(&payload)?);
            } else {
                println!("✓ package tool finished ({} output lines)", outcome.records);
            }
            Ok(EXIT_SUCCESS)
        }
        Err(OperationError::Locked(path)) => Err(format!(
            "locked: {} is held by another process",
            path.display()
        )),
        Err(OperationError::Classified(err)) => {
            let critical = err.is_critical();
            if json {
                let payload = serde_json::json!({
                    "status": if critical { "failed" } else { "unchanged" },
                    "error": err.report(),
                });
                println!("{}", json_pretty(&payload)?);
            } else if critical {
                eprintln!("error: {}", classified_line(&err));
                if err.needs_refresh() {
                    eprintln!("hint: the package index looks stale; run `aptward exec -- update`");
                }
            } else {
                println!("note: {}", classified_line(&err));
            }
            Ok(if critical { EXIT_CLASSIFIED } else { EXIT_SUCCESS })
        }
        Err(other) => Err(other.to_string()),
    }
}
