mod commands;
mod render;

use aptward_runtime::OperationKind;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::{EXIT_FAILURE, EXIT_LOCKED};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "aptward",
    version,
    about = "Single-flight guard and diagnostic classifier for apt-get"
)]
struct Cli {
    /// Config file (default: $APTWARD_CONFIG, then ~/.config/aptward/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Classify package tool output read from a file or stdin.
    Classify {
        /// File to read; stdin if omitted.
        file: Option<PathBuf>,
        /// Report every recognized line instead of the first one.
        #[arg(long, default_value_t = false)]
        all: bool,
    },
    /// Run the package tool through the operation guard.
    Exec {
        /// Operation kind used to label install progress.
        #[arg(long, default_value_t = OperationKind::Install)]
        kind: OperationKind,
        /// Kill the tool after this many seconds.
        #[arg(long)]
        timeout: Option<u64>,
        /// Arguments passed to the tool (after --).
        #[arg(required = true, last = true)]
        args: Vec<String>,
    },
    /// Show which tool lock files are held by other processes.
    LockStatus,
    /// List the registered diagnostic signatures.
    Catalog,
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("APTWARD_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let json_output = cli.json;
    let config_path = cli.config.as_deref();
    let skip_prereqs = std::env::var("APTWARD_SKIP_PREREQS").as_deref() == Ok("1");

    let result = match cli.command {
        Commands::Classify { file, all } => {
            commands::classify::run(config_path, file.as_deref(), all, json_output)
        }
        Commands::Exec {
            kind,
            timeout,
            args,
        } => commands::exec::run(
            config_path,
            &commands::exec::ExecOptions {
                kind,
                timeout,
                skip_prereqs,
            },
            &args,
            json_output,
        ),
        Commands::LockStatus => commands::lock_status::run(config_path, json_output),
        Commands::Catalog => commands::catalog::run(json_output),
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            let code = if msg.starts_with("locked:") {
                EXIT_LOCKED
            } else {
                EXIT_FAILURE
            };
            ExitCode::from(code)
        }
    }
}
