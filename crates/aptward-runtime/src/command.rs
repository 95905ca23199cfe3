use crate::backend::ToolBackend;
use crate::observer::ProgressObserver;
use crate::parser::{OperationKind, ProgressParser};
use crate::prereq::{check_tool_prereqs, format_missing};
use crate::pty::Pty;
use crate::stream::{stream_child, CancelToken, StreamOutcome};
use crate::RuntimeError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::process::Command;
use std::time::Duration;
use tracing::{debug, info};

/// How to launch the wrapped tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ToolCommand {
    pub program: String,
    /// Words placed before the program, e.g. `["sudo"]`.
    pub command_prefix: Vec<String>,
    /// Value of `LC_ALL` for the child. Diagnostics are matched in English.
    pub locale: String,
    /// Passed as `-o Key=Value` before the caller's arguments.
    pub options: BTreeMap<String, String>,
}

impl Default for ToolCommand {
    fn default() -> Self {
        let options = [
            ("Acquire::Retries", "1"),
            ("Acquire::http::Timeout", "20"),
            ("Acquire::https::Timeout", "20"),
            ("Acquire::ftp::Timeout", "20"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .collect();
        Self {
            program: "apt-get".to_owned(),
            command_prefix: Vec::new(),
            locale: "C".to_owned(),
            options,
        }
    }
}

impl ToolCommand {
    /// Full argument vector, program first.
    pub fn argv(&self, args: &[String]) -> Vec<String> {
        let mut argv = self.command_prefix.clone();
        argv.push(self.program.clone());
        for (key, value) in &self.options {
            argv.push("-o".to_owned());
            argv.push(format!("{key}={value}"));
        }
        argv.extend(args.iter().cloned());
        argv
    }
}

/// One invocation of the tool.
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    pub args: Vec<String>,
    pub kind: OperationKind,
    pub cancel: CancelToken,
    pub timeout: Option<Duration>,
}

impl RunRequest {
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn kind(mut self, kind: OperationKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub fn cancel_with(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Runs the real tool as a child process attached to a pseudo-terminal.
pub struct CommandBackend {
    command: ToolCommand,
    check_prereqs: bool,
}

impl CommandBackend {
    pub fn new(command: ToolCommand) -> Self {
        Self {
            command,
            check_prereqs: true,
        }
    }

    #[must_use]
    pub fn skip_prereqs(mut self) -> Self {
        self.check_prereqs = false;
        self
    }

    pub fn command(&self) -> &ToolCommand {
        &self.command
    }
}

impl ToolBackend for CommandBackend {
    type Handle = CommandHandle;

    fn name(&self) -> &'static str {
        "command"
    }

    fn init(&self) -> Result<CommandHandle, RuntimeError> {
        if self.check_prereqs {
            let missing = check_tool_prereqs(&self.command.program, &self.command.command_prefix);
            if !missing.is_empty() {
                return Err(RuntimeError::ToolUnavailable(format_missing(&missing)));
            }
        }
        debug!("command backend ready: {}", self.command.program);
        Ok(CommandHandle {
            command: self.command.clone(),
            runs: 0,
        })
    }
}

pub struct CommandHandle {
    command: ToolCommand,
    runs: u64,
}

impl CommandHandle {
    pub fn runs(&self) -> u64 {
        self.runs
    }

    /// Run the tool with `request.args`, reporting progress to `observer`
    /// and writing every output record to `log`.
    pub fn run(
        &mut self,
        request: &RunRequest,
        observer: &mut dyn ProgressObserver,
        log: &mut dyn Write,
    ) -> Result<StreamOutcome, RuntimeError> {
        let argv = self.command.argv(&request.args);
        let (program, rest) = argv
            .split_first()
            .ok_or_else(|| RuntimeError::ToolUnavailable("empty command line".to_owned()))?;

        let pty = Pty::open()?;
        let mut cmd = Command::new(program);
        cmd.args(rest)
            .env("LC_ALL", &self.command.locale)
            .stdin(pty.slave_stdio()?)
            .stdout(pty.slave_stdio()?)
            .stderr(pty.slave_stdio()?);
        let mut child = cmd.spawn().map_err(|source| RuntimeError::Spawn {
            program: program.clone(),
            source,
        })?;
        // The command keeps its copies of the slave open until dropped.
        drop(cmd);
        let output = pty.into_master();
        info!("spawned {} (pid {})", argv.join(" "), child.id());

        self.runs += 1;
        let mut parser = ProgressParser::new(request.kind);
        stream_child(
            &mut child,
            output,
            &mut parser,
            observer,
            log,
            &request.cancel,
            request.timeout,
        )
    }
}
