//! Progress recognition over the wrapped tool's terminal output.

use crate::observer::{Phase, ProgressNotification, ProgressObserver};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;
use tracing::{debug, trace};

/// A record containing this ends every open progress event.
pub const COMPLETION_MARKER: &str = "Done.";

pub const DOWNLOAD_EVENT_PREFIX: &str = "system.downloadProgress-";
pub const INSTALL_EVENT: &str = "system.installProgress";

// `42% [3 vim-common 1024/4096KB 25%]`
static DOWNLOAD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?P<global>\d+)%\s*\[(?P<order>\d+)\s+(?P<pkg>[\w\-+]+)\s+(?P<data>[0-9]+/[0-9]+[KMG]?B)\s+(?P<local>\d+)%\]",
    )
    .expect("valid regex")
});

// `2: vim-common ########## [ 40%]`
static INSTALL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<step>\d+):\s+(?P<pkg>[\w\-:+]+).*?\[\s*(?P<percent>\d+)%\]")
        .expect("valid regex")
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    #[default]
    Install,
    Remove,
    Change,
}

impl OperationKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Install => "Installation",
            Self::Remove => "Removal",
            Self::Change => "Change",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Install => "install",
            Self::Remove => "remove",
            Self::Change => "change",
        })
    }
}

impl std::str::FromStr for OperationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "install" => Ok(Self::Install),
            "remove" => Ok(Self::Remove),
            "change" => Ok(Self::Change),
            other => Err(format!("unknown operation kind '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    Running,
    Draining,
    Done,
}

/// What a single record was recognized as.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Progress {
    Download { unit: String, percent: u8 },
    Install { unit: String, percent: u8 },
}

fn recognize(record: &str) -> Option<Progress> {
    if let Some(caps) = DOWNLOAD_RE.captures(record) {
        let percent = caps["local"].parse().ok()?;
        return Some(Progress::Download {
            unit: caps["pkg"].to_owned(),
            percent,
        });
    }
    let caps = INSTALL_RE.captures(record)?;
    let percent = caps["percent"].parse().ok()?;
    Some(Progress::Install {
        unit: caps["pkg"].to_owned(),
        percent,
    })
}

/// Turns output records into progress notifications.
///
/// Every event name that received an update stays open until a record with
/// [`COMPLETION_MARKER`] arrives, or until [`ProgressParser::finish`].
pub struct ProgressParser {
    kind: OperationKind,
    state: ParserState,
    open: BTreeMap<String, String>,
    records: usize,
}

impl ProgressParser {
    pub fn new(kind: OperationKind) -> Self {
        Self {
            kind,
            state: ParserState::Running,
            open: BTreeMap::new(),
            records: 0,
        }
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    pub fn records(&self) -> usize {
        self.records
    }

    pub fn open_events(&self) -> impl Iterator<Item = &str> {
        self.open.keys().map(String::as_str)
    }

    /// The child has exited; remaining records are buffered output.
    pub fn child_exited(&mut self) {
        if self.state == ParserState::Running {
            debug!("child exited, draining {} open events", self.open.len());
            self.state = ParserState::Draining;
        }
    }

    pub fn feed(&mut self, record: &str, observer: &mut dyn ProgressObserver) {
        if self.state == ParserState::Done {
            trace!("record after finish ignored: {record}");
            return;
        }
        self.records += 1;

        match recognize(record) {
            Some(Progress::Download { unit, percent }) => {
                let name = format!("{DOWNLOAD_EVENT_PREFIX}{unit}");
                let label = format!("Downloading: {unit}");
                self.update(name, label, percent, observer);
            }
            Some(Progress::Install { unit, percent }) => {
                let label = format!("{}: {unit}", self.kind.label());
                self.update(INSTALL_EVENT.to_owned(), label, percent, observer);
            }
            None => {}
        }

        if record.contains(COMPLETION_MARKER) {
            self.complete_open(observer);
        }
    }

    /// End of stream. Open events are left unterminated: only the tool's own
    /// completion marker closes them.
    pub fn finish(&mut self) {
        if !self.open.is_empty() {
            debug!(
                "stream ended with {} unterminated progress events",
                self.open.len()
            );
        }
        self.open.clear();
        self.state = ParserState::Done;
    }

    fn update(
        &mut self,
        name: String,
        label: String,
        percent: u8,
        observer: &mut dyn ProgressObserver,
    ) {
        observer.notify(ProgressNotification {
            event_name: name.clone(),
            phase: Phase::Before,
            percent: Some(f64::from(percent)),
            label: Some(label.clone()),
        });
        self.open.insert(name, label);
    }

    fn complete_open(&mut self, observer: &mut dyn ProgressObserver) {
        for (name, label) in std::mem::take(&mut self.open) {
            observer.notify(ProgressNotification {
                event_name: name,
                phase: Phase::After,
                percent: Some(100.0),
                label: Some(label),
            });
        }
    }
}
