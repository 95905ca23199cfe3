//! Terminal and JSON presentation of progress and classified errors.

use aptward_catalog::{ClassifiedError, ErrorSource};
use aptward_runtime::{Phase, ProgressNotification, ProgressObserver};
use console::Style;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io::Write;
use tracing::debug;

/// One progress bar per open event name.
pub struct ProgressBars {
    multi: MultiProgress,
    bars: HashMap<String, ProgressBar>,
}

impl Default for ProgressBars {
    fn default() -> Self {
        Self::with_multi(MultiProgress::new())
    }
}

impl ProgressBars {
    pub fn with_multi(multi: MultiProgress) -> Self {
        Self {
            multi,
            bars: HashMap::new(),
        }
    }

    pub fn active(&self) -> usize {
        self.bars.len()
    }

    /// Drop bars that never saw a terminal notification.
    pub fn abandon(&mut self) {
        for (_, bar) in self.bars.drain() {
            bar.abandon();
        }
    }

    fn bar(&mut self, event_name: &str) -> &ProgressBar {
        let multi = &self.multi;
        self.bars
            .entry(event_name.to_owned())
            .or_insert_with(|| {
                let bar = multi.add(ProgressBar::new(100));
                bar.set_style(
                    ProgressStyle::with_template("{msg:<40} [{bar:30.cyan/blue}] {pos:>3}%")
                        .expect("valid template")
                        .progress_chars("=> "),
                );
                bar
            })
    }
}

impl ProgressObserver for ProgressBars {
    fn notify(&mut self, notification: ProgressNotification) {
        let label = notification
            .label
            .clone()
            .unwrap_or_else(|| notification.event_name.clone());
        let percent = notification.percent.unwrap_or(0.0).clamp(0.0, 100.0) as u64;
        match notification.phase {
            Phase::Before => {
                let bar = self.bar(&notification.event_name);
                bar.set_position(percent);
                bar.set_message(label);
            }
            Phase::After => {
                self.bar(&notification.event_name).set_position(percent);
                if let Some(bar) = self.bars.remove(&notification.event_name) {
                    bar.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
                    bar.finish_with_message(format!("✓ {label}"));
                }
            }
        }
    }
}

/// Writes each notification as one JSON object per line.
pub struct JsonLines<W: Write> {
    out: W,
}

impl<W: Write> JsonLines<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ProgressObserver for JsonLines<W> {
    fn notify(&mut self, notification: ProgressNotification) {
        let line = serde_json::json!({ "progress": notification });
        if let Err(e) = writeln!(self.out, "{line}") {
            debug!("dropping progress line: {e}");
        }
    }
}

pub fn colorize_source(source: ErrorSource) -> String {
    let text = source.to_string();
    match source {
        ErrorSource::UserInput => Style::new().yellow().apply_to(text).to_string(),
        ErrorSource::Dependency => Style::new().magenta().apply_to(text).to_string(),
        ErrorSource::Download => Style::new().cyan().apply_to(text).to_string(),
        ErrorSource::Storage => Style::new().red().apply_to(text).to_string(),
        ErrorSource::Binding => Style::new().dim().apply_to(text).to_string(),
    }
}

/// `message  [Code #n, source]`, with the message bold when critical.
pub fn classified_line(err: &ClassifiedError) -> String {
    let message = if err.is_critical() {
        Style::new().bold().apply_to(err.message()).to_string()
    } else {
        err.message()
    };
    format!(
        "{message}  [{} #{}, {}]",
        err.code(),
        err.code().number(),
        colorize_source(err.source())
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use aptward_catalog::ErrorCatalog;
    use indicatif::ProgressDrawTarget;

    fn note(name: &str, phase: Phase, percent: f64) -> ProgressNotification {
        ProgressNotification {
            event_name: name.to_owned(),
            phase,
            percent: Some(percent),
            label: Some(format!("Downloading: {name}")),
        }
    }

    fn hidden_bars() -> ProgressBars {
        ProgressBars::with_multi(MultiProgress::with_draw_target(ProgressDrawTarget::hidden()))
    }

    #[test]
    fn bars_open_per_event_and_close_on_terminal() {
        let mut bars = hidden_bars();
        bars.notify(note("a", Phase::Before, 10.0));
        bars.notify(note("b", Phase::Before, 20.0));
        bars.notify(note("a", Phase::Before, 50.0));
        assert_eq!(bars.active(), 2);
        bars.notify(note("a", Phase::After, 100.0));
        assert_eq!(bars.active(), 1);
        bars.abandon();
        assert_eq!(bars.active(), 0);
    }

    #[test]
    fn json_lines_writes_one_object_per_notification() {
        let mut out = JsonLines::new(Vec::<u8>::new());
        out.notify(note("a", Phase::Before, 40.0));
        out.notify(note("a", Phase::After, 100.0));
        let text = String::from_utf8(out.into_inner()).unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["progress"]["percent"], 40.0);
        assert_eq!(lines[1]["progress"]["phase"], "after");
    }

    #[test]
    fn classified_line_names_code() {
        let err = ErrorCatalog::builtin()
            .match_line("Couldn't find package vim")
            .unwrap();
        let line = classified_line(&err);
        assert!(line.contains("Couldn't find package vim"));
        assert!(line.contains("PackageNotFound #"));
    }

    #[test]
    fn colorize_source_keeps_text() {
        assert!(colorize_source(ErrorSource::Download).contains("download"));
    }
}
