use std::fmt;
use std::process::Command;

/// A missing prerequisite with actionable install instructions.
#[derive(Debug)]
pub struct MissingPrereq {
    pub name: String,
    pub purpose: &'static str,
    pub install_hint: &'static str,
}

impl fmt::Display for MissingPrereq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "  - {}: {} (install: {})",
            self.name, self.purpose, self.install_hint
        )
    }
}

pub fn command_exists(name: &str) -> bool {
    Command::new("which")
        .arg(name)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Check that the tool and its command prefix (e.g. `sudo`) can be found.
/// Empty list means everything is in place.
pub fn check_tool_prereqs(program: &str, prefix: &[String]) -> Vec<MissingPrereq> {
    let mut missing = Vec::new();

    if let Some(wrapper) = prefix.first() {
        if !command_exists(wrapper) {
            missing.push(MissingPrereq {
                name: wrapper.clone(),
                purpose: "running the package tool with elevated privileges",
                install_hint: "apt-get install sudo, or clear tool.command_prefix",
            });
        }
    }

    if !command_exists(program) {
        missing.push(MissingPrereq {
            name: program.to_owned(),
            purpose: "package installation and removal",
            install_hint: "apt-get is part of the apt package; or set tool.program",
        });
    }

    missing
}

/// Format a list of missing prerequisites into a user-friendly error message.
pub fn format_missing(missing: &[MissingPrereq]) -> String {
    use std::fmt::Write as _;
    let mut msg = String::from("missing prerequisites:\n");
    for m in missing {
        let _ = writeln!(msg, "{m}");
    }
    msg.push_str("\nSet APTWARD_SKIP_PREREQS=1 to bypass this check.");
    msg
}
