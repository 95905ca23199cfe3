use regex::Regex;

/// Positional placeholder used in signature templates.
pub const PLACEHOLDER: &str = "%s";

/// Compile a signature template into an anchored full-line matcher.
///
/// Literal segments are escaped; each placeholder becomes a greedy `(.+)`
/// capture, so a placeholder never matches an empty string.
pub fn compile(template: &str) -> Result<Regex, regex::Error> {
    let body = template
        .split(PLACEHOLDER)
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join("(.+)");
    Regex::new(&format!("^{body}$"))
}

pub fn placeholder_count(template: &str) -> usize {
    template.matches(PLACEHOLDER).count()
}

/// Substitute `params` into `template` positionally.
///
/// Only the first `count` params are used. Placeholders beyond the supplied
/// params are replaced with an empty string.
pub fn render(template: &str, params: &[String], count: usize) -> String {
    let mut used = params.iter().take(count);
    let mut out = String::with_capacity(template.len());
    let mut pieces = template.split(PLACEHOLDER);
    if let Some(first) = pieces.next() {
        out.push_str(first);
    }
    for piece in pieces {
        if let Some(p) = used.next() {
            out.push_str(p);
        }
        out.push_str(piece);
    }
    out
}
