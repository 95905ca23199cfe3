use crate::code::ErrorCode;
use crate::i18n;
use serde::Serialize;

/// A registered diagnostic template.
///
/// `pattern` is what the tool prints; `message` is the msgid used for the
/// localized rendering. They are identical except where the rendered wording
/// was corrected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ErrorSignature {
    pub code: ErrorCode,
    pub pattern: &'static str,
    pub message: &'static str,
    pub params: usize,
}

impl ErrorSignature {
    pub const fn new(code: ErrorCode, pattern: &'static str, params: usize) -> Self {
        Self {
            code,
            pattern,
            message: pattern,
            params,
        }
    }

    #[must_use]
    pub const fn rendered_as(mut self, message: &'static str) -> Self {
        self.message = message;
        self
    }

    /// The localized template, with placeholders still in place.
    pub fn render(&self) -> String {
        i18n::translate(self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_defaults_to_pattern() {
        let sig = ErrorSignature::new(ErrorCode::BrokenPackages, "Broken packages", 0);
        assert_eq!(sig.message, "Broken packages");
        assert_eq!(sig.render(), "Broken packages");
    }

    #[test]
    fn rendered_as_overrides_message() {
        let sig = ErrorSignature::new(ErrorCode::ConflictsViolated, "Fatal, conflicts violated %s", 1)
            .rendered_as("Fatal: conflicts violated %s");
        assert_eq!(sig.pattern, "Fatal, conflicts violated %s");
        assert_eq!(sig.render(), "Fatal: conflicts violated %s");
    }
}
