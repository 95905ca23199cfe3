use crate::code::{ErrorCode, ErrorSource};
use crate::signature::ErrorSignature;
use crate::template;
use serde::Serialize;
use std::fmt;

/// A diagnostic line matched against a signature, with its extracted params.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedError {
    signature: ErrorSignature,
    params: Vec<String>,
}

/// Serializable view of a [`ClassifiedError`].
#[derive(Debug, Clone, Serialize)]
pub struct ClassifiedReport {
    pub code: ErrorCode,
    pub number: u16,
    pub source: ErrorSource,
    pub message: String,
    pub params: Vec<String>,
    pub critical: bool,
    pub needs_refresh: bool,
}

impl ClassifiedError {
    pub fn new(signature: ErrorSignature, params: Vec<String>) -> Self {
        Self { signature, params }
    }

    pub fn signature(&self) -> &ErrorSignature {
        &self.signature
    }

    pub fn code(&self) -> ErrorCode {
        self.signature.code
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub(crate) fn push_param(&mut self, param: String) {
        self.params.push(param);
    }

    /// Localized message with params substituted.
    pub fn message(&self) -> String {
        template::render(&self.signature.render(), &self.params, self.signature.params)
    }

    pub fn is_critical(&self) -> bool {
        self.code().is_critical()
    }

    pub fn needs_refresh(&self) -> bool {
        self.code().needs_refresh()
    }

    pub fn source(&self) -> ErrorSource {
        self.code().source()
    }

    pub fn report(&self) -> ClassifiedReport {
        ClassifiedReport {
            code: self.code(),
            number: self.code().number(),
            source: self.source(),
            message: self.message(),
            params: self.params.clone(),
            critical: self.is_critical(),
            needs_refresh: self.needs_refresh(),
        }
    }
}

impl fmt::Display for ClassifiedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

impl std::error::Error for ClassifiedError {}
