//! Message translations for rendered diagnostics.
//!
//! A translation table maps an English msgid to its localized form. One table
//! can be installed per process; until then, and for any msgid the table does
//! not know, messages render in English.

use crate::CatalogError;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;
use tracing::debug;

static INSTALLED: OnceLock<Translations> = OnceLock::new();

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Translations {
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub messages: HashMap<String, String>,
}

impl Translations {
    pub fn from_toml_str(input: &str) -> Result<Self, CatalogError> {
        Ok(toml::from_str(input)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn lookup(&self, msgid: &str) -> Option<&str> {
        self.messages
            .get(msgid)
            .map(String::as_str)
            .filter(|s| !s.is_empty())
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Install the process-wide translation table. Fails if one is already set.
pub fn install(translations: Translations) -> Result<(), CatalogError> {
    let language = translations.language.clone();
    let count = translations.len();
    INSTALLED
        .set(translations)
        .map_err(|_| CatalogError::TranslationsInstalled)?;
    debug!(
        "installed {count} translations ({})",
        language.as_deref().unwrap_or("unnamed")
    );
    Ok(())
}

pub fn translate(msgid: &str) -> String {
    INSTALLED
        .get()
        .and_then(|t| t.lookup(msgid))
        .unwrap_or(msgid)
        .to_owned()
}
