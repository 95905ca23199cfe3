use crate::external_lock::{ExternalLock, DEFAULT_LOCK_PATHS};
use crate::CoreError;
use aptward_catalog::Translations;
use aptward_runtime::ToolCommand;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "APTWARD_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct AptwardConfig {
    pub tool: ToolCommand,
    pub lock: LockConfig,
    pub i18n: I18nConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct LockConfig {
    /// Files whose lock, when held by another process, blocks every operation.
    pub paths: Vec<PathBuf>,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            paths: DEFAULT_LOCK_PATHS.iter().map(PathBuf::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct I18nConfig {
    /// TOML message table used to render classified errors.
    pub messages: Option<PathBuf>,
}

impl AptwardConfig {
    pub fn from_toml_str(input: &str, origin: &Path) -> Result<Self, CoreError> {
        toml::from_str(input).map_err(|source| CoreError::Config {
            path: origin.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content, path)?;
        debug!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), CoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Config from `explicit`, else `$APTWARD_CONFIG`, else the default path
    /// if it exists, else built-in defaults.
    ///
    /// A named file that does not exist is an error; only the default
    /// location is optional.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, CoreError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
            return Self::load(Path::new(&path));
        }
        match default_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => {
                debug!("no config file, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn external_lock(&self) -> ExternalLock {
        ExternalLock::new(self.lock.paths.iter().cloned())
    }

    /// Install the configured message table, if any. Returns whether one was
    /// installed.
    pub fn install_translations(&self) -> Result<bool, CoreError> {
        let Some(path) = &self.i18n.messages else {
            return Ok(false);
        };
        let translations = Translations::load(path)?;
        aptward_catalog::i18n::install(translations)?;
        info!("using translations from {}", path.display());
        Ok(true)
    }
}

/// `~/.config/aptward/config.toml`, if `HOME` is set.
pub fn default_path() -> Option<PathBuf> {
    let home = std::env::var_os("HOME")?;
    Some(PathBuf::from(home).join(".config/aptward/config.toml"))
}
