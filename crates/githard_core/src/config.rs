//! Explicit service configuration.
//!
//! # Responsibility
//! - Describe where the project collection lives and how to log.
//! - Load settings from TOML with environment overrides layered on top.
//!
//! # Invariants
//! - No ambient globals: callers construct a `ServiceConfig` and pass it to
//!   whatever opens connections or starts logging.
//! - Missing keys fall back to `ServiceConfig::default()`.

use crate::db::{open_db, DbResult};
use crate::logging::{default_log_level, init_logging};
use rusqlite::Connection;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const DEFAULT_DB_FILE_NAME: &str = "githard.sqlite3";

pub const ENV_DB_PATH: &str = "GITHARD_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "GITHARD_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "GITHARD_LOG_DIR";

/// Runtime settings for one service process.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// SQLite file holding the project collection.
    pub db_path: PathBuf,
    pub log_level: String,
    /// File logging is disabled when unset.
    pub log_dir: Option<PathBuf>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_FILE_NAME),
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(toml::de::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "cannot read config file `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config file: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        Self::Parse(value)
    }
}

impl ServiceConfig {
    /// Parses a TOML document such as:
    ///
    /// ```toml
    /// db_path = "/var/lib/githard/projects.sqlite3"
    /// log_level = "info"
    /// log_dir = "/var/log/githard"
    /// ```
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Reads and parses a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Applies `GITHARD_*` overrides resolved through `lookup`.
    ///
    /// Blank values are ignored.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let value = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        if let Some(db_path) = value(ENV_DB_PATH) {
            self.db_path = PathBuf::from(db_path);
        }
        if let Some(log_level) = value(ENV_LOG_LEVEL) {
            self.log_level = log_level;
        }
        if let Some(log_dir) = value(ENV_LOG_DIR) {
            self.log_dir = Some(PathBuf::from(log_dir));
        }
        self
    }

    /// Opens the configured database with migrations applied.
    pub fn open_db(&self) -> DbResult<Connection> {
        open_db(&self.db_path)
    }

    /// Starts file logging when `log_dir` is configured.
    ///
    /// Returns `Ok(false)` when file logging is disabled.
    pub fn init_logging(&self) -> Result<bool, String> {
        let Some(log_dir) = &self.log_dir else {
            return Ok(false);
        };
        let log_dir = log_dir
            .to_str()
            .ok_or_else(|| format!("log_dir is not valid UTF-8: {}", log_dir.display()))?;
        init_logging(&self.log_level, log_dir)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, ServiceConfig, DEFAULT_DB_FILE_NAME, ENV_DB_PATH, ENV_LOG_DIR};
    use std::path::PathBuf;

    #[test]
    fn empty_document_uses_defaults() {
        let config = ServiceConfig::from_toml_str("").unwrap();
        assert_eq!(config, ServiceConfig::default());
        assert_eq!(config.db_path, PathBuf::from(DEFAULT_DB_FILE_NAME));
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn parses_all_keys() {
        let config = ServiceConfig::from_toml_str(
            r#"
            db_path = "/tmp/projects.sqlite3"
            log_level = "warn"
            log_dir = "/tmp/githard-logs"
            "#,
        )
        .unwrap();
        assert_eq!(config.db_path, PathBuf::from("/tmp/projects.sqlite3"));
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.log_dir, Some(PathBuf::from("/tmp/githard-logs")));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = ServiceConfig::from_toml_str("mongo_uri = \"mongodb://localhost\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn env_overrides_replace_file_values_and_skip_blanks() {
        let config = ServiceConfig::default().with_env_overrides(|key| match key {
            ENV_DB_PATH => Some("/data/projects.sqlite3".to_string()),
            ENV_LOG_DIR => Some("   ".to_string()),
            _ => None,
        });
        assert_eq!(config.db_path, PathBuf::from("/data/projects.sqlite3"));
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ServiceConfig::load(dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn init_logging_is_skipped_without_log_dir() {
        assert_eq!(ServiceConfig::default().init_logging(), Ok(false));
    }
}
