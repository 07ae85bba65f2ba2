//! # Configuration
//!
//! Store configuration is loaded with [`confique`] from, in priority order:
//! 1. **Environment variables**: `WIKIDESK_DB_PATH`, `WIKIDESK_LOG_LEVEL`,
//!    `WIKIDESK_LOG_DIR`, `WIKIDESK_MAX_BACKUPS`.
//! 2. **TOML file**: passed explicitly (`wikidesk --config wikidesk.toml`).
//! 3. **Compiled defaults**: `#[config(default = ...)]`.
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | `database.path` | none | SQLite file; in-memory store when absent |
//! | `logging.level` | `info` | trace, debug, info, warn or error |
//! | `logging.dir` | none | Absolute log directory; logging off when absent |
//! | `backups.max_backups` | `20` | Stored backups kept; `0` keeps all |

use crate::service::backup_service::DEFAULT_MAX_BACKUPS;
use confique::Config;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

#[derive(Config, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct WikiConfig {
    #[config(nested)]
    pub database: DatabaseConfig,
    #[config(nested)]
    pub logging: LoggingConfig,
    #[config(nested)]
    pub backups: BackupConfig,
}

#[derive(Config, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// SQLite database file. The store lives in memory when unset.
    #[config(env = "WIKIDESK_DB_PATH")]
    pub path: Option<PathBuf>,
}

#[derive(Config, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    #[config(env = "WIKIDESK_LOG_LEVEL", default = "info")]
    pub level: String,
    /// Must be absolute.
    #[config(env = "WIKIDESK_LOG_DIR")]
    pub dir: Option<PathBuf>,
}

#[derive(Config, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct BackupConfig {
    #[config(env = "WIKIDESK_MAX_BACKUPS", default = 20)]
    pub max_backups: u32,
}

impl Default for WikiConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig { path: None },
            logging: LoggingConfig {
                level: "info".to_string(),
                dir: None,
            },
            backups: BackupConfig {
                max_backups: DEFAULT_MAX_BACKUPS,
            },
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    /// Explicit config file does not exist.
    MissingFile(PathBuf),
    /// Source could not be read or a value failed to parse.
    Load(confique::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingFile(path) => write!(f, "config file not found: {}", path.display()),
            Self::Load(err) => write!(f, "failed to load config: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Load(err) => Some(err),
            Self::MissingFile(_) => None,
        }
    }
}

impl From<confique::Error> for ConfigError {
    fn from(value: confique::Error) -> Self {
        Self::Load(value)
    }
}

impl WikiConfig {
    /// Loads env over the optional TOML file over compiled defaults.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Self::builder().env();
        if let Some(path) = file {
            if !path.is_file() {
                return Err(ConfigError::MissingFile(path.to_path_buf()));
            }
            builder = builder.file(path);
        }
        Ok(builder.load()?)
    }
}

#[cfg(test)]
mod tests {
    use super::WikiConfig;

    #[test]
    fn defaults_are_in_memory_with_info_logging() {
        let config = WikiConfig::default();
        assert_eq!(config.database.path, None);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.dir, None);
        assert_eq!(config.backups.max_backups, 20);
    }
}
