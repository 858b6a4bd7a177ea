//! Process configuration resolved once at startup.
//!
//! # Responsibility
//! - Resolve the per-user data directory and the files inside it.
//! - Carry the requested search mode to the index manager and the log
//!   level to the logging bootstrap.
//!
//! # Invariants
//! - `data_dir` is always absolute once resolved.
//! - Resolution never touches the database file.

use crate::logging::default_log_level;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const APP_DIR_NAME: &str = "thinkspace";
pub const DB_FILE_NAME: &str = "notes.db";
pub const LOG_DIR_NAME: &str = "logs";

/// Requested search backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SearchMode {
    /// Use the full-text index when the engine supports it.
    #[default]
    Auto,
    /// Like `Auto`, but a missing index is logged as a warning.
    Indexed,
    /// Always use substring matching.
    Fallback,
}

impl SearchMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Indexed => "indexed",
            Self::Fallback => "fallback",
        }
    }
}

impl Display for SearchMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "indexed" | "fts" | "fts5" => Ok(Self::Indexed),
            "fallback" | "like" | "substring" => Ok(Self::Fallback),
            other => Err(ConfigError::InvalidSearchMode(other.to_string())),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    /// The platform reports no per-user data directory and none was given.
    NoDataDir,
    InvalidSearchMode(String),
    Io(std::io::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoDataDir => write!(
                f,
                "cannot determine a data directory; pass --data-dir or set THINKSPACE_HOME"
            ),
            Self::InvalidSearchMode(value) => write!(
                f,
                "unsupported search mode `{value}`; expected auto|indexed|fallback"
            ),
            Self::Io(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// Resolved application settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub search_mode: SearchMode,
    pub log_level: String,
}

impl AppConfig {
    /// Resolves settings from an optional data directory override.
    ///
    /// Relative overrides are anchored at the current directory.
    pub fn resolve(
        data_dir_override: Option<&Path>,
        search_mode: SearchMode,
    ) -> Result<Self, ConfigError> {
        let data_dir = match data_dir_override {
            Some(path) if path.is_absolute() => path.to_path_buf(),
            Some(path) => std::env::current_dir()?.join(path),
            None => default_data_dir().ok_or(ConfigError::NoDataDir)?,
        };

        Ok(Self {
            data_dir,
            search_mode,
            log_level: default_log_level().to_string(),
        })
    }

    /// Overrides the build-mode default log level.
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Location of the notes database.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE_NAME)
    }

    /// Directory for rolling log files.
    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join(LOG_DIR_NAME)
    }
}

/// Platform data directory for this application, e.g.
/// `~/.local/share/thinkspace` on Linux.
pub fn default_data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join(APP_DIR_NAME))
}
