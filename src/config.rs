//! Configuration file support.
//!
//! Settings are resolved in three layers: built-in defaults, then an optional
//! JSON file in the user's config directory, then environment overrides.
//! The command line utilities add their own flags on top.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{LabelerError, Result};

/// Current configuration file format version.
pub const CONFIG_VERSION: u32 = 1;

/// Application directory name under the platform data/config dirs
pub const APP_DIR_NAME: &str = "ophtha-labeler";

/// Environment variable overriding the database location
pub const ENV_DATABASE: &str = "OPHTHA_LABELER_DATABASE";

/// Environment variable overriding the classification output base directory
pub const ENV_OUTPUT_DIR: &str = "OPHTHA_LABELER_OUTPUT_DIR";

/// Default bound for the displayed preview (pixels, both axes)
pub const DEFAULT_PREVIEW_MAX_SIDE: u32 = 500;

/// Log level setting for the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Where the annotation database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    /// A SQLite file on disk
    File(PathBuf),
    /// A private in-memory database (lost when the connection closes)
    Memory,
}

impl DatabaseLocation {
    /// Parse a connection string.
    ///
    /// Accepted forms: `sqlite://<path>`, `sqlite:<path>`, `sqlite::memory:`
    /// and a bare filesystem path. Other schemes are rejected since only the
    /// bundled SQLite backend is compiled in.
    pub fn parse(url: &str) -> Result<Self> {
        let url = url.trim();
        if url.is_empty() {
            return Err(LabelerError::Config("empty database location".into()));
        }

        if url == "sqlite::memory:" || url == ":memory:" {
            return Ok(DatabaseLocation::Memory);
        }

        if let Some(rest) = url.strip_prefix("sqlite://") {
            return Self::file(rest);
        }
        if let Some(rest) = url.strip_prefix("sqlite:") {
            return Self::file(rest);
        }

        if let Some((scheme, _)) = url.split_once("://") {
            return Err(LabelerError::Config(format!(
                "unsupported database scheme '{scheme}'"
            )));
        }

        Self::file(url)
    }

    fn file(path: &str) -> Result<Self> {
        if path.is_empty() {
            return Err(LabelerError::Config("database path is empty".into()));
        }
        Ok(DatabaseLocation::File(PathBuf::from(path)))
    }
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Version of the configuration file format
    pub version: u32,
    /// Connection string for the annotation database
    pub database_url: String,
    /// Base directory under which `Classified/<label>/` is created
    pub output_dir: PathBuf,
    /// Maximum width/height of the displayed preview
    pub preview_max_side: u32,
    /// Default log verbosity
    pub log_level: LogLevel,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            database_url: default_database_path().to_string_lossy().into_owned(),
            output_dir: PathBuf::from("."),
            preview_max_side: DEFAULT_PREVIEW_MAX_SIDE,
            log_level: LogLevel::default(),
        }
    }
}

/// Default database file:
/// - Linux: ~/.local/share/ophtha-labeler/labels.db
/// - macOS: ~/Library/Application Support/ophtha-labeler/labels.db
/// - Windows: %APPDATA%\ophtha-labeler\labels.db
///
/// Falls back to the working directory when no data dir can be determined.
pub fn default_database_path() -> PathBuf {
    match dirs::data_dir().or_else(dirs::home_dir) {
        Some(mut path) => {
            path.push(APP_DIR_NAME);
            path.push("labels.db");
            path
        }
        None => PathBuf::from("labels.db"),
    }
}

/// Location of the optional config file
pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME).join("config.json"))
}

impl AppConfig {
    /// Resolve the configuration from defaults, the config file and the environment.
    pub fn load() -> Result<Self> {
        let mut config = match config_file_path() {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Self::default(),
        };

        config.apply_overrides(
            std::env::var(ENV_DATABASE).ok(),
            std::env::var_os(ENV_OUTPUT_DIR).map(PathBuf::from),
        );

        Ok(config)
    }

    /// Read a JSON config file. Missing keys take their default values.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| LabelerError::io(path, e))?;
        let config: AppConfig = serde_json::from_str(&text)?;

        if config.version > CONFIG_VERSION {
            return Err(LabelerError::Config(format!(
                "config version {} is newer than supported version {}",
                config.version, CONFIG_VERSION
            )));
        }
        if config.preview_max_side == 0 {
            return Err(LabelerError::Config(
                "preview_max_side must be greater than zero".into(),
            ));
        }

        Ok(config)
    }

    /// Replace the database and output locations when an override is given.
    pub fn apply_overrides(&mut self, database_url: Option<String>, output_dir: Option<PathBuf>) {
        if let Some(url) = database_url.filter(|u| !u.trim().is_empty()) {
            self.database_url = url;
        }
        if let Some(dir) = output_dir {
            self.output_dir = dir;
        }
    }

    /// Parsed database location
    pub fn database(&self) -> Result<DatabaseLocation> {
        DatabaseLocation::parse(&self.database_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_database_locations() {
        assert_eq!(
            DatabaseLocation::parse("sqlite:///tmp/labels.db").unwrap(),
            DatabaseLocation::File(PathBuf::from("/tmp/labels.db"))
        );
        assert_eq!(
            DatabaseLocation::parse("sqlite:local.db").unwrap(),
            DatabaseLocation::File(PathBuf::from("local.db"))
        );
        assert_eq!(
            DatabaseLocation::parse("data/labels.db").unwrap(),
            DatabaseLocation::File(PathBuf::from("data/labels.db"))
        );
        assert_eq!(
            DatabaseLocation::parse("sqlite::memory:").unwrap(),
            DatabaseLocation::Memory
        );
    }

    #[test]
    fn test_rejects_unsupported_scheme() {
        let err = DatabaseLocation::parse("postgresql://user@host/db").unwrap_err();
        assert!(matches!(err, LabelerError::Config(_)));
        assert!(DatabaseLocation::parse("   ").is_err());
        assert!(DatabaseLocation::parse("sqlite://").is_err());
    }

    #[test]
    fn test_partial_config_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "output_dir": "/srv/sorted", "log_level": "debug" }"#).unwrap();

        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("/srv/sorted"));
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.preview_max_side, DEFAULT_PREVIEW_MAX_SIDE);
        assert_eq!(config.version, CONFIG_VERSION);
    }

    #[test]
    fn test_newer_config_version_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "version": 99 }"#).unwrap();

        assert!(matches!(
            AppConfig::from_file(&path),
            Err(LabelerError::Config(_))
        ));
    }

    #[test]
    fn test_overrides_replace_locations() {
        let mut config = AppConfig::default();
        config.apply_overrides(Some("sqlite::memory:".into()), Some(PathBuf::from("out")));
        assert_eq!(config.database().unwrap(), DatabaseLocation::Memory);
        assert_eq!(config.output_dir, PathBuf::from("out"));

        // Blank overrides are ignored
        config.apply_overrides(Some("  ".into()), None);
        assert_eq!(config.database_url, "sqlite::memory:");
    }
}
