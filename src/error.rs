//! Error types shared by the labeler library and its binaries.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while browsing, decoding, classifying or persisting images.
#[derive(Error, Debug)]
pub enum LabelerError {
    /// I/O error tied to a specific path
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// SQLite error from the annotation library
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The file could not be turned into a displayable bitmap
    #[error("Failed to decode {path:?}: {message}")]
    Decode { path: PathBuf, message: String },

    /// Copying a file into its classification folder failed
    #[error("Failed to copy {source_path:?} into {destination:?}: {source}")]
    Classify {
        source_path: PathBuf,
        destination: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A utility expected an existing database file
    #[error("Database not found: {0:?}")]
    DatabaseNotFound(PathBuf),

    /// A batch commit failed part-way and was rolled back as a whole
    #[error("Batch rolled back after {processed} of {total} images: {source}")]
    BatchRolledBack {
        processed: usize,
        total: usize,
        #[source]
        source: Box<LabelerError>,
    },

    /// A stored value does not match the schema
    #[error("Invalid stored value for {field}: '{value}'")]
    InvalidValue { field: &'static str, value: String },

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON parsing or serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV writing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl LabelerError {
    /// Wrap an I/O error with the path that caused it.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LabelerError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn decode(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        LabelerError::Decode {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, LabelerError>;
