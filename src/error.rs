use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to open {source_name} at '{}': {error}", .path.display())]
    SourceRead {
        source_name: String,
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    #[error("Malformed CSV in {source_name}: {error}")]
    Csv {
        source_name: String,
        #[source]
        error: csv::Error,
    },

    #[error("{source_name} is missing required column '{column}'")]
    MissingColumn { source_name: String, column: String },

    #[error("{source_name} row {row}: invalid value '{value}' for column '{column}'")]
    InvalidField {
        source_name: String,
        row: usize,
        column: String,
        value: String,
    },

    #[error("{source_name} row {row}: missing value for column '{column}'")]
    MissingValue {
        source_name: String,
        row: usize,
        column: String,
    },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{count} foreign key violation(s), first in {first}")]
    Integrity { count: usize, first: String },

    #[error("Verification failed: {0}")]
    Verification(String),
}

pub type Result<T> = std::result::Result<T, BuildError>;
