//! Error types for the Sluice library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Sluice operations.
#[derive(Debug, Error)]
pub enum SluiceError {
    /// Error reading or accessing a file.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The persisted ledger exists but cannot be parsed. Fatal at load.
    #[error("corrupt ledger store '{path}': {message}")]
    CorruptStore { path: PathBuf, message: String },

    /// Two producers declare the same column, or a declared type
    /// contradicts what the ledger already holds.
    #[error("schema conflict on column '{column}': {message}")]
    SchemaConflict { column: String, message: String },

    /// Malformed or semantically invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A producer or rule name that no registry entry matches.
    #[error("unknown {kind} '{name}'")]
    UnknownName { kind: &'static str, name: String },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A referenced column does not exist in the frame.
    #[error("column '{0}' not found")]
    MissingColumn(String),

    /// A value does not fit the column or expression it was used with.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// Structural misuse of a frame (length mismatch, duplicate column).
    #[error("frame error: {0}")]
    Frame(String),

    /// A single row's attribute computation failed. Captured into the
    /// populate report rather than aborting the batch.
    #[error("row computation failed: {0}")]
    Row(String),
}

/// Result type alias for Sluice operations.
pub type Result<T> = std::result::Result<T, SluiceError>;

impl SluiceError {
    /// Wrap an IO error with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SluiceError::Io {
            path: path.into(),
            source,
        }
    }

    /// Shorthand for a per-row computation failure.
    pub fn row(message: impl Into<String>) -> Self {
        SluiceError::Row(message.into())
    }
}
