//! Error types for checkmatch-core

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in checkmatch-core
#[derive(Debug, Error)]
pub enum Error {
    /// No row in the scan window carried every header keyword
    #[error(
        "could not find a header row containing the keywords {keywords:?} in the first {scanned_rows} rows"
    )]
    HeaderNotFound {
        keywords: Vec<String>,
        scanned_rows: usize,
    },

    /// File extension is not one the loader knows how to parse
    #[error("unsupported file format '{extension}' for '{path}'")]
    UnsupportedFormat { path: PathBuf, extension: String },

    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// CSV parsing error from the csv crate
    #[error("CSV error in '{path}': {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Workbook could not be read, or the file's structure is unusable
    #[error("failed to parse '{path}': {message}")]
    Parse { path: PathBuf, message: String },

    /// The imported table has no column matching the join-key alias
    #[error("expected '{expected}' column not found")]
    MissingKeyColumn { expected: String },

    /// Any other failure while computing the join
    #[error("reconciliation failed: {0}")]
    ReconciliationFailure(String),

    /// A run was requested before any table was loaded
    #[error("no file loaded; load a file before running")]
    NoTableLoaded,

    /// The reference query could not be executed
    #[error("query failed: {0}")]
    Query(String),

    /// SQLite error from the reference source
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Writing an export file failed
    #[error("failed to export '{path}': {message}")]
    Export { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("invalid configuration: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// True for I/O and parse failures while reading an input file
    pub fn is_file_read(&self) -> bool {
        matches!(
            self,
            Error::FileRead { .. } | Error::Csv { .. } | Error::Parse { .. }
        )
    }
}
