//! Error handling for the UDI engine.
//!
//! Fatal conditions abort a run through [`UdiError`]. Recoverable per-row
//! problems never surface here; they are collected as
//! [`RowValidationError`](crate::validation::RowValidationError)s and only
//! become fatal when a table exceeds its configured tolerance.

pub mod util;

use std::io;
use std::path::PathBuf;

use crate::models::TableKind;
use crate::schema::SchemaIssue;

/// Errors that abort a computation pass
#[derive(Debug, thiserror::Error)]
pub enum UdiError {
    /// Error opening, reading or writing a file
    #[error("IO error at {}: {source}", .path.display())]
    Io {
        /// The path involved
        path: PathBuf,
        /// The underlying error
        #[source]
        source: io::Error,
    },

    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Error processing Parquet data
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// Error reading or writing delimited text
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Error converting rows to and from Arrow
    #[error("Arrow serialization error: {0}")]
    SerdeArrow(#[from] serde_arrow::Error),

    /// Error writing the JSON run report
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error parsing a TOML configuration file
    #[error("Configuration file error: {0}")]
    ConfigFile(#[from] toml::de::Error),

    /// Input tables are missing required columns or carry unsupported types
    #[error("Schema error:\n{}", format_issues(.0))]
    Schema(Vec<SchemaIssue>),

    /// Invalid configuration values
    #[error("Configuration error: {0}")]
    Config(String),

    /// Too many rows of one table failed validation
    #[error(
        "{table} table: {kind} rate {rate:.4} exceeds tolerance {tolerance:.4} ({count} of {rows} rows)"
    )]
    ToleranceExceeded {
        /// Table that exceeded its tolerance
        table: TableKind,
        /// Which class of row error was counted
        kind: &'static str,
        /// Number of rows in that class
        count: usize,
        /// Rows read from the table
        rows: usize,
        /// Observed rate
        rate: f64,
        /// Configured tolerance
        tolerance: f64,
    },

    /// Arithmetic case not covered by the sentinel rules
    #[error("Computation error: {0}")]
    Computation(String),

    /// The worker pool could not be created
    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// A background loading task failed to complete
    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl UdiError {
    /// Wrap an IO error with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Shorthand for a single schema issue
    pub fn schema(table: TableKind, column: impl Into<String>, description: impl Into<String>) -> Self {
        Self::Schema(vec![SchemaIssue {
            table,
            column: column.into(),
            description: description.into(),
        }])
    }
}

fn format_issues(issues: &[SchemaIssue]) -> String {
    issues
        .iter()
        .map(|issue| format!("  - {issue}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Result type for UDI engine operations
pub type Result<T> = std::result::Result<T, UdiError>;
