//! Output writer traits and errors
//!
//! This module defines the interface export formats implement and the
//! errors they can raise.

use crate::crawler::Record;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Something harvested records can be written to
pub trait RecordWriter {
    /// Writes all records, in order, and flushes
    fn write_records(&mut self, records: &[Record]) -> OutputResult<()>;
}
