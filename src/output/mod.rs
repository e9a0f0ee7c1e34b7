//! Output module for exporting harvested records
//!
//! This module handles:
//! - Writing records as CSV (four fixed columns) or JSON (all fields)
//! - Recording and printing run statistics

mod csv_output;
mod json_output;
pub mod stats;
mod traits;

pub use csv_output::{CsvRecordWriter, CSV_HEADER};
pub use json_output::JsonRecordWriter;
pub use stats::{format_statistics, print_statistics, CrawlStats};
pub use traits::{OutputError, OutputResult, RecordWriter};

use crate::config::OutputFormat;
use crate::crawler::Record;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Writes records to a file in the requested format
///
/// # Arguments
///
/// * `records` - Records in export order
/// * `path` - Destination file, created or truncated
/// * `format` - Export format
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote the file
/// * `Err(OutputError)` - Failed to create or write the file
pub fn export_records(records: &[Record], path: &Path, format: OutputFormat) -> OutputResult<()> {
    if records.is_empty() {
        tracing::warn!("No records to export; writing an empty {:?} file", format);
    }

    let file = BufWriter::new(File::create(path)?);
    match format {
        OutputFormat::Csv => CsvRecordWriter::new(file).write_records(records)?,
        OutputFormat::Json => JsonRecordWriter::new(file).write_records(records)?,
    }

    tracing::info!("Wrote {} records to {}", records.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_export_csv_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("appid.csv");
        let records = vec![Record {
            id: "1".to_string(),
            name: "One".to_string(),
            ..Record::default()
        }];

        export_records(&records, &path, OutputFormat::Csv).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "App ID,App Name,Description,Default Ports\n1,One,,\n");
    }

    #[test]
    fn test_export_json_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("appid.json");

        export_records(&[], &path, OutputFormat::Json).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.trim(), "[]");
    }

    #[test]
    fn test_export_to_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("appid.csv");
        assert!(matches!(
            export_records(&[], &path, OutputFormat::Csv),
            Err(OutputError::Io(_))
        ));
    }
}
