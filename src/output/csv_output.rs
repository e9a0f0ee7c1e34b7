//! CSV export
//!
//! Writes the fixed four-column table: identifier, name, description and the
//! comma-joined default ports.

use crate::crawler::Record;
use crate::output::traits::{OutputResult, RecordWriter};
use std::io::Write;

/// Column header of the CSV export
pub const CSV_HEADER: [&str; 4] = ["App ID", "App Name", "Description", "Default Ports"];

/// Writes records as CSV rows
pub struct CsvRecordWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> CsvRecordWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: csv::WriterBuilder::new()
                .terminator(csv::Terminator::Any(b'\n'))
                .from_writer(inner),
        }
    }
}

impl<W: Write> RecordWriter for CsvRecordWriter<W> {
    fn write_records(&mut self, records: &[Record]) -> OutputResult<()> {
        self.writer.write_record(CSV_HEADER)?;
        for record in records {
            self.writer.write_record([
                record.id.as_str(),
                record.name.as_str(),
                record.description.as_str(),
                record.ports_joined().as_str(),
            ])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
