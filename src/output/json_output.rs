//! JSON export with every harvested field

use crate::crawler::Record;
use crate::output::traits::{OutputResult, RecordWriter};
use std::io::Write;

/// Writes records as a pretty-printed JSON array
pub struct JsonRecordWriter<W: Write> {
    writer: W,
}

impl<W: Write> JsonRecordWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> RecordWriter for JsonRecordWriter<W> {
    fn write_records(&mut self, records: &[Record]) -> OutputResult<()> {
        serde_json::to_writer_pretty(&mut self.writer, records)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}
