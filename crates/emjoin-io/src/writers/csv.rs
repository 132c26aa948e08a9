use std::fs::File;
use std::io::Write;

use emjoin_core::schema::Schema;
use emjoin_core::types::Record;

use super::{scalar_to_text, RecordWriter};
use crate::error::Result;

/// CSV output with a header row taken from the schema.
pub struct CsvWriter<W: Write> {
    writer: csv::Writer<W>,
    rows: u64,
}

impl CsvWriter<File> {
    pub fn to_path(path: &str, schema: &Schema) -> Result<Self> {
        let f = File::create(path)?;
        Self::to_writer(f, schema)
    }
}

impl<W: Write> CsvWriter<W> {
    pub fn to_writer(out: W, schema: &Schema) -> Result<Self> {
        let mut writer = csv::Writer::from_writer(out);
        writer.write_record(schema.fields.iter().map(|f| f.name.as_str()))?;
        Ok(Self { writer, rows: 0 })
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| crate::error::Error::Io(e.into_error()))
    }
}

impl<W: Write> RecordWriter for CsvWriter<W> {
    fn write_record(&mut self, record: &Record) -> Result<()> {
        self.writer
            .write_record(record.values.iter().map(scalar_to_text))?;
        self.rows += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
