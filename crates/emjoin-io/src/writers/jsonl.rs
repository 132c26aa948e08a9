//! Streaming NDJSON writer.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};

use emjoin_core::schema::Schema;
use emjoin_core::types::{Record, Scalar};

use super::RecordWriter;
use crate::error::Result;

/// One JSON object per record, keyed by column name.
pub struct JsonlWriter<W: Write> {
    writer: BufWriter<W>,
    columns: Vec<String>,
}

impl JsonlWriter<File> {
    pub fn to_path(path: &str, schema: &Schema) -> Result<Self> {
        let f = File::create(path)?;
        Ok(Self::to_writer(f, schema))
    }
}

impl<W: Write> JsonlWriter<W> {
    pub fn to_writer(writer: W, schema: &Schema) -> Self {
        Self {
            writer: BufWriter::new(writer),
            columns: schema.fields.iter().map(|f| f.name.clone()).collect(),
        }
    }
}

impl<W: Write> RecordWriter for JsonlWriter<W> {
    fn write_record(&mut self, record: &Record) -> Result<()> {
        let obj: BTreeMap<&str, serde_json::Value> = self
            .columns
            .iter()
            .map(String::as_str)
            .zip(record.values.iter().map(scalar_to_json))
            .collect();
        serde_json::to_writer(&mut self.writer, &obj)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

fn scalar_to_json(v: &Scalar) -> serde_json::Value {
    use Scalar::*;
    match v {
        Null => serde_json::Value::Null,
        Bool(b) => serde_json::Value::Bool(*b),
        I32(i) => serde_json::Value::from(*i),
        I64(i) => serde_json::Value::from(*i),
        F32(f) => serde_json::Value::from(*f as f64),
        F64(f) => serde_json::Value::from(*f),
        Str(s) => serde_json::Value::String(s.clone()),
        Bin(b) => serde_json::Value::String(format!("[binary {} bytes]", b.len())),
    }
}
