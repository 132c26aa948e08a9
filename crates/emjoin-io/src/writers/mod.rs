//! Streaming record writers for operator output.

pub mod csv;
pub mod jsonl;

use std::io::Write;
use std::str::FromStr;

use emjoin_core::schema::Schema;
use emjoin_core::types::{Record, Scalar};

use crate::error::{Error, Result};

pub use self::csv::CsvWriter;
pub use self::jsonl::JsonlWriter;

/// Sink for output records.
pub trait RecordWriter {
    fn write_record(&mut self, record: &Record) -> Result<()>;

    /// Flush buffered output. Further writes are still allowed.
    fn finish(&mut self) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Jsonl,
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "jsonl" | "ndjson" | "json" => Ok(OutputFormat::Jsonl),
            other => Err(Error::Config(format!("unknown output format '{other}'"))),
        }
    }
}

/// Open a writer of the requested format; CSV writes the header immediately.
pub fn open_writer<W: Write + 'static>(
    format: OutputFormat,
    schema: &Schema,
    out: W,
) -> Result<Box<dyn RecordWriter>> {
    Ok(match format {
        OutputFormat::Csv => Box::new(CsvWriter::to_writer(out, schema)?),
        OutputFormat::Jsonl => Box::new(JsonlWriter::to_writer(out, schema)),
    })
}

/// Text form of a value for delimited output. Null is the empty string.
pub(crate) fn scalar_to_text(v: &Scalar) -> String {
    use Scalar::*;
    match v {
        Null => String::new(),
        Bool(b) => b.to_string(),
        I32(i) => i.to_string(),
        I64(i) => i.to_string(),
        F32(f) => f.to_string(),
        F64(f) => f.to_string(),
        Str(s) => s.clone(),
        Bin(b) => b.iter().map(|byte| format!("{byte:02x}")).collect(),
    }
}
