//! CSV import with column type inference.
//!
//! The file is scanned twice: once to infer a type per column, once to
//! append typed records to the table. Neither pass holds more than one row.
//! A column is `Int64` if every non-empty cell parses as one, else
//! `Float64`, else `Boolean`, else `Utf8`. Empty cells load as null.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use emjoin_core::schema::{DataType, Field, Schema};
use emjoin_core::types::{Record, Scalar};
use emjoin_mem::PageStore;

use crate::error::{Error, Result};

/// Outcome of loading one file.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvLoad {
    pub table: String,
    pub schema: Schema,
    pub records: u64,
    pub pages: usize,
}

pub fn load_csv_path(store: &PageStore, table: &str, path: impl AsRef<Path>) -> Result<CsvLoad> {
    let path = path.as_ref();
    load_with(store, table, || {
        let file = File::open(path)?;
        Ok(reader(file))
    })
}

pub fn load_csv_str(store: &PageStore, table: &str, data: &str) -> Result<CsvLoad> {
    load_with(store, table, || Ok(reader(data.as_bytes())))
}

fn reader<R: Read>(input: R) -> csv::Reader<R> {
    ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(input)
}

fn load_with<R, F>(store: &PageStore, table: &str, mut open: F) -> Result<CsvLoad>
where
    R: Read,
    F: FnMut() -> Result<csv::Reader<R>>,
{
    let schema = infer_schema(&mut open()?)?;
    store.create_table(table, schema.clone())?;

    let mut rdr = open()?;
    let mut row = StringRecord::new();
    let mut records = 0u64;
    while rdr.read_record(&mut row)? {
        let values = row
            .iter()
            .zip(&schema.fields)
            .map(|(cell, field)| parse_cell(cell, field.data_type))
            .collect::<Result<Vec<_>>>()?;
        store.add_record(table, Record::new(values))?;
        records += 1;
    }
    store.flush(table)?;

    let pages = store.page_count(table)?;
    tracing::debug!(table, records, pages, "loaded csv");
    Ok(CsvLoad {
        table: table.to_string(),
        schema,
        records,
        pages,
    })
}

#[derive(Debug, Clone, Copy)]
struct Candidates {
    seen: bool,
    int: bool,
    float: bool,
    boolean: bool,
}

impl Candidates {
    fn new() -> Self {
        Self {
            seen: false,
            int: true,
            float: true,
            boolean: true,
        }
    }

    fn observe(&mut self, cell: &str) {
        if cell.is_empty() {
            return;
        }
        self.seen = true;
        self.int &= cell.parse::<i64>().is_ok();
        self.float &= cell.parse::<f64>().is_ok();
        self.boolean &= parse_bool(cell).is_some();
    }

    fn resolve(self) -> DataType {
        match self {
            Candidates { seen: false, .. } => DataType::Utf8,
            Candidates { int: true, .. } => DataType::Int64,
            Candidates { float: true, .. } => DataType::Float64,
            Candidates { boolean: true, .. } => DataType::Boolean,
            _ => DataType::Utf8,
        }
    }
}

fn infer_schema<R: Read>(rdr: &mut csv::Reader<R>) -> Result<Schema> {
    let headers = rdr.headers()?.clone();
    if headers.is_empty() {
        return Err(Error::Input("csv input has no header row".into()));
    }

    let mut candidates = vec![Candidates::new(); headers.len()];
    let mut row = StringRecord::new();
    while rdr.read_record(&mut row)? {
        for (cand, cell) in candidates.iter_mut().zip(row.iter()) {
            cand.observe(cell);
        }
    }

    let fields = headers
        .iter()
        .zip(candidates)
        .map(|(name, cand)| Field::new(name, cand.resolve(), true))
        .collect();
    Ok(Schema::new(fields))
}

fn parse_bool(cell: &str) -> Option<bool> {
    if cell.eq_ignore_ascii_case("true") {
        Some(true)
    } else if cell.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Convert one cell to a value of the inferred column type.
pub fn parse_cell(cell: &str, data_type: DataType) -> Result<Scalar> {
    if cell.is_empty() {
        return Ok(Scalar::Null);
    }
    let bad = || Error::Input(format!("cannot read '{cell}' as {data_type:?}"));
    Ok(match data_type {
        DataType::Int64 => Scalar::I64(cell.parse().map_err(|_| bad())?),
        DataType::Int32 => Scalar::I32(cell.parse().map_err(|_| bad())?),
        DataType::Float64 => Scalar::F64(cell.parse().map_err(|_| bad())?),
        DataType::Float32 => Scalar::F32(cell.parse().map_err(|_| bad())?),
        DataType::Boolean => Scalar::Bool(parse_bool(cell).ok_or_else(bad)?),
        DataType::Utf8 => Scalar::Str(cell.to_string()),
        DataType::Binary => Scalar::Bin(cell.as_bytes().to_vec()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStorage;
    use emjoin_mem::Codec;
    use std::sync::Arc;

    fn store() -> Arc<PageStore> {
        Arc::new(PageStore::new(
            Box::new(MemoryStorage::new()),
            Codec::None,
            "mem",
            2,
        ))
    }

    #[test]
    fn infers_column_types_and_loads_nulls() {
        let store = store();
        let data = "id,price,flag,name\n1,2.5,true,a\n2,,false,b\n3,4,TRUE,\n";
        let load = load_csv_str(&store, "items", data).unwrap();

        let types: Vec<DataType> = load.schema.fields.iter().map(|f| f.data_type).collect();
        assert_eq!(
            types,
            vec![DataType::Int64, DataType::Float64, DataType::Boolean, DataType::Utf8]
        );
        assert_eq!(load.records, 3);
        assert_eq!(load.pages, 2);

        let rows: Vec<Record> = store
            .record_iter("items")
            .unwrap()
            .collect::<emjoin_mem::error::Result<_>>()
            .unwrap();
        assert_eq!(rows[1].values[1], Scalar::Null);
        assert_eq!(rows[2].values[1], Scalar::F64(4.0));
        assert_eq!(rows[2].values[3], Scalar::Null);
    }

    #[test]
    fn header_only_file_gives_empty_table() {
        let store = store();
        let load = load_csv_str(&store, "empty", "a,b\n").unwrap();
        assert_eq!(load.records, 0);
        assert_eq!(load.schema.len(), 2);
        assert_eq!(store.record_count("empty").unwrap(), 0);
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let store = store();
        let err = load_csv_str(&store, "bad", "a,b\n1,2\n3\n").unwrap_err();
        assert!(matches!(err, Error::Csv(_)));
    }

    #[test]
    fn loads_from_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        std::fs::write(&path, "k,v\n1,x\n2,y\n").unwrap();

        let store = store();
        let load = load_csv_path(&store, "t", &path).unwrap();
        assert_eq!(load.records, 2);
        assert_eq!(store.schema("t").unwrap().index_of("v"), Some(1));
    }
}
