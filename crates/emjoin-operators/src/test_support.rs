//! Fixtures shared by unit tests in this crate.

use std::sync::Arc;

use emjoin_core::schema::{DataType, Field, Schema};
use emjoin_core::types::{Record, Scalar};
use emjoin_io::MemoryStorage;
use emjoin_mem::{Codec, PageStore};

pub fn store(records_per_page: usize) -> Arc<PageStore> {
    Arc::new(PageStore::new(
        Box::new(MemoryStorage::new()),
        Codec::None,
        "mem",
        records_per_page,
    ))
}

pub fn kv_schema() -> Schema {
    Schema::new(vec![
        Field::new("k", DataType::Int64, true),
        Field::new("v", DataType::Utf8, true),
    ])
}

pub fn row(k: i64, v: &str) -> Record {
    Record::new(vec![Scalar::I64(k), Scalar::Str(v.to_string())])
}

pub fn null_row(v: &str) -> Record {
    Record::new(vec![Scalar::Null, Scalar::Str(v.to_string())])
}

/// Create table `name` with `kv_schema` and fill it.
pub fn table(store: &Arc<PageStore>, name: &str, rows: Vec<Record>) {
    store.create_table(name, kv_schema()).unwrap();
    store.add_records(name, rows).unwrap();
}

pub fn key_of(r: &Record) -> i64 {
    match r.values[0] {
        Scalar::I64(k) => k,
        ref other => panic!("unexpected key {other:?}"),
    }
}

pub fn text(r: &Record, col: usize) -> String {
    match &r.values[col] {
        Scalar::Str(s) => s.clone(),
        other => panic!("unexpected value {other:?}"),
    }
}

/// Keys of a fallible record stream, panicking on the first error.
pub fn keys<I, E>(it: I) -> Vec<i64>
where
    I: Iterator<Item = Result<Record, E>>,
    E: std::fmt::Debug,
{
    it.map(|r| key_of(&r.unwrap())).collect()
}

/// Joined (left value, right value) pairs from a kv x kv join, sorted.
pub fn pairs(records: &[Record]) -> Vec<(String, String)> {
    let mut out: Vec<(String, String)> = records.iter().map(|r| (text(r, 1), text(r, 3))).collect();
    out.sort();
    out
}
