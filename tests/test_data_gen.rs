//! Shared table builders and reference results for the integration tests.
#![allow(dead_code)]

use std::cmp::Ordering;
use std::sync::Arc;

use emjoin_core::schema::{DataType, Field, Schema};
use emjoin_core::types::{Record, Scalar};
use emjoin_io::MemoryStorage;
use emjoin_mem::{Codec, PageStore};

/// Small deterministic generator so failures reproduce.
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self(seed.wrapping_mul(6364136223846793005).wrapping_add(1))
    }

    pub fn next_u64(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    pub fn below(&mut self, n: u64) -> u64 {
        self.next_u64() % n
    }
}

pub fn memory_store(records_per_page: usize) -> Arc<PageStore> {
    Arc::new(PageStore::new(
        Box::new(MemoryStorage::new()),
        Codec::None,
        "mem",
        records_per_page,
    ))
}

pub fn kv_schema(key: &str, value: &str) -> Schema {
    Schema::new(vec![
        Field::new(key, DataType::Int64, true),
        Field::new(value, DataType::Utf8, false),
    ])
}

pub fn kv(key: Option<i64>, value: &str) -> Record {
    Record::new(vec![
        key.map_or(Scalar::Null, Scalar::I64),
        Scalar::Str(value.to_string()),
    ])
}

/// `n` records with keys drawn from `0..distinct`, roughly one in
/// `null_every` keys null (0 disables nulls).
pub fn random_kv(n: usize, distinct: u64, null_every: u64, seed: u64) -> Vec<Record> {
    let mut rng = Lcg::new(seed);
    (0..n)
        .map(|i| {
            let key = if null_every > 0 && rng.below(null_every) == 0 {
                None
            } else {
                Some(rng.below(distinct) as i64)
            };
            kv(key, &format!("r{seed}-{i}"))
        })
        .collect()
}

pub fn create(store: &PageStore, name: &str, schema: Schema, records: &[Record]) {
    store.create_table(name, schema).unwrap();
    store.add_records(name, records.iter().cloned()).unwrap();
    store.flush(name).unwrap();
}

pub fn read_all(store: &Arc<PageStore>, name: &str) -> Vec<Record> {
    store
        .record_iter(name)
        .unwrap()
        .collect::<emjoin_mem::error::Result<_>>()
        .unwrap()
}

/// Every (l, r) with matching non-null keys, as concatenated records.
pub fn naive_join(left: &[Record], right: &[Record], lc: usize, rc: usize) -> Vec<Record> {
    let mut out = Vec::new();
    for l in left {
        for r in right {
            if l.values[lc].join_eq(&r.values[rc]) {
                out.push(l.concat(r));
            }
        }
    }
    out
}

fn record_cmp(a: &Record, b: &Record) -> Ordering {
    a.values
        .iter()
        .zip(&b.values)
        .map(|(x, y)| x.total_cmp(y))
        .find(|o| o.is_ne())
        .unwrap_or_else(|| a.values.len().cmp(&b.values.len()))
}

/// Canonical order for comparing outputs as multisets.
pub fn canonical(mut records: Vec<Record>) -> Vec<Record> {
    records.sort_by(record_cmp);
    records
}

pub fn int_key(record: &Record, col: usize) -> Option<i64> {
    match record.values[col] {
        Scalar::I64(k) => Some(k),
        Scalar::Null => None,
        ref other => panic!("unexpected key {other:?}"),
    }
}
