//! Run reports: what an operator did and a digest of what it produced.
//!
//! The digest covers the output records in order, so two runs over the same
//! inputs and configuration yield the same digest.

use std::time::{SystemTime, UNIX_EPOCH};

use emjoin_core::types::Record;
use emjoin_operators::SortStats;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// `sort` or `join`.
    pub operation: String,

    /// Join strategy short name (`bnlj`, `pnlj`, `smj`).
    pub strategy: Option<String>,

    pub num_buffers: usize,
    pub output_records: u64,

    /// Highest number of pages the operator held at once.
    pub peak_pages: usize,

    pub sort: Option<SortStats>,

    /// Hex blake3 digest of the output records in order.
    pub output_digest: String,

    /// Milliseconds since Unix epoch (UTC).
    pub started_ms: u64,
    pub finished_ms: u64,
}

impl RunReport {
    pub fn elapsed_ms(&self) -> u64 {
        self.finished_ms.saturating_sub(self.started_ms)
    }
}

/// Incremental digest over a record stream.
pub struct OutputDigest {
    hasher: blake3::Hasher,
    records: u64,
}

impl Default for OutputDigest {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputDigest {
    pub fn new() -> Self {
        Self {
            hasher: blake3::Hasher::new(),
            records: 0,
        }
    }

    pub fn update(&mut self, record: &Record) -> Result<(), serde_json::Error> {
        let bytes = serde_json::to_vec(record)?;
        self.hasher.update(&(bytes.len() as u64).to_le_bytes());
        self.hasher.update(&bytes);
        self.records += 1;
        Ok(())
    }

    pub fn records(&self) -> u64 {
        self.records
    }

    pub fn finish(&self) -> String {
        self.hasher.finalize().to_hex().to_string()
    }
}

pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
