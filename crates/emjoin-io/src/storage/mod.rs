//! Storage adapters implementing `emjoin_mem::Storage`.
//!
//! - `fs`: local filesystem (default).
//! - `MemoryStorage` (crate root): process-local map for `memory://`.
//!
//! `build_storage_from_config` chooses the backend from the configured spill
//! URI (e.g. `file:///tmp/emjoin`, `memory://`, or a bare directory).

mod fs;
pub use fs::FsStorage;

use emjoin_core::config::StorageConfig;
use emjoin_mem::Storage;

use crate::error::{Error, Result};
use crate::memory_storage::MemoryStorage;

/// Build the storage backend for the provided configuration.
pub fn build_storage_from_config(cfg: &StorageConfig) -> Result<Box<dyn Storage>> {
    match cfg.scheme() {
        Some("memory") | Some("mem") => Ok(Box::new(MemoryStorage::new())),
        Some("file") | None => {
            if cfg.root.trim().is_empty() {
                return Err(Error::Config("spill directory must not be empty".into()));
            }
            Ok(Box::new(FsStorage::new()))
        }
        Some(other) => Err(Error::Config(format!("unsupported spill scheme '{other}'"))),
    }
}
