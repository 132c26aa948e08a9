//! IO layer for emjoin.
//!
//! - `storage`: byte-level backends under the page store (filesystem, memory).
//! - `readers`: load delimited files into stored tables.
//! - `writers`: stream joined or sorted records out as CSV or NDJSON.

pub mod error;
pub mod memory_storage;
pub mod readers;
pub mod storage;
pub mod writers;

pub use error::{Error, Result};
pub use memory_storage::MemoryStorage;
pub use storage::{build_storage_from_config, FsStorage};
