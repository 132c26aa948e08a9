//! In-memory storage backend.
//!
//! HashMap-based storage behind the `memory://` spill URI. Used by tests and
//! by short-lived CLI runs that do not need pages on disk.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use emjoin_mem::error::{Error as MemError, Result as MemResult};
use emjoin_mem::Storage;

/// Thread-safe in-memory storage. Clones share the same objects.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    data: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn objects(&self) -> MemResult<MutexGuard<'_, HashMap<String, Vec<u8>>>> {
        self.data
            .lock()
            .map_err(|_| MemError::Storage("memory storage lock poisoned".into()))
    }

    pub fn contains(&self, path: &str) -> bool {
        self.objects()
            .map(|data| data.contains_key(path))
            .unwrap_or(false)
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects().map(|data| data.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total bytes held across all objects.
    pub fn total_bytes(&self) -> u64 {
        self.objects()
            .map(|data| data.values().map(|v| v.len() as u64).sum())
            .unwrap_or(0)
    }
}

impl Storage for MemoryStorage {
    fn write(&self, path: &str, bytes: &[u8]) -> MemResult<()> {
        self.objects()?.insert(path.to_string(), bytes.to_vec());
        Ok(())
    }

    fn read(&self, path: &str) -> MemResult<Vec<u8>> {
        self.objects()?
            .get(path)
            .cloned()
            .ok_or_else(|| MemError::Storage(format!("path not found: {path}")))
    }

    fn delete(&self, path: &str) -> MemResult<()> {
        self.objects()?.remove(path);
        Ok(())
    }

    fn list(&self, prefix: &str) -> MemResult<Vec<String>> {
        let mut result: Vec<String> = self
            .objects()?
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        result.sort();
        Ok(result)
    }

    fn size(&self, path: &str) -> MemResult<u64> {
        self.objects()?
            .get(path)
            .map(|bytes| bytes.len() as u64)
            .ok_or_else(|| MemError::Storage(format!("path not found: {path}")))
    }
}
