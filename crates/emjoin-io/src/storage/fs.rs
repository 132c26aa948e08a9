use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use emjoin_mem::error::{Error as MemError, Result as MemResult};
use emjoin_mem::Storage;

/// Local filesystem storage. Paths handed in by the page store are already
/// rooted at the configured spill directory.
#[derive(Debug, Clone, Default)]
pub struct FsStorage;

impl FsStorage {
    pub fn new() -> Self {
        Self
    }
}

impl Storage for FsStorage {
    fn write(&self, path: &str, bytes: &[u8]) -> MemResult<()> {
        let p = Path::new(path);
        if let Some(parent) = p.parent() {
            fs::create_dir_all(parent).map_err(|e| MemError::Storage(format!("mkparent: {e}")))?;
        }
        let mut f = File::create(p).map_err(|e| MemError::Storage(format!("create {path}: {e}")))?;
        f.write_all(bytes)
            .map_err(|e| MemError::Storage(format!("write {path}: {e}")))?;
        f.flush()
            .map_err(|e| MemError::Storage(format!("flush {path}: {e}")))?;
        Ok(())
    }

    fn read(&self, path: &str) -> MemResult<Vec<u8>> {
        fs::read(path).map_err(|e| MemError::Storage(format!("read {path}: {e}")))
    }

    fn delete(&self, path: &str) -> MemResult<()> {
        let p = Path::new(path);
        if p.exists() {
            fs::remove_file(p).map_err(|e| MemError::Storage(format!("delete {path}: {e}")))?;
        }
        Ok(())
    }

    fn list(&self, prefix: &str) -> MemResult<Vec<String>> {
        let prefix_path = Path::new(prefix);
        let mut results = Vec::new();

        if !prefix_path.exists() {
            return Ok(results);
        }

        if prefix_path.is_file() {
            if let Some(s) = prefix_path.to_str() {
                results.push(s.to_string());
            }
            return Ok(results);
        }

        fn visit_dirs(dir: &Path, results: &mut Vec<String>) -> std::io::Result<()> {
            for entry in fs::read_dir(dir)? {
                let path = entry?.path();
                if path.is_dir() {
                    visit_dirs(&path, results)?;
                } else if let Some(s) = path.to_str() {
                    results.push(s.to_string());
                }
            }
            Ok(())
        }

        visit_dirs(prefix_path, &mut results)
            .map_err(|e| MemError::Storage(format!("list {prefix}: {e}")))?;
        results.sort();
        Ok(results)
    }

    fn size(&self, path: &str) -> MemResult<u64> {
        let meta = fs::metadata(path).map_err(|e| MemError::Storage(format!("size {path}: {e}")))?;
        Ok(meta.len())
    }
}
