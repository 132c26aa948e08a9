//! Paged table store used by the join and sort operators.
//!
//! Tables are sequences of fixed-capacity pages written to a byte-level
//! `Storage` backend, one segment per page. Page 0 is a header page holding
//! the table's schema. Appends are buffered in a tail page that is written
//! once full (or on `flush`), so operators only ever see whole pages.

pub mod codec;
pub mod iter;
pub mod page;
pub mod segment;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use emjoin_core::id::{PageNo, TempTableId};
use emjoin_core::schema::Schema;
use emjoin_core::types::Record;

use crate::error::{Error, Result};

pub use codec::Codec;
pub use iter::{BlockIter, PageIter, TableRecordIter};
pub use page::{Page, TableHeader};
pub use segment::{SegmentHeader, SegmentMeta, HEADER_LEN};

/// Abstract byte-object storage underneath the page store.
///
/// Implemented by `emjoin-io::FsStorage` for a local directory and by
/// `emjoin-io::MemoryStorage` for tests and scratch work.
pub trait Storage: Send + Sync {
    /// Write bytes to a path, replacing any previous object.
    fn write(&self, path: &str, bytes: &[u8]) -> Result<()>;

    /// Read the whole object at a path.
    fn read(&self, path: &str) -> Result<Vec<u8>>;

    /// Delete a path. Idempotent (no error if path doesn't exist).
    fn delete(&self, path: &str) -> Result<()>;

    /// List all paths under a prefix.
    fn list(&self, prefix: &str) -> Result<Vec<String>>;

    /// Size of a path in bytes.
    fn size(&self, path: &str) -> Result<u64>;
}

struct TableEntry {
    schema: Schema,
    header: SegmentMeta,
    /// Written data pages; entry `i` is page number `i + 1`.
    pages: Vec<SegmentMeta>,
    /// Records not yet on a full page.
    tail: Vec<Record>,
    /// Whether `tail` was already written (as the last entry of `pages`) by a flush.
    tail_written: bool,
    records: u64,
}

/// Central manager for named tables and their pages.
///
/// Responsibilities:
/// - Create named and temporary tables with a fixed schema
/// - Buffer appends into pages and write them as checksummed segments
/// - Open page and record iterators for operators
pub struct PageStore {
    storage: Box<dyn Storage>,
    codec: Codec,
    root_dir: String,
    records_per_page: usize,
    next_temp: AtomicU64,
    tables: Mutex<HashMap<String, TableEntry>>,
}

impl PageStore {
    /// Create a new store. `records_per_page` is clamped to at least one.
    pub fn new(
        storage: Box<dyn Storage>,
        codec: Codec,
        root_dir: impl Into<String>,
        records_per_page: usize,
    ) -> Self {
        Self {
            storage,
            codec,
            root_dir: root_dir.into(),
            records_per_page: records_per_page.max(1),
            next_temp: AtomicU64::new(0),
            tables: Mutex::new(HashMap::new()),
        }
    }

    pub fn records_per_page(&self) -> usize {
        self.records_per_page
    }

    pub fn codec(&self) -> Codec {
        self.codec
    }

    fn catalog(&self) -> Result<MutexGuard<'_, HashMap<String, TableEntry>>> {
        self.tables
            .lock()
            .map_err(|_| Error::Storage("table catalog lock poisoned".into()))
    }

    /// Register a table and write its header page.
    pub fn create_table(&self, name: &str, schema: Schema) -> Result<()> {
        let mut tables = self.catalog()?;
        if tables.contains_key(name) {
            return Err(Error::TableExists(name.to_string()));
        }

        let header = TableHeader {
            name: name.to_string(),
            schema: schema.clone(),
            records_per_page: self.records_per_page,
        };
        let path = segment::segment_path(&self.root_dir, name, PageNo::HEADER);
        let (bytes, meta) = segment::encode(self.codec, PageNo::HEADER, path, &header)?;
        self.storage.write(&meta.path, &bytes)?;

        tables.insert(
            name.to_string(),
            TableEntry {
                schema,
                header: meta,
                pages: Vec::new(),
                tail: Vec::new(),
                tail_written: false,
                records: 0,
            },
        );
        tracing::debug!(table = name, "created table");
        Ok(())
    }

    /// Create a fresh temporary table and return its generated name.
    pub fn create_temp_table(&self, schema: Schema) -> Result<String> {
        let id = TempTableId::new(self.next_temp.fetch_add(1, Ordering::Relaxed));
        let name = id.table_name();
        self.create_table(&name, schema)?;
        Ok(name)
    }

    pub fn contains(&self, name: &str) -> Result<bool> {
        Ok(self.catalog()?.contains_key(name))
    }

    /// Names of all live tables, sorted.
    pub fn tables(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.catalog()?.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    pub fn schema(&self, name: &str) -> Result<Schema> {
        let tables = self.catalog()?;
        let entry = tables
            .get(name)
            .ok_or_else(|| Error::TableNotFound(name.to_string()))?;
        Ok(entry.schema.clone())
    }

    /// Append one record. It becomes visible to iterators opened afterwards.
    pub fn add_record(&self, name: &str, record: Record) -> Result<()> {
        let mut tables = self.catalog()?;
        let entry = tables
            .get_mut(name)
            .ok_or_else(|| Error::TableNotFound(name.to_string()))?;

        if record.len() != entry.schema.len() {
            return Err(Error::Arity {
                table: name.to_string(),
                expected: entry.schema.len(),
                got: record.len(),
            });
        }

        entry.tail.push(record);
        entry.records += 1;
        if entry.tail.len() >= self.records_per_page {
            self.write_tail(name, entry)?;
            entry.tail.clear();
            entry.tail_written = false;
        }
        Ok(())
    }

    pub fn add_records<I>(&self, name: &str, records: I) -> Result<()>
    where
        I: IntoIterator<Item = Record>,
    {
        for record in records {
            self.add_record(name, record)?;
        }
        Ok(())
    }

    /// Write a partially filled tail page so iterators can see it.
    ///
    /// Later appends keep filling the same page and rewrite it.
    pub fn flush(&self, name: &str) -> Result<()> {
        let mut tables = self.catalog()?;
        let entry = tables
            .get_mut(name)
            .ok_or_else(|| Error::TableNotFound(name.to_string()))?;
        if !entry.tail.is_empty() {
            self.write_tail(name, entry)?;
            entry.tail_written = true;
        }
        Ok(())
    }

    fn write_tail(&self, name: &str, entry: &mut TableEntry) -> Result<()> {
        let page_count = entry.pages.len() as u32;
        let page_no = if entry.tail_written {
            PageNo::new(page_count)
        } else {
            PageNo::new(page_count + 1)
        };

        let page = Page::new(page_no, entry.tail.clone());
        let path = segment::segment_path(&self.root_dir, name, page_no);
        let (bytes, meta) = segment::encode(self.codec, page_no, path, &page)?;
        self.storage.write(&meta.path, &bytes)?;

        if entry.tail_written {
            if let Some(last) = entry.pages.last_mut() {
                *last = meta;
            }
        } else {
            entry.pages.push(meta);
        }
        tracing::trace!(table = name, page = page_no.get(), records = page.len(), "wrote page");
        Ok(())
    }

    /// Number of data pages (header excluded), after flushing the tail.
    pub fn page_count(&self, name: &str) -> Result<usize> {
        self.flush(name)?;
        let tables = self.catalog()?;
        let entry = tables
            .get(name)
            .ok_or_else(|| Error::TableNotFound(name.to_string()))?;
        Ok(entry.pages.len())
    }

    pub fn record_count(&self, name: &str) -> Result<u64> {
        let tables = self.catalog()?;
        let entry = tables
            .get(name)
            .ok_or_else(|| Error::TableNotFound(name.to_string()))?;
        Ok(entry.records)
    }

    /// Read one page from storage. Page 0 yields the (record-less) header page
    /// after checking it belongs to `name`.
    pub fn read_page(&self, name: &str, page_no: PageNo) -> Result<Page> {
        let meta = {
            let tables = self.catalog()?;
            let entry = tables
                .get(name)
                .ok_or_else(|| Error::TableNotFound(name.to_string()))?;
            if page_no.is_header() {
                entry.header.clone()
            } else {
                entry
                    .pages
                    .get(page_no.get() as usize - 1)
                    .cloned()
                    .ok_or_else(|| {
                        Error::Storage(format!("table '{name}' has no page {}", page_no.get()))
                    })?
            }
        };

        let bytes = self.storage.read(&meta.path)?;
        if page_no.is_header() {
            let header: TableHeader = segment::decode(&bytes, &meta)?;
            if header.name != name {
                return Err(Error::Storage(format!(
                    "header of '{name}' names table '{}'",
                    header.name
                )));
            }
            Ok(Page::header())
        } else {
            segment::decode(&bytes, &meta)
        }
    }

    /// Open a page iterator over `name`. The header page comes first.
    pub fn page_iter(self: &Arc<Self>, name: &str) -> Result<PageIter> {
        let data_pages = self.page_count(name)?;
        Ok(PageIter::new(Arc::clone(self), name, data_pages as u32))
    }

    /// Open a mark/reset-capable iterator over every record of `name`.
    pub fn record_iter(self: &Arc<Self>, name: &str) -> Result<TableRecordIter> {
        let mut pages = self.page_iter(name)?;
        pages.skip_header()?;
        Ok(TableRecordIter::new(pages))
    }

    /// Open a mark/reset-capable iterator over an in-memory block of pages.
    pub fn block_iter(pages: Vec<Page>) -> BlockIter {
        BlockIter::new(pages)
    }

    /// Remove a table and delete its pages from storage.
    pub fn drop_table(&self, name: &str) -> Result<()> {
        let entry = self
            .catalog()?
            .remove(name)
            .ok_or_else(|| Error::TableNotFound(name.to_string()))?;
        self.storage.delete(&entry.header.path)?;
        for meta in &entry.pages {
            self.storage.delete(&meta.path)?;
        }
        tracing::debug!(table = name, pages = entry.pages.len(), "dropped table");
        Ok(())
    }
}
