//! Sorted (or not yet sorted) runs backed by temp tables.
//!
//! A run is appended to once, then only iterated. Superseded runs are
//! discarded by the sort so their pages can be reclaimed.

use std::sync::Arc;

use emjoin_core::schema::Schema;
use emjoin_core::types::Record;
use emjoin_mem::{PageStore, TableRecordIter};

use crate::traits::OpError;

#[derive(Clone)]
pub struct Run {
    store: Arc<PageStore>,
    table: String,
}

impl Run {
    /// Create an empty run in a fresh temp table.
    pub fn create(store: &Arc<PageStore>, schema: Schema) -> Result<Self, OpError> {
        let table = store.create_temp_table(schema)?;
        Ok(Self {
            store: Arc::clone(store),
            table,
        })
    }

    pub fn add_record(&self, record: Record) -> Result<(), OpError> {
        self.store.add_record(&self.table, record)?;
        Ok(())
    }

    pub fn add_records<I>(&self, records: I) -> Result<(), OpError>
    where
        I: IntoIterator<Item = Record>,
    {
        self.store.add_records(&self.table, records)?;
        Ok(())
    }

    /// Records in append order. Every call starts from the beginning.
    pub fn iter(&self) -> Result<TableRecordIter, OpError> {
        Ok(self.store.record_iter(&self.table)?)
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    pub fn page_count(&self) -> Result<usize, OpError> {
        Ok(self.store.page_count(&self.table)?)
    }

    pub fn record_count(&self) -> Result<u64, OpError> {
        Ok(self.store.record_count(&self.table)?)
    }

    /// Drop the backing temp table.
    pub fn discard(self) -> Result<(), OpError> {
        self.store.drop_table(&self.table)?;
        Ok(())
    }
}

impl std::fmt::Debug for Run {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Run").field("table", &self.table).finish()
    }
}
