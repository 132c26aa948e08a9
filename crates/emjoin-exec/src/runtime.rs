//! Runtime: build the page store from an `EngineConfig` and run sorts and
//! joins against it.
//!
//! - Storage is chosen from the spill URI (`emjoin-io::build_storage_from_config`).
//! - Every operator gets B = `num_buffers` from the config, except the page
//!   nested-loop join which always runs in three pages.
//! - `run_join`/`run_sort` stream the output into a `RecordWriter` and
//!   return a `RunReport`.

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use emjoin_core::config::EngineConfig;
use emjoin_core::schema::Schema;
use emjoin_core::types::Record;

use emjoin_mem::{Codec, PageStore};

use emjoin_io::readers::{load_csv_path, CsvLoad};
use emjoin_io::storage::build_storage_from_config;
use emjoin_io::writers::RecordWriter;

use emjoin_operators::{
    build_join, column_comparator, ExternalSort, JoinInputs, JoinOperator, JoinStream, JoinType,
    OpError, SortOutcome,
};

use crate::report::{now_millis, OutputDigest, RunReport};

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] emjoin_io::Error),
    #[error(transparent)]
    Operator(#[from] OpError),
    #[error(transparent)]
    Storage(#[from] emjoin_mem::error::Error),
    #[error("digest: {0}")]
    Digest(#[from] serde_json::Error),
}

impl From<emjoin_core::Error> for ExecError {
    fn from(e: emjoin_core::Error) -> Self {
        ExecError::Config(e.to_string())
    }
}

/// Engine owns the page store every table and temp run lives in.
pub struct Engine {
    cfg: EngineConfig,
    store: Arc<PageStore>,
}

impl Engine {
    pub fn new(cfg: EngineConfig) -> Result<Self, ExecError> {
        cfg.validate()?;
        let storage_cfg = cfg.storage_config();
        let storage = build_storage_from_config(&storage_cfg)?;
        let codec = Codec::from_name(&cfg.page_codec)?;
        let store = PageStore::new(storage, codec, &storage_cfg.root, cfg.records_per_page);

        tracing::debug!(
            num_buffers = cfg.num_buffers,
            records_per_page = cfg.records_per_page,
            root = %storage_cfg.root,
            codec = codec.name(),
            "engine ready"
        );
        Ok(Self {
            cfg,
            store: Arc::new(store),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    pub fn store(&self) -> &Arc<PageStore> {
        &self.store
    }

    /// Create a table and fill it from an iterator of records.
    pub fn create_table<I>(&self, name: &str, schema: Schema, records: I) -> Result<(), ExecError>
    where
        I: IntoIterator<Item = Record>,
    {
        self.store.create_table(name, schema)?;
        self.store.add_records(name, records)?;
        self.store.flush(name)?;
        Ok(())
    }

    pub fn load_csv(&self, table: &str, path: impl AsRef<Path>) -> Result<CsvLoad, ExecError> {
        Ok(load_csv_path(&self.store, table, path)?)
    }

    pub fn drop_table(&self, table: &str) -> Result<(), ExecError> {
        self.store.drop_table(table)?;
        Ok(())
    }

    pub fn join_operator(
        &self,
        join_type: JoinType,
        inputs: JoinInputs,
    ) -> Result<Box<dyn JoinOperator>, ExecError> {
        Ok(build_join(
            join_type,
            Arc::clone(&self.store),
            inputs,
            self.cfg.num_buffers,
        )?)
    }

    /// Open a join stream directly.
    pub fn join(&self, join_type: JoinType, inputs: JoinInputs) -> Result<JoinStream, ExecError> {
        Ok(self.join_operator(join_type, inputs)?.open()?)
    }

    /// Sort `table` by `column`; the result is a new table named in the outcome.
    pub fn sort(&self, table: &str, column: &str) -> Result<SortOutcome, ExecError> {
        Ok(self.sorter(table, column)?.sort()?)
    }

    fn sorter(&self, table: &str, column: &str) -> Result<ExternalSort, ExecError> {
        let schema = self.store.schema(table)?;
        let idx = schema.column_index(column)?;
        Ok(ExternalSort::new(
            Arc::clone(&self.store),
            table,
            column_comparator(idx),
            self.cfg.num_buffers,
        )?)
    }

    /// Run a join and write every output record to `sink`.
    pub fn run_join(
        &self,
        join_type: JoinType,
        inputs: JoinInputs,
        sink: &mut dyn RecordWriter,
    ) -> Result<RunReport, ExecError> {
        let started_ms = now_millis();
        let op = self.join_operator(join_type, inputs)?;
        let mut digest = OutputDigest::new();
        for record in op.open()? {
            let record = record?;
            digest.update(&record)?;
            sink.write_record(&record)?;
        }
        sink.finish()?;

        let report = RunReport {
            operation: "join".into(),
            strategy: Some(join_type.short_name().to_string()),
            num_buffers: self.cfg.num_buffers,
            output_records: digest.records(),
            peak_pages: op.peak_pages(),
            sort: None,
            output_digest: digest.finish(),
            started_ms,
            finished_ms: now_millis(),
        };
        tracing::info!(
            strategy = op.name(),
            records = report.output_records,
            peak_pages = report.peak_pages,
            "join finished"
        );
        Ok(report)
    }

    /// Sort a table, write the sorted records to `sink`, then drop the
    /// sorted run.
    pub fn run_sort(
        &self,
        table: &str,
        column: &str,
        sink: &mut dyn RecordWriter,
    ) -> Result<RunReport, ExecError> {
        let started_ms = now_millis();
        let sorter = self.sorter(table, column)?;
        let outcome = sorter.sort()?;

        let mut digest = OutputDigest::new();
        let written = self
            .store
            .record_iter(&outcome.table_name)
            .map_err(ExecError::from)
            .and_then(|records| {
                for record in records {
                    let record = record?;
                    digest.update(&record)?;
                    sink.write_record(&record)?;
                }
                sink.finish()?;
                Ok(())
            });
        if let Err(e) = self.store.drop_table(&outcome.table_name) {
            tracing::warn!(table = %outcome.table_name, error = %e, "failed to drop sorted run");
        }
        written?;

        let report = RunReport {
            operation: "sort".into(),
            strategy: None,
            num_buffers: self.cfg.num_buffers,
            output_records: digest.records(),
            peak_pages: sorter.budget().peak_pages(),
            sort: Some(outcome.stats),
            output_digest: digest.finish(),
            started_ms,
            finished_ms: now_millis(),
        };
        tracing::info!(
            table,
            records = report.output_records,
            initial_runs = outcome.stats.initial_runs,
            merge_passes = outcome.stats.merge_passes,
            "sort finished"
        );
        Ok(report)
    }
}
