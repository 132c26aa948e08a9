//! External merge sort with run generation and k-way merge.
//!
//! Phase 1 reads the source in groups of up to B pages, sorts each group in
//! memory and writes it out as a run. Phase 2 merges up to B-1 runs at a
//! time (one page per input run plus one output page) until a single run
//! remains.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;

use emjoin_core::config::MIN_BUFFERS;
use emjoin_core::schema::Schema;
use emjoin_core::types::Record;
use emjoin_mem::{PageBudgetImpl, PageStore};
use serde::{Deserialize, Serialize};

use super::run::Run;
use super::RecordComparator;
use crate::traits::OpError;

/// Counters from one `sort()` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortStats {
    pub initial_runs: usize,
    pub merge_passes: usize,
    pub max_fan_in: usize,
    pub records: u64,
}

/// Handle to the final sorted run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortOutcome {
    pub table_name: String,
    pub stats: SortStats,
}

pub struct ExternalSort {
    store: Arc<PageStore>,
    table: String,
    schema: Schema,
    comparator: RecordComparator,
    num_buffers: usize,
    budget: PageBudgetImpl,
}

impl ExternalSort {
    /// Fails if `table` is unknown or `num_buffers` is below 3.
    pub fn new(
        store: Arc<PageStore>,
        table: &str,
        comparator: RecordComparator,
        num_buffers: usize,
    ) -> Result<Self, OpError> {
        if num_buffers < MIN_BUFFERS {
            return Err(OpError::Plan(format!(
                "external sort needs at least {MIN_BUFFERS} buffers, got {num_buffers}"
            )));
        }
        let schema = store
            .schema(table)
            .map_err(|e| OpError::Plan(format!("cannot sort '{table}': {e}")))?;
        Ok(Self {
            store,
            table: table.to_string(),
            schema,
            comparator,
            num_buffers,
            budget: PageBudgetImpl::new(num_buffers),
        })
    }

    /// Account pages against a budget shared with another operator.
    pub fn with_budget(mut self, budget: PageBudgetImpl) -> Self {
        self.budget = budget;
        self
    }

    pub fn budget(&self) -> &PageBudgetImpl {
        &self.budget
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Runs merged per pass.
    pub fn fan_in(&self) -> usize {
        self.num_buffers - 1
    }

    pub fn create_run(&self) -> Result<Run, OpError> {
        Run::create(&self.store, self.schema.clone())
    }

    /// Sort the source table. Returns the name of the table backing the
    /// single sorted run; an empty source still yields one (empty) run.
    pub fn sort(&self) -> Result<SortOutcome, OpError> {
        let mut runs = self.generate_runs()?;
        let records = match runs.iter().map(Run::record_count).sum::<Result<u64, _>>() {
            Ok(records) => records,
            Err(e) => {
                discard_all(runs);
                return Err(e);
            }
        };
        let mut stats = SortStats {
            initial_runs: runs.len(),
            records,
            ..SortStats::default()
        };

        while runs.len() > 1 {
            stats.max_fan_in = stats.max_fan_in.max(self.fan_in().min(runs.len()));
            runs = self.merge_pass(runs)?;
            stats.merge_passes += 1;
            tracing::debug!(
                table = %self.table,
                pass = stats.merge_passes,
                runs = runs.len(),
                "merge pass complete"
            );
        }

        let run = runs
            .pop()
            .ok_or_else(|| OpError::Exec("external sort produced no run".into()))?;
        Ok(SortOutcome {
            table_name: run.table_name().to_string(),
            stats,
        })
    }

    /// Phase 1: one sorted run per group of up to B source pages.
    ///
    /// A storage failure aborts the sort; runs written before it are dropped.
    pub fn generate_runs(&self) -> Result<Vec<Run>, OpError> {
        let mut runs = Vec::new();
        if let Err(e) = self.fill_runs(&mut runs) {
            discard_all(runs);
            return Err(e);
        }
        if runs.is_empty() {
            runs.push(self.create_run()?);
        }
        tracing::debug!(table = %self.table, runs = runs.len(), "generated initial runs");
        Ok(runs)
    }

    fn fill_runs(&self, runs: &mut Vec<Run>) -> Result<(), OpError> {
        let mut pages = self.store.page_iter(&self.table)?;
        pages.skip_header()?;

        loop {
            let mut guard = self.budget.acquire(self.num_buffers, "sort_runs")?;
            let mut records = Vec::new();
            let mut loaded = 0;
            while loaded < self.num_buffers {
                match pages.next() {
                    Some(page) => {
                        records.extend(page?.records);
                        loaded += 1;
                    }
                    None => break,
                }
            }
            if loaded == 0 {
                return Ok(());
            }
            guard.try_resize(loaded);
            runs.push(self.write_sorted(records)?);
        }
    }

    /// Return a new run holding `run`'s records in sorted order.
    /// The whole run must fit in the budget.
    pub fn sort_run(&self, run: &Run) -> Result<Run, OpError> {
        let _guard = self.budget.acquire(run.page_count()?, "sort_run")?;
        let records = run.iter()?.collect::<Result<Vec<_>, _>>()?;
        self.write_sorted(records)
    }

    fn write_sorted(&self, mut records: Vec<Record>) -> Result<Run, OpError> {
        let cmp = &*self.comparator;
        records.sort_by(|a, b| cmp(a, b));
        let run = self.create_run()?;
        run.add_records(records)?;
        Ok(run)
    }

    /// Merge sorted runs into one new sorted run. Inputs are left in place.
    ///
    /// Records that compare equal come out in run order, so merging keeps
    /// the sort stable.
    pub fn merge_sorted_runs(&self, runs: &[Run]) -> Result<Run, OpError> {
        if runs.len() > self.fan_in() {
            return Err(OpError::Plan(format!(
                "cannot merge {} runs with fan-in {}",
                runs.len(),
                self.fan_in()
            )));
        }
        // One page per input run plus the output page.
        let _guard = self.budget.acquire(runs.len() + 1, "sort_merge")?;

        let out = self.create_run()?;
        if let Err(e) = self.merge_into(&out, runs) {
            discard_all(vec![out]);
            return Err(e);
        }
        Ok(out)
    }

    fn merge_into(&self, out: &Run, runs: &[Run]) -> Result<(), OpError> {
        let cmp: &(dyn Fn(&Record, &Record) -> Ordering + Send + Sync) = &*self.comparator;
        let mut iters = runs.iter().map(Run::iter).collect::<Result<Vec<_>, _>>()?;
        let mut heap = BinaryHeap::with_capacity(iters.len());

        for (run_idx, iter) in iters.iter_mut().enumerate() {
            if let Some(record) = iter.next() {
                heap.push(MergeEntry {
                    record: record?,
                    run_idx,
                    cmp,
                });
            }
        }

        while let Some(entry) = heap.pop() {
            let run_idx = entry.run_idx;
            out.add_record(entry.record)?;
            if let Some(record) = iters[run_idx].next() {
                heap.push(MergeEntry {
                    record: record?,
                    run_idx,
                    cmp,
                });
            }
        }
        Ok(())
    }

    /// Merge consecutive groups of up to B-1 runs. The inputs are discarded
    /// once their group is merged.
    ///
    /// If a merge fails, every run of the pass is discarded: outputs already
    /// written, the failing group and the groups still waiting.
    pub fn merge_pass(&self, runs: Vec<Run>) -> Result<Vec<Run>, OpError> {
        let fan_in = self.fan_in();
        let mut merged = Vec::with_capacity(runs.len().div_ceil(fan_in));
        let mut rest = runs;
        while !rest.is_empty() {
            let tail = rest.split_off(fan_in.min(rest.len()));
            let group = std::mem::replace(&mut rest, tail);
            match self.merge_sorted_runs(&group) {
                Ok(run) => {
                    merged.push(run);
                    discard_all(group);
                }
                Err(e) => {
                    discard_all(merged);
                    discard_all(group);
                    discard_all(rest);
                    return Err(e);
                }
            }
        }
        Ok(merged)
    }
}

fn discard_all(runs: Vec<Run>) {
    for run in runs {
        let name = run.table_name().to_string();
        if let Err(e) = run.discard() {
            tracing::warn!(run = %name, error = %e, "failed to discard run");
        }
    }
}

/// Entry in the merge heap.
///
/// Ordered by comparator, then by source run (reversed for min-heap behavior).
struct MergeEntry<'a> {
    record: Record,
    run_idx: usize,
    cmp: &'a (dyn Fn(&Record, &Record) -> Ordering + Send + Sync),
}

impl PartialEq for MergeEntry<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MergeEntry<'_> {}

impl PartialOrd for MergeEntry<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MergeEntry<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.cmp)(&other.record, &self.record).then_with(|| other.run_idx.cmp(&self.run_idx))
    }
}
