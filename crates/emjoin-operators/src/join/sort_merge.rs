//! Sort-merge join.
//!
//! Both inputs are sorted on their join column with `ExternalSort` (sharing
//! this operator's budget), then merged. When a key repeats on both sides,
//! the right iterator is marked at the start of the right group and reset
//! for every further left record with the same key, so the whole group's
//! cross product comes out. Output is ordered by key, then left order, then
//! right order.
//!
//! The right group is replayed from memory while its pages fit in what the
//! budget has left after the merge's three pages. A larger group is read back
//! from the sorted table on every reset.

use std::cmp::Ordering;
use std::sync::Arc;

use emjoin_core::backtrack::BacktrackingIterator;
use emjoin_core::types::Record;
use emjoin_mem::{PageBudgetImpl, PageGuard, PageStore, TableRecordIter};

use super::{check_buffers, key, JoinInputs, JoinType, ResolvedJoin};
use crate::plan::{Footprint, OpPlan};
use crate::sort::{column_comparator, ExternalSort};
use crate::traits::{JoinOperator, JoinStream, OpError};

pub struct SortMergeJoin {
    store: Arc<PageStore>,
    join: Arc<ResolvedJoin>,
    num_buffers: usize,
    budget: PageBudgetImpl,
}

impl SortMergeJoin {
    pub fn new(store: Arc<PageStore>, inputs: JoinInputs, num_buffers: usize) -> Result<Self, OpError> {
        check_buffers(num_buffers)?;
        let join = Arc::new(ResolvedJoin::resolve(&store, inputs)?);
        Ok(Self {
            store,
            join,
            num_buffers,
            budget: PageBudgetImpl::new(num_buffers),
        })
    }

    fn sort_side(&self, table: &str, column: usize) -> Result<String, OpError> {
        let outcome = ExternalSort::new(
            Arc::clone(&self.store),
            table,
            column_comparator(column),
            self.num_buffers,
        )?
        .with_budget(self.budget.clone())
        .sort()?;
        tracing::debug!(
            table,
            sorted = %outcome.table_name,
            runs = outcome.stats.initial_runs,
            passes = outcome.stats.merge_passes,
            "sorted join input"
        );
        Ok(outcome.table_name)
    }
}

impl JoinOperator for SortMergeJoin {
    fn name(&self) -> &'static str {
        "join_sort_merge"
    }

    fn join_type(&self) -> JoinType {
        JoinType::SortMerge
    }

    fn plan(&self) -> Result<OpPlan, OpError> {
        // The sort phase dominates: B pages for run generation and merging.
        let footprint = Footprint {
            fixed_pages: 1,
            block_pages: self.num_buffers - 1,
        };
        Ok(OpPlan::new(self.join.output_schema(), footprint).with_keys(self.join.keys()))
    }

    fn open(&self) -> Result<JoinStream, OpError> {
        let left = self.sort_side(&self.join.inputs.left_table, self.join.left_idx)?;
        let right = match self.sort_side(&self.join.inputs.right_table, self.join.right_idx) {
            Ok(name) => name,
            Err(e) => {
                drop_sorted(&self.store, &left);
                return Err(e);
            }
        };
        let mut iter = SortMergeIter::new(Arc::clone(&self.store), &self.join, [left, right]);
        iter.start(&self.budget)?;
        Ok(Box::new(iter))
    }

    fn peak_pages(&self) -> usize {
        self.budget.peak_pages()
    }
}

fn drop_sorted(store: &PageStore, table: &str) {
    if let Err(e) = store.drop_table(table) {
        tracing::warn!(table, error = %e, "failed to drop sorted join input");
    }
}

/// Merge order of two join keys. A null key never matches, so a null on the
/// left advances the left side and a null on the right advances the right.
fn key_order(left: &Record, left_idx: usize, right: &Record, right_idx: usize) -> Ordering {
    let (l, r) = (key(left, left_idx), key(right, right_idx));
    if l.is_null() {
        Ordering::Less
    } else if r.is_null() {
        Ordering::Greater
    } else {
        l.total_cmp(r)
    }
}

enum Step {
    Emit(Record),
    RightExhausted,
    AdvanceLeft,
    AdvanceRight,
}

struct SortMergeIter {
    store: Arc<PageStore>,
    left_idx: usize,
    right_idx: usize,
    left_iter: Option<TableRecordIter>,
    right_iter: Option<TableRecordIter>,
    left: Option<Record>,
    right: Option<Record>,
    /// Inside a run of equal keys; the right iterator is marked at its start.
    in_group: bool,
    done: bool,
    sorted_tables: [String; 2],
    _guard: Option<PageGuard>,
}

impl SortMergeIter {
    fn new(store: Arc<PageStore>, join: &ResolvedJoin, sorted_tables: [String; 2]) -> Self {
        Self {
            store,
            left_idx: join.left_idx,
            right_idx: join.right_idx,
            left_iter: None,
            right_iter: None,
            left: None,
            right: None,
            in_group: false,
            done: false,
            sorted_tables,
            _guard: None,
        }
    }

    fn start(&mut self, budget: &PageBudgetImpl) -> Result<(), OpError> {
        // Current left page, current right page, output page. Extra pages of
        // the right replay window are charged to the same budget.
        self._guard = Some(budget.acquire(3, "smj_merge")?);
        let mut left_iter = self.store.record_iter(&self.sorted_tables[0])?;
        let mut right_iter = self
            .store
            .record_iter(&self.sorted_tables[1])?
            .with_budget(budget);
        self.left = left_iter.next().transpose()?;
        self.right = right_iter.next().transpose()?;
        self.left_iter = Some(left_iter);
        self.right_iter = Some(right_iter);
        Ok(())
    }

    fn left_iter(&mut self) -> Result<&mut TableRecordIter, OpError> {
        self.left_iter
            .as_mut()
            .ok_or_else(|| OpError::Exec("sort-merge join used before start".into()))
    }

    fn right_iter(&mut self) -> Result<&mut TableRecordIter, OpError> {
        self.right_iter
            .as_mut()
            .ok_or_else(|| OpError::Exec("sort-merge join used before start".into()))
    }

    fn advance_left(&mut self) -> Result<(), OpError> {
        self.left = self.left_iter()?.next().transpose()?;
        Ok(())
    }

    fn advance_right(&mut self) -> Result<(), OpError> {
        self.right = self.right_iter()?.next().transpose()?;
        Ok(())
    }

    /// The right group is used up for the current left record: replay it
    /// for the next left record.
    fn end_group(&mut self) -> Result<(), OpError> {
        self.right_iter()?.reset();
        self.advance_right()?;
        self.advance_left()?;
        self.in_group = false;
        Ok(())
    }

    fn step(&mut self) -> Result<Option<Record>, OpError> {
        loop {
            let step = match (&self.left, &self.right) {
                (None, _) => return Ok(None),
                (Some(_), None) => Step::RightExhausted,
                (Some(l), Some(r)) => match key_order(l, self.left_idx, r, self.right_idx) {
                    Ordering::Equal => Step::Emit(l.concat(r)),
                    Ordering::Less => Step::AdvanceLeft,
                    Ordering::Greater => Step::AdvanceRight,
                },
            };

            match step {
                Step::Emit(record) => {
                    if !self.in_group {
                        self.right_iter()?.mark();
                        self.in_group = true;
                    }
                    self.advance_right()?;
                    return Ok(Some(record));
                }
                _ if self.in_group => self.end_group()?,
                Step::RightExhausted => return Ok(None),
                Step::AdvanceLeft => self.advance_left()?,
                Step::AdvanceRight => {
                    // Left has moved past any marked group; free its pages.
                    self.right_iter()?.unmark();
                    self.advance_right()?;
                }
            }
        }
    }
}

impl Iterator for SortMergeIter {
    type Item = Result<Record, OpError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.step() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl Drop for SortMergeIter {
    fn drop(&mut self) {
        for table in &self.sorted_tables {
            drop_sorted(&self.store, table);
        }
    }
}
