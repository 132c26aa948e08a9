//! Shared engine of the block and page nested-loop joins.
//!
//! For each block of left pages: mark the block start, reopen the right
//! input, and for every right record replay the block from the mark,
//! emitting each matching pair. Output order follows storage order: block,
//! then right page, then right record, then left record within the block.
//! Each right page gets a fresh iterator, which stands in for marking the
//! start of its record stream.

use std::sync::Arc;

use emjoin_core::backtrack::BacktrackingIterator;
use emjoin_core::types::Record;
use emjoin_mem::{BlockIter, PageBudgetImpl, PageGuard, PageIter, PageStore};

use super::ResolvedJoin;
use crate::traits::OpError;

struct Block {
    records: BlockIter,
    right_pages: PageIter,
    right_page: Option<BlockIter>,
    right_record: Option<Record>,
    _guard: PageGuard,
}

pub(crate) struct NestedLoopIter {
    store: Arc<PageStore>,
    join: Arc<ResolvedJoin>,
    budget: PageBudgetImpl,
    block_pages: usize,
    left_pages: PageIter,
    block: Option<Block>,
    done: bool,
    _io_guard: PageGuard,
}

impl NestedLoopIter {
    /// Reserve the output and right-input pages, then position on the first
    /// left data page. Blocks are loaded lazily.
    pub fn open(
        store: Arc<PageStore>,
        join: Arc<ResolvedJoin>,
        budget: PageBudgetImpl,
        block_pages: usize,
    ) -> Result<Self, OpError> {
        let io_guard = budget.acquire(2, "nlj_io")?;
        let mut left_pages = store.page_iter(&join.inputs.left_table)?;
        left_pages.skip_header()?;
        let done = store.page_count(&join.inputs.right_table)? == 0;

        Ok(Self {
            store,
            join,
            budget,
            block_pages,
            left_pages,
            block: None,
            done,
            _io_guard: io_guard,
        })
    }

    /// Load the next block of up to `block_pages` left pages.
    /// Returns false once the left input is exhausted.
    fn load_block(&mut self) -> Result<bool, OpError> {
        let mut guard = self.budget.acquire(self.block_pages, "nlj_block")?;
        let mut pages = Vec::with_capacity(self.block_pages);
        while pages.len() < self.block_pages {
            match self.left_pages.next() {
                Some(page) => pages.push(page?),
                None => break,
            }
        }
        if pages.is_empty() {
            return Ok(false);
        }
        guard.try_resize(pages.len());

        let mut records = PageStore::block_iter(pages);
        records.mark();
        let mut right_pages = self.store.page_iter(&self.join.inputs.right_table)?;
        right_pages.skip_header()?;

        tracing::trace!(
            table = %self.join.inputs.left_table,
            pages = records.page_count(),
            records = records.record_count(),
            "loaded join block"
        );
        self.block = Some(Block {
            records,
            right_pages,
            right_page: None,
            right_record: None,
            _guard: guard,
        });
        Ok(true)
    }

    fn step(&mut self) -> Result<Option<Record>, OpError> {
        loop {
            let Some(block) = self.block.as_mut() else {
                if !self.load_block()? {
                    return Ok(None);
                }
                continue;
            };

            if let Some(right) = &block.right_record {
                for left in block.records.by_ref() {
                    if self.join.matches(&left, right) {
                        return Ok(Some(left.concat(right)));
                    }
                }
                block.right_record = None;
            }

            if let Some(record) = block.right_page.as_mut().and_then(Iterator::next) {
                block.records.reset();
                block.right_record = Some(record);
                continue;
            }

            match block.right_pages.next() {
                Some(page) => block.right_page = Some(PageStore::block_iter(vec![page?])),
                // Right input exhausted for this block; release it first.
                None => self.block = None,
            }
        }
    }
}

impl Iterator for NestedLoopIter {
    type Item = Result<Record, OpError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.step() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                self.block = None;
                None
            }
            Err(e) => {
                self.done = true;
                self.block = None;
                Some(Err(e))
            }
        }
    }
}
