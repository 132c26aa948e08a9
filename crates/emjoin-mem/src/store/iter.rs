//! Page and record iterators handed to operators.
//!
//! - `PageIter`: forward-only pages of a stored table, header page first.
//! - `BlockIter`: records of an in-memory array of pages, with mark/reset.
//! - `TableRecordIter`: records of a stored table, with mark/reset served
//!   from a window of the pages read since the mark, optionally charged to a
//!   page budget.

use std::sync::Arc;

use emjoin_core::backtrack::BacktrackingIterator;
use emjoin_core::budget::PageBudget;
use emjoin_core::id::PageNo;
use emjoin_core::types::Record;

use super::{Page, PageStore};
use crate::error::{Error, Result};
use crate::guard::{PageBudgetImpl, PageGuard};

/// Pages of one table in storage order. The first item is the header page.
///
/// A storage failure is yielded once; the iterator is fused afterwards.
pub struct PageIter {
    store: Arc<PageStore>,
    table: String,
    next: PageNo,
    last: u32,
    failed: bool,
}

impl PageIter {
    pub(crate) fn new(store: Arc<PageStore>, table: &str, data_pages: u32) -> Self {
        Self {
            store,
            table: table.to_string(),
            next: PageNo::HEADER,
            last: data_pages,
            failed: false,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub(crate) fn next_page(&self) -> PageNo {
        self.next
    }

    /// Continue from `page`. A fault already reported keeps the iterator fused.
    pub(crate) fn seek(&mut self, page: PageNo) {
        self.next = page;
    }

    /// Pages not yet returned (including the header if still pending).
    pub fn remaining(&self) -> usize {
        if self.failed {
            return 0;
        }
        (self.last + 1).saturating_sub(self.next.get()) as usize
    }

    /// Consume and validate the header page if it has not been read yet.
    pub fn skip_header(&mut self) -> Result<()> {
        if !self.next.is_header() {
            return Ok(());
        }
        match self.next() {
            Some(Ok(page)) if page.is_header() => Ok(()),
            Some(Ok(page)) => Err(Error::Storage(format!(
                "table '{}' starts with data page {}",
                self.table,
                page.number.get()
            ))),
            Some(Err(e)) => Err(e),
            None => Err(Error::Storage(format!(
                "table '{}' has no header page",
                self.table
            ))),
        }
    }
}

impl Iterator for PageIter {
    type Item = Result<Page>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.next.get() > self.last {
            return None;
        }
        let page_no = self.next;
        self.next = page_no.next();
        match self.store.read_page(&self.table, page_no) {
            Ok(page) => Some(Ok(page)),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

/// Position of a record: (page index, slot index).
type Pos = (usize, usize);

/// Records of a block of pages already held in memory.
#[derive(Debug, Clone)]
pub struct BlockIter {
    pages: Vec<Page>,
    cursor: Pos,
    last: Option<Pos>,
    mark: Option<Pos>,
}

impl BlockIter {
    pub fn new(pages: Vec<Page>) -> Self {
        Self {
            pages,
            cursor: (0, 0),
            last: None,
            mark: None,
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn record_count(&self) -> usize {
        self.pages.iter().map(Page::len).sum()
    }
}

impl Iterator for BlockIter {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        while let Some(page) = self.pages.get(self.cursor.0) {
            if let Some(record) = page.records.get(self.cursor.1) {
                self.last = Some(self.cursor);
                self.cursor.1 += 1;
                return Some(record.clone());
            }
            self.cursor = (self.cursor.0 + 1, 0);
        }
        None
    }
}

impl BacktrackingIterator for BlockIter {
    fn mark(&mut self) {
        self.mark = Some(self.last.unwrap_or((0, 0)));
    }

    fn reset(&mut self) {
        if let Some(pos) = self.mark {
            self.cursor = pos;
            self.last = None;
        }
    }

    fn unmark(&mut self) {
        self.mark = None;
    }
}

/// Position of a stored record: (data page number, slot index).
type TablePos = (u32, usize);

/// Records of a stored table in page order.
///
/// Without a mark only the current page is held. With a mark, every page
/// from the marked one onwards stays in the window so `reset` can replay
/// without touching storage.
///
/// An iterator opened `with_budget` charges each window page past the
/// current one to that budget. When the budget cannot cover another page,
/// the window falls back to the current page only and a later `reset` reads
/// the marked page back from storage.
pub struct TableRecordIter {
    pages: PageIter,
    window: Vec<Page>,
    cursor: TablePos,
    last: Option<TablePos>,
    mark: Option<TablePos>,
    window_guard: Option<PageGuard>,
    failed: bool,
}

impl TableRecordIter {
    pub(crate) fn new(pages: PageIter) -> Self {
        Self {
            pages,
            window: Vec::new(),
            cursor: (PageNo::HEADER.next().get(), 0),
            last: None,
            mark: None,
            window_guard: None,
            failed: false,
        }
    }

    /// Account replay pages beyond the current one against `budget`.
    pub fn with_budget(mut self, budget: &PageBudgetImpl) -> Self {
        self.window_guard = budget.try_acquire(0, "replay_window");
        self
    }

    pub fn table(&self) -> &str {
        self.pages.table()
    }

    /// Pages currently held for replay.
    pub fn window_pages(&self) -> usize {
        self.window.len()
    }

    fn window_index(&self, page: u32) -> Option<usize> {
        let first = self.window.first()?.number.get();
        let idx = page.checked_sub(first)? as usize;
        (idx < self.window.len()).then_some(idx)
    }

    /// Resize the window guard to the pages held past the first one.
    fn charge_window(&mut self) -> bool {
        let extra = self.window.len().saturating_sub(1);
        self.window_guard
            .as_mut()
            .map_or(true, |guard| guard.try_resize(extra))
    }

    fn release_before(&mut self, page: u32) {
        let stale = self
            .window
            .iter()
            .take_while(|p| p.number.get() < page)
            .count();
        self.window.drain(..stale);
        self.charge_window();
    }

    fn load(&mut self, page: Page) {
        if self.mark.is_none() {
            self.window.clear();
        }
        self.window.push(page);
        if !self.charge_window() {
            let spilled = self.window.len() - 1;
            tracing::debug!(
                table = self.pages.table(),
                pages = spilled,
                "replay window over budget, reset will re-read"
            );
            self.window.drain(..spilled);
            self.charge_window();
        }
    }
}

impl Iterator for TableRecordIter {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(idx) = self.window_index(self.cursor.0) {
                if let Some(record) = self.window[idx].records.get(self.cursor.1) {
                    let record = record.clone();
                    self.last = Some(self.cursor);
                    self.cursor.1 += 1;
                    return Some(Ok(record));
                }
                self.cursor = (self.cursor.0 + 1, 0);
                continue;
            }

            if self.failed {
                return None;
            }
            if self.pages.next_page().get() != self.cursor.0 {
                self.pages.seek(PageNo::new(self.cursor.0));
            }
            match self.pages.next()? {
                Ok(page) => self.load(page),
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

impl BacktrackingIterator for TableRecordIter {
    fn mark(&mut self) {
        let pos = self.last.unwrap_or(self.cursor);
        self.mark = Some(pos);
        // Pages before the marked one can never be replayed again.
        self.release_before(pos.0);
    }

    fn reset(&mut self) {
        if let Some(pos) = self.mark {
            if self.window_index(pos.0).is_none() {
                self.window.clear();
                self.charge_window();
            }
            self.cursor = pos;
            self.last = None;
        }
    }

    fn unmark(&mut self) {
        if self.mark.take().is_none() {
            return;
        }
        let keep_from = self.last.map_or(self.cursor.0, |(page, _)| page);
        self.release_before(keep_from);
    }
}
