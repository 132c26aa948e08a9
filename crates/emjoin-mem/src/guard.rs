//! PageBudget + RAII guard implementations.
//!
//! Operators must *always* acquire a guard before pulling pages into memory.
//! Dropping the guard returns the pages to the budget (panic-safe).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use emjoin_core::budget::{BudgetGuard, PageBudget};

use crate::error::{Error, Result};
use crate::tracking::PeakTracker;

/// Shared inner state for the budget.
#[derive(Debug)]
struct BudgetInner {
    capacity: usize,
    used: AtomicUsize,
    peak: PeakTracker,
}

impl BudgetInner {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            used: AtomicUsize::new(0),
            peak: PeakTracker::new(),
        }
    }

    fn try_acquire(&self, pages: usize) -> bool {
        loop {
            let cur = self.used.load(Ordering::Relaxed);
            let next = cur.saturating_add(pages);
            if next > self.capacity {
                return false;
            }
            if self
                .used
                .compare_exchange(cur, next, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                self.peak.record_used(next);
                return true;
            }
        }
    }

    fn release(&self, pages: usize) {
        self.used.fetch_sub(pages, Ordering::AcqRel);
    }
}

/// Buffer budget B of one operator instance. Clones share the same counters.
#[derive(Debug, Clone)]
pub struct PageBudgetImpl {
    inner: Arc<BudgetInner>,
}

impl PageBudgetImpl {
    pub fn new(capacity_pages: usize) -> Self {
        Self {
            inner: Arc::new(BudgetInner::new(capacity_pages)),
        }
    }

    /// Highest number of pages held at once since creation.
    pub fn peak_pages(&self) -> usize {
        self.inner.peak.peak()
    }

    /// Like `try_acquire`, but reports the shortfall as an error.
    pub fn acquire(&self, pages: usize, tag: &'static str) -> Result<PageGuard> {
        self.try_acquire(pages, tag)
            .ok_or_else(|| Error::BudgetExceeded {
                tag,
                requested: pages,
                capacity: self.capacity_pages(),
                used: self.used_pages(),
            })
    }
}

/// RAII guard that accounts for a number of pages.
/// Dropping it returns pages to the budget.
#[derive(Debug)]
pub struct PageGuard {
    inner: Arc<BudgetInner>,
    pages: usize,
    tag: &'static str,
}

impl Drop for PageGuard {
    fn drop(&mut self) {
        if self.pages > 0 {
            self.inner.release(self.pages);
            // NOTE: do not log here to keep drop path fast.
            self.pages = 0;
        }
    }
}

// ----- trait impls -----

impl BudgetGuard for PageGuard {
    fn pages(&self) -> usize {
        self.pages
    }
    fn tag(&self) -> &'static str {
        self.tag
    }
}

impl PageGuard {
    /// Try to resize this guard to a new page count.
    /// Shrinking always succeeds; growing fails if it would exceed capacity.
    pub fn try_resize(&mut self, new_pages: usize) -> bool {
        if new_pages == self.pages {
            return true;
        }

        if new_pages < self.pages {
            let delta = self.pages - new_pages;
            self.inner.release(delta);
            self.pages = new_pages;
            true
        } else {
            let delta = new_pages - self.pages;
            if self.inner.try_acquire(delta) {
                self.pages = new_pages;
                true
            } else {
                false
            }
        }
    }
}

impl PageBudget for PageBudgetImpl {
    type Guard = PageGuard;

    fn try_acquire(&self, pages: usize, tag: &'static str) -> Option<Self::Guard> {
        if pages == 0 || self.inner.try_acquire(pages) {
            Some(PageGuard {
                inner: Arc::clone(&self.inner),
                pages,
                tag,
            })
        } else {
            None
        }
    }

    fn capacity_pages(&self) -> usize {
        self.inner.capacity
    }

    fn used_pages(&self) -> usize {
        self.inner.used.load(Ordering::Relaxed)
    }
}
