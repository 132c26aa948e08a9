//! Lightweight high-water-mark tracking for page budgets.

use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct PeakTracker {
    peak_pages: AtomicUsize,
}

impl PeakTracker {
    pub fn new() -> Self {
        Self {
            peak_pages: AtomicUsize::new(0),
        }
    }

    /// Record a new "used pages" value; updates peak if higher.
    pub fn record_used(&self, used_pages: usize) {
        let mut cur = self.peak_pages.load(Ordering::Relaxed);
        while used_pages > cur {
            match self.peak_pages.compare_exchange(
                cur,
                used_pages,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(observed) => cur = observed,
            }
        }
        tracing::trace!(
            used_pages,
            peak = self.peak_pages.load(Ordering::Relaxed),
            "page usage"
        );
    }

    pub fn peak(&self) -> usize {
        self.peak_pages.load(Ordering::Relaxed)
    }
}
