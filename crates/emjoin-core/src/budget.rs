//! Abstract page budget interfaces.
//!
//! The concrete implementation lives in `emjoin-mem`. We keep only traits here
//! so any crate can depend on the API without pulling in the store.

/// A guard returned by a page budget when pages are acquired.
///
/// The concrete type lives in `emjoin-mem`. It must be RAII (releases on Drop),
/// `Send`, and `panic`-safe.
pub trait BudgetGuard: Send {
    /// Number of pages currently accounted for by this guard.
    fn pages(&self) -> usize;
    /// Optional debug tag for tracing.
    fn tag(&self) -> &'static str {
        "guard"
    }
}

/// A handle enforcing the buffer budget B of one operator instance.
///
/// Operators call `try_acquire` before pulling pages into memory. If `None`
/// is returned the operator is about to break its memory contract and must
/// fail instead of loading the pages.
pub trait PageBudget: Send + Sync + 'static {
    type Guard: BudgetGuard;

    /// Attempt to acquire `pages` from the live budget. Returns a guard on success.
    fn try_acquire(&self, pages: usize, tag: &'static str) -> Option<Self::Guard>;

    /// Total configured capacity (pages), i.e. B.
    fn capacity_pages(&self) -> usize;

    /// Pages currently held by live guards.
    fn used_pages(&self) -> usize;
}

// NOTE: Do *not* add default impls here that would silently "allow" acquisitions.
// The mem crate is the only place where guards should be constructed.
