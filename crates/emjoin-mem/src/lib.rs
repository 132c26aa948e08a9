#![forbid(unsafe_code)]
//! emjoin-mem: page budgeting and the paged table store.
//!
//! This crate provides concrete implementations for the *interfaces* defined
//! in `emjoin-core::budget` and `emjoin-core::backtrack`. Every page an
//! operator holds in memory is accounted against a `PageBudgetImpl` through an
//! RAII guard, so the buffer budget B is enforced rather than assumed.
//!
//! No filesystem or object-store IO lives here. A byte-level `Storage` trait is
//! exposed (in `store::`) and implemented by `emjoin-io`.

pub mod error;
pub mod guard;
pub mod store;
pub mod tracking;

pub use guard::{PageBudgetImpl, PageGuard};
pub use store::{BlockIter, Codec, Page, PageIter, PageStore, Storage, TableRecordIter};
pub use tracking::PeakTracker;
