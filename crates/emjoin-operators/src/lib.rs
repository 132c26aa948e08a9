#![forbid(unsafe_code)]
//! emjoin-operators: join and sort operators that run under a page budget.
//!
//! Design intent:
//! - Pull-based and synchronous. Nothing runs until the consumer asks for the
//!   next record, and abandoning a stream midway is always safe.
//! - Every page an operator holds in memory is covered by a `PageGuard` from
//!   its own `PageBudgetImpl` of capacity B.
//! - Each operator exposes a planning surface (`OpPlan`) with its page
//!   footprint so callers can check it against B before running.

pub mod plan;
pub mod traits;

pub mod join;
pub mod sort;

#[cfg(test)]
pub(crate) mod test_support;

pub use join::{build_join, JoinInputs, JoinType};
pub use plan::{Footprint, OpPlan};
pub use sort::{column_comparator, ExternalSort, RecordComparator, Run, SortOutcome, SortStats};
pub use traits::{JoinOperator, JoinStream, OpError};
