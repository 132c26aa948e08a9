//! External merge sort over stored tables.

pub mod external;
pub mod run;

use std::cmp::Ordering;
use std::sync::Arc;

use emjoin_core::types::Record;

pub use external::{ExternalSort, SortOutcome, SortStats};
pub use run::Run;

/// Total order over records used by the sort.
pub type RecordComparator = Arc<dyn Fn(&Record, &Record) -> Ordering + Send + Sync>;

/// Order records by one column under `Scalar::total_cmp` (nulls first).
pub fn column_comparator(column: usize) -> RecordComparator {
    Arc::new(move |a: &Record, b: &Record| a.cmp_on(column, b, column))
}
