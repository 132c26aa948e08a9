//! Join-operator capability and the shared error type.
//!
//! Callers pick a strategy (see `join::build_join`), ask it for a `plan()`,
//! then `open()` it to get a lazy stream of joined records.

use emjoin_core::types::Record;
use thiserror::Error;

use crate::join::JoinType;
use crate::plan::OpPlan;

/// Lazy stream of joined records.
///
/// `None` means the join is finished. A storage fault is yielded once as
/// `Some(Err(..))` and the stream returns `None` afterwards.
pub type JoinStream = Box<dyn Iterator<Item = Result<Record, OpError>> + Send>;

#[derive(Debug, Error)]
pub enum OpError {
    #[error("planning error: {0}")]
    Plan(String),

    #[error("execution error: {0}")]
    Exec(String),

    #[error("schema error: {0}")]
    Schema(String),

    #[error(transparent)]
    Storage(#[from] emjoin_mem::error::Error),

    #[error(transparent)]
    Core(#[from] emjoin_core::Error),
}

/// Trait that all join strategies implement.
///
/// Invariants:
/// - Implementations hold pages in memory only under a guard from their own
///   budget, and the budget's peak never exceeds B.
/// - `open` can be called repeatedly; each call starts a fresh scan.
pub trait JoinOperator: Send + Sync {
    /// Human-readable operator name (stable).
    fn name(&self) -> &'static str;

    fn join_type(&self) -> JoinType;

    /// Output schema and page footprint.
    fn plan(&self) -> Result<OpPlan, OpError>;

    /// Start the join. Fails if an input cannot be opened (or sorted).
    fn open(&self) -> Result<JoinStream, OpError>;

    /// Highest number of pages this operator has held at once.
    fn peak_pages(&self) -> usize;
}
