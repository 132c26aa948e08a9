//! Convenient re-exports for downstream crates.

pub use crate::backtrack::BacktrackingIterator;
pub use crate::budget::{BudgetGuard, PageBudget};
pub use crate::config::EngineConfig;
pub use crate::error::{Error, Result};
pub use crate::id::{PageNo, TempTableId};
pub use crate::schema::{DataType, Field, Schema};
pub use crate::types::{Record, Scalar};
