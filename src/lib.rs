//! emjoin: bounded-memory joins and external sort over paged tables.
//!
//! Umbrella crate re-exporting the workspace members. Most users want
//! `Engine` plus `EngineConfig`:
//!
//! ```no_run
//! use emjoin::{Engine, EngineConfig, JoinInputs, JoinType};
//!
//! let engine = Engine::new(EngineConfig::default()).unwrap();
//! engine.load_csv("emp", "emp.csv").unwrap();
//! engine.load_csv("dept", "dept.csv").unwrap();
//! let rows = engine
//!     .join(JoinType::SortMerge, JoinInputs::new("emp", "dept", "dept", "id"))
//!     .unwrap();
//! for row in rows {
//!     println!("{:?}", row.unwrap());
//! }
//! ```

pub use emjoin_core;
pub use emjoin_exec;
pub use emjoin_io;
pub use emjoin_mem;
pub use emjoin_operators;

pub use emjoin_core::config::EngineConfig;
pub use emjoin_exec::{Engine, ExecError, RunReport};
pub use emjoin_operators::{JoinInputs, JoinType};
