#![forbid(unsafe_code)]
//! emjoin-exec: the engine that wires configuration, storage, the page
//! store and the operators together, and the reports it emits per run.

pub mod report;
pub mod runtime;

pub use report::{OutputDigest, RunReport};
pub use runtime::{Engine, ExecError};
