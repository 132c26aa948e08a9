#![forbid(unsafe_code)]
//! emjoin-core: shared vocabulary for the join and sort operators.
//!
//! Pure data and interfaces only. Paged storage, guards, and iterators over
//! stored tables live in `emjoin-mem`; the algorithms live in
//! `emjoin-operators`.

pub mod backtrack;
pub mod budget;
pub mod config;
pub mod error;
pub mod id;
pub mod prelude;
pub mod schema;
pub mod types;

pub use error::{Error, Result};
