//! Operator planning surfaces: `Footprint` and `OpPlan`.

use emjoin_core::prelude::Schema;
use serde::{Deserialize, Serialize};

/// Pages an operator holds in memory at its peak.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Footprint {
    /// Pages held for the whole run (output page, current input pages).
    pub fixed_pages: usize,
    /// Pages of the reusable in-memory block (nested-loop block, sort group).
    pub block_pages: usize,
}

impl Footprint {
    pub fn total_pages(&self) -> usize {
        self.fixed_pages + self.block_pages
    }
}

/// Operator plan: output schema, key columns, and the page footprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpPlan {
    pub output_schema: Schema,

    /// Key columns by name, left side first.
    pub keys: Vec<String>,

    pub footprint: Footprint,
}

impl OpPlan {
    pub fn new(output_schema: Schema, footprint: Footprint) -> Self {
        Self {
            output_schema,
            keys: vec![],
            footprint,
        }
    }

    pub fn with_keys(mut self, cols: Vec<String>) -> Self {
        self.keys = cols;
        self
    }
}
