//! Equi-join strategies.
//!
//! - `block_nested`: block nested-loop join, blocks of B-2 left pages.
//! - `page_nested`: the one-page-block specialization, fixed 3-page budget.
//! - `sort_merge`: external sort of both sides, then a merge with mark/reset
//!   replay of duplicate right groups.

pub mod block_nested;
mod nested_loop;
pub mod page_nested;
pub mod sort_merge;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use emjoin_core::config::MIN_BUFFERS;
use emjoin_core::schema::Schema;
use emjoin_core::types::{Record, Scalar};
use emjoin_mem::PageStore;
use serde::{Deserialize, Serialize};

use crate::traits::{JoinOperator, OpError};

pub use block_nested::BlockNestedLoopJoin;
pub use page_nested::PageNestedLoopJoin;
pub use sort_merge::SortMergeJoin;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoinType {
    BlockNested,
    PageNested,
    SortMerge,
}

impl JoinType {
    pub const ALL: [JoinType; 3] = [JoinType::BlockNested, JoinType::PageNested, JoinType::SortMerge];

    pub fn short_name(&self) -> &'static str {
        match self {
            JoinType::BlockNested => "bnlj",
            JoinType::PageNested => "pnlj",
            JoinType::SortMerge => "smj",
        }
    }
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

impl FromStr for JoinType {
    type Err = OpError;

    fn from_str(s: &str) -> Result<Self, OpError> {
        match s.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "bnlj" | "blocknested" | "blocknestedloop" => Ok(JoinType::BlockNested),
            "pnlj" | "pagenested" | "pagenestedloop" => Ok(JoinType::PageNested),
            "smj" | "sortmerge" => Ok(JoinType::SortMerge),
            _ => Err(OpError::Plan(format!(
                "unknown join strategy '{s}' (expected bnlj, pnlj or smj)"
            ))),
        }
    }
}

/// Two named inputs and the join column on each side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinInputs {
    pub left_table: String,
    pub right_table: String,
    pub left_column: String,
    pub right_column: String,
}

impl JoinInputs {
    pub fn new(
        left_table: impl Into<String>,
        right_table: impl Into<String>,
        left_column: impl Into<String>,
        right_column: impl Into<String>,
    ) -> Self {
        Self {
            left_table: left_table.into(),
            right_table: right_table.into(),
            left_column: left_column.into(),
            right_column: right_column.into(),
        }
    }
}

/// Inputs resolved against the store's catalog.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedJoin {
    pub inputs: JoinInputs,
    pub left_schema: Schema,
    pub right_schema: Schema,
    pub left_idx: usize,
    pub right_idx: usize,
}

impl ResolvedJoin {
    pub fn resolve(store: &PageStore, inputs: JoinInputs) -> Result<Self, OpError> {
        let left_schema = input_schema(store, &inputs.left_table)?;
        let right_schema = input_schema(store, &inputs.right_table)?;
        let left_idx = column(&left_schema, &inputs.left_table, &inputs.left_column)?;
        let right_idx = column(&right_schema, &inputs.right_table, &inputs.right_column)?;

        let lt = left_schema.fields[left_idx].data_type;
        let rt = right_schema.fields[right_idx].data_type;
        if lt != rt {
            return Err(OpError::Schema(format!(
                "join columns have different types: {}.{} is {lt:?}, {}.{} is {rt:?}",
                inputs.left_table, inputs.left_column, inputs.right_table, inputs.right_column
            )));
        }

        Ok(Self {
            inputs,
            left_schema,
            right_schema,
            left_idx,
            right_idx,
        })
    }

    pub fn output_schema(&self) -> Schema {
        self.left_schema.join(&self.right_schema)
    }

    pub fn keys(&self) -> Vec<String> {
        vec![
            self.inputs.left_column.clone(),
            self.inputs.right_column.clone(),
        ]
    }

    pub fn matches(&self, left: &Record, right: &Record) -> bool {
        key(left, self.left_idx).join_eq(key(right, self.right_idx))
    }
}

fn input_schema(store: &PageStore, table: &str) -> Result<Schema, OpError> {
    store
        .schema(table)
        .map_err(|e| OpError::Plan(format!("cannot join '{table}': {e}")))
}

fn column(schema: &Schema, table: &str, name: &str) -> Result<usize, OpError> {
    schema
        .column_index(name)
        .map_err(|_| OpError::Schema(format!("table '{table}' has no column '{name}'")))
}

pub(crate) fn key(record: &Record, idx: usize) -> &Scalar {
    record.get(idx).unwrap_or(&Scalar::Null)
}

pub(crate) fn check_buffers(num_buffers: usize) -> Result<(), OpError> {
    if num_buffers < MIN_BUFFERS {
        return Err(OpError::Plan(format!(
            "join needs at least {MIN_BUFFERS} buffers, got {num_buffers}"
        )));
    }
    Ok(())
}

/// Construct the requested join strategy over two stored tables.
///
/// `num_buffers` is B; the page nested-loop join ignores it.
pub fn build_join(
    join_type: JoinType,
    store: Arc<PageStore>,
    inputs: JoinInputs,
    num_buffers: usize,
) -> Result<Box<dyn JoinOperator>, OpError> {
    Ok(match join_type {
        JoinType::BlockNested => Box::new(BlockNestedLoopJoin::new(store, inputs, num_buffers)?),
        JoinType::PageNested => Box::new(PageNestedLoopJoin::new(store, inputs)?),
        JoinType::SortMerge => Box::new(SortMergeJoin::new(store, inputs, num_buffers)?),
    })
}
