//! Block nested-loop join.
//!
//! Holds up to B-2 left pages as one block, plus one right page and one
//! output page. The right input is rescanned once per block.

use std::sync::Arc;

use emjoin_mem::{PageBudgetImpl, PageStore};

use super::nested_loop::NestedLoopIter;
use super::{check_buffers, JoinInputs, JoinType, ResolvedJoin};
use crate::plan::{Footprint, OpPlan};
use crate::traits::{JoinOperator, JoinStream, OpError};

pub struct BlockNestedLoopJoin {
    store: Arc<PageStore>,
    join: Arc<ResolvedJoin>,
    num_buffers: usize,
    budget: PageBudgetImpl,
}

impl BlockNestedLoopJoin {
    pub fn new(store: Arc<PageStore>, inputs: JoinInputs, num_buffers: usize) -> Result<Self, OpError> {
        check_buffers(num_buffers)?;
        let join = Arc::new(ResolvedJoin::resolve(&store, inputs)?);
        Ok(Self {
            store,
            join,
            num_buffers,
            budget: PageBudgetImpl::new(num_buffers),
        })
    }

    /// Left pages per block (B-2).
    pub fn block_pages(&self) -> usize {
        self.num_buffers - 2
    }

    pub fn budget(&self) -> &PageBudgetImpl {
        &self.budget
    }
}

impl JoinOperator for BlockNestedLoopJoin {
    fn name(&self) -> &'static str {
        "join_block_nested_loop"
    }

    fn join_type(&self) -> JoinType {
        JoinType::BlockNested
    }

    fn plan(&self) -> Result<OpPlan, OpError> {
        let footprint = Footprint {
            fixed_pages: 2,
            block_pages: self.block_pages(),
        };
        Ok(OpPlan::new(self.join.output_schema(), footprint).with_keys(self.join.keys()))
    }

    fn open(&self) -> Result<JoinStream, OpError> {
        let iter = NestedLoopIter::open(
            Arc::clone(&self.store),
            Arc::clone(&self.join),
            self.budget.clone(),
            self.block_pages(),
        )?;
        Ok(Box::new(iter))
    }

    fn peak_pages(&self) -> usize {
        self.budget.peak_pages()
    }
}
