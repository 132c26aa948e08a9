//! Page nested-loop join: the block nested-loop join with one-page blocks.
//!
//! Always runs in three pages (left page, right page, output page),
//! whatever buffer budget the rest of the engine is configured with.

use std::sync::Arc;

use emjoin_core::config::MIN_BUFFERS;
use emjoin_mem::{PageBudgetImpl, PageStore};

use super::nested_loop::NestedLoopIter;
use super::{JoinInputs, JoinType, ResolvedJoin};
use crate::plan::{Footprint, OpPlan};
use crate::traits::{JoinOperator, JoinStream, OpError};

pub struct PageNestedLoopJoin {
    store: Arc<PageStore>,
    join: Arc<ResolvedJoin>,
    budget: PageBudgetImpl,
}

impl PageNestedLoopJoin {
    pub fn new(store: Arc<PageStore>, inputs: JoinInputs) -> Result<Self, OpError> {
        let join = Arc::new(ResolvedJoin::resolve(&store, inputs)?);
        Ok(Self {
            store,
            join,
            budget: PageBudgetImpl::new(MIN_BUFFERS),
        })
    }
}

impl JoinOperator for PageNestedLoopJoin {
    fn name(&self) -> &'static str {
        "join_page_nested_loop"
    }

    fn join_type(&self) -> JoinType {
        JoinType::PageNested
    }

    fn plan(&self) -> Result<OpPlan, OpError> {
        let footprint = Footprint {
            fixed_pages: 2,
            block_pages: 1,
        };
        Ok(OpPlan::new(self.join.output_schema(), footprint).with_keys(self.join.keys()))
    }

    fn open(&self) -> Result<JoinStream, OpError> {
        let iter = NestedLoopIter::open(
            Arc::clone(&self.store),
            Arc::clone(&self.join),
            self.budget.clone(),
            1,
        )?;
        Ok(Box::new(iter))
    }

    fn peak_pages(&self) -> usize {
        self.budget.peak_pages()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{pairs, row, store, table, text};

    #[test]
    fn joins_page_by_page_in_three_buffers() {
        let store = store(2);
        table(&store, "l", vec![row(1, "a"), row(2, "b"), row(1, "c")]);
        table(&store, "r", vec![row(1, "x"), row(3, "z"), row(1, "y")]);

        let op = PageNestedLoopJoin::new(Arc::clone(&store), JoinInputs::new("l", "r", "k", "k"))
            .unwrap();
        let out = op.open().unwrap().collect::<Result<Vec<_>, _>>().unwrap();
        let order: Vec<(String, String)> = out.iter().map(|r| (text(r, 1), text(r, 3))).collect();
        assert_eq!(
            order,
            vec![
                ("a".to_string(), "x".to_string()),
                ("a".to_string(), "y".to_string()),
                ("c".to_string(), "x".to_string()),
                ("c".to_string(), "y".to_string()),
            ]
        );
        assert_eq!(op.peak_pages(), 3);
        assert_eq!(op.plan().unwrap().footprint.total_pages(), 3);
    }

    #[test]
    fn empty_right_yields_nothing() {
        let store = store(2);
        table(&store, "l", vec![row(1, "a")]);
        table(&store, "r", vec![]);
        let op = PageNestedLoopJoin::new(Arc::clone(&store), JoinInputs::new("l", "r", "k", "k"))
            .unwrap();
        assert!(pairs(&op.open().unwrap().collect::<Result<Vec<_>, _>>().unwrap()).is_empty());
    }
}
