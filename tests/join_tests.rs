//! Join strategy tests against a nested-loop reference.

mod test_data_gen;

use emjoin_core::types::Record;
use emjoin_operators::join::{BlockNestedLoopJoin, PageNestedLoopJoin, SortMergeJoin};
use emjoin_operators::{build_join, JoinInputs, JoinOperator, JoinType, OpError};
use test_data_gen::{canonical, create, int_key, kv, kv_schema, memory_store, naive_join, random_kv};

fn inputs() -> JoinInputs {
    JoinInputs::new("l", "r", "lk", "rk")
}

fn run(op: &dyn JoinOperator) -> Vec<Record> {
    op.open()
        .unwrap()
        .collect::<Result<Vec<_>, OpError>>()
        .unwrap()
}

#[test]
fn test_all_strategies_match_reference() {
    for (seed, rpp) in [(1u64, 3usize), (7, 4), (42, 5)] {
        let store = memory_store(rpp);
        let left = random_kv(47, 9, 11, seed);
        let right = random_kv(38, 9, 13, seed + 100);
        create(&store, "l", kv_schema("lk", "lv"), &left);
        create(&store, "r", kv_schema("rk", "rv"), &right);
        let expected = canonical(naive_join(&left, &right, 0, 0));
        assert!(!expected.is_empty());

        for join_type in JoinType::ALL {
            for buffers in [3, 4, 6] {
                let op = build_join(join_type, store.clone(), inputs(), buffers).unwrap();
                let got = canonical(run(op.as_ref()));
                assert_eq!(got, expected, "{join_type} B={buffers} seed={seed}");
                assert!(op.peak_pages() <= buffers, "{join_type} exceeded budget");
            }
        }
        // Inputs are untouched and no temp tables survive.
        assert_eq!(store.tables().unwrap(), vec!["l".to_string(), "r".to_string()]);
    }
}

#[test]
fn test_duplicate_keys_yield_cross_product() {
    let store = memory_store(2);
    let left: Vec<Record> = (0..4).map(|i| kv(Some(5), &format!("l{i}"))).collect();
    let right: Vec<Record> = (0..3).map(|i| kv(Some(5), &format!("r{i}"))).collect();
    create(&store, "l", kv_schema("lk", "lv"), &left);
    create(&store, "r", kv_schema("rk", "rv"), &right);

    for join_type in JoinType::ALL {
        let op = build_join(join_type, store.clone(), inputs(), 3).unwrap();
        assert_eq!(run(op.as_ref()).len(), 12, "{join_type}");
    }
}

#[test]
fn test_null_keys_never_join() {
    let store = memory_store(2);
    let left = vec![kv(None, "a"), kv(Some(1), "b"), kv(None, "c")];
    let right = vec![kv(None, "x"), kv(Some(1), "y")];
    create(&store, "l", kv_schema("lk", "lv"), &left);
    create(&store, "r", kv_schema("rk", "rv"), &right);

    for join_type in JoinType::ALL {
        let op = build_join(join_type, store.clone(), inputs(), 4).unwrap();
        let out = run(op.as_ref());
        assert_eq!(out, vec![kv(Some(1), "b").concat(&kv(Some(1), "y"))], "{join_type}");
    }
}

#[test]
fn test_empty_inputs_produce_nothing() {
    let store = memory_store(2);
    create(&store, "l", kv_schema("lk", "lv"), &[]);
    create(&store, "r", kv_schema("rk", "rv"), &[kv(Some(1), "x")]);

    for join_type in JoinType::ALL {
        let op = build_join(join_type, store.clone(), inputs(), 3).unwrap();
        assert!(run(op.as_ref()).is_empty(), "{join_type} left empty");
        let swapped = build_join(
            join_type,
            store.clone(),
            JoinInputs::new("r", "l", "rk", "lk"),
            3,
        )
        .unwrap();
        assert!(run(swapped.as_ref()).is_empty(), "{join_type} right empty");
    }
}

#[test]
fn test_sort_merge_output_is_key_ordered() {
    let store = memory_store(3);
    let left = random_kv(30, 6, 0, 3);
    let right = random_kv(25, 6, 0, 4);
    create(&store, "l", kv_schema("lk", "lv"), &left);
    create(&store, "r", kv_schema("rk", "rv"), &right);

    let op = SortMergeJoin::new(store.clone(), inputs(), 3).unwrap();
    let keys: Vec<i64> = run(&op).iter().filter_map(|r| int_key(r, 0)).collect();
    assert!(keys.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn test_block_size_follows_budget() {
    let store = memory_store(2);
    create(&store, "l", kv_schema("lk", "lv"), &random_kv(20, 4, 0, 9));
    create(&store, "r", kv_schema("rk", "rv"), &random_kv(20, 4, 0, 10));

    let bnlj = BlockNestedLoopJoin::new(store.clone(), inputs(), 7).unwrap();
    assert_eq!(bnlj.block_pages(), 5);
    let pnlj = PageNestedLoopJoin::new(store.clone(), inputs()).unwrap();
    assert_eq!(pnlj.plan().unwrap().footprint.total_pages(), 3);

    run(&bnlj);
    assert!(bnlj.peak_pages() <= 7);
    run(&pnlj);
    assert!(pnlj.peak_pages() <= 3);
}

#[test]
fn test_unknown_inputs_rejected() {
    let store = memory_store(2);
    create(&store, "l", kv_schema("lk", "lv"), &[]);
    create(&store, "r", kv_schema("rk", "rv"), &[]);

    for join_type in JoinType::ALL {
        let missing_table = build_join(
            join_type,
            store.clone(),
            JoinInputs::new("l", "nope", "lk", "rk"),
            3,
        )
        .and_then(|op| op.open().map(|_| ()));
        assert!(missing_table.is_err(), "{join_type}");

        let missing_column = build_join(
            join_type,
            store.clone(),
            JoinInputs::new("l", "r", "lk", "zz"),
            3,
        )
        .and_then(|op| op.open().map(|_| ()));
        assert!(missing_column.is_err(), "{join_type}");
    }
    assert!(build_join(JoinType::BlockNested, store, inputs(), 2).is_err());
}
