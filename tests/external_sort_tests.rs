//! External sort operator tests

mod test_data_gen;

use std::collections::HashMap;

use emjoin_core::types::Record;
use emjoin_operators::{column_comparator, ExternalSort};
use test_data_gen::{canonical, create, int_key, kv, kv_schema, memory_store, random_kv, read_all};

fn ceil_log(base: usize, n: usize) -> usize {
    let mut passes = 0;
    let mut runs = n;
    while runs > 1 {
        runs = runs.div_ceil(base);
        passes += 1;
    }
    passes
}

fn verify_sorted(records: &[Record]) -> bool {
    records
        .windows(2)
        .all(|w| w[0].values[0].total_cmp(&w[1].values[0]).is_le())
}

#[test]
fn test_sort_is_ordered_permutation() {
    for (buffers, rpp) in [(3usize, 2usize), (4, 3), (5, 1), (8, 4)] {
        let store = memory_store(rpp);
        let input = random_kv(73, 20, 9, buffers as u64);
        create(&store, "t", kv_schema("k", "v"), &input);

        let sorter = ExternalSort::new(store.clone(), "t", column_comparator(0), buffers).unwrap();
        let outcome = sorter.sort().unwrap();
        let output = read_all(&store, &outcome.table_name);

        assert!(verify_sorted(&output), "B={buffers} rpp={rpp}");
        assert_eq!(canonical(output), canonical(input.clone()));
        assert_eq!(outcome.stats.records, input.len() as u64);
        assert!(sorter.budget().peak_pages() <= buffers);

        let pages = input.len().div_ceil(rpp);
        let initial_runs = pages.div_ceil(buffers);
        assert_eq!(outcome.stats.initial_runs, initial_runs);
        assert_eq!(outcome.stats.merge_passes, ceil_log(buffers - 1, initial_runs));
        assert!(outcome.stats.max_fan_in <= buffers - 1);
    }
}

#[test]
fn test_sort_empty_table() {
    let store = memory_store(4);
    create(&store, "t", kv_schema("k", "v"), &[]);
    let sorter = ExternalSort::new(store.clone(), "t", column_comparator(0), 3).unwrap();
    let outcome = sorter.sort().unwrap();
    assert!(read_all(&store, &outcome.table_name).is_empty());
    assert_eq!(outcome.stats.merge_passes, 0);
}

#[test]
fn test_sort_output_rereads_identically() {
    let store = memory_store(3);
    create(&store, "t", kv_schema("k", "v"), &random_kv(40, 7, 0, 5));
    let sorter = ExternalSort::new(store.clone(), "t", column_comparator(0), 3).unwrap();
    let outcome = sorter.sort().unwrap();
    let first = read_all(&store, &outcome.table_name);
    let second = read_all(&store, &outcome.table_name);
    assert_eq!(first, second);
}

#[test]
fn test_sort_keeps_input_order_among_equal_keys() {
    let store = memory_store(2);
    let input = random_kv(60, 4, 0, 77);
    create(&store, "t", kv_schema("k", "v"), &input);

    let sorter = ExternalSort::new(store.clone(), "t", column_comparator(0), 3).unwrap();
    let output = read_all(&store, &sorter.sort().unwrap().table_name);

    // Values are unique, so they identify each input position.
    let position: HashMap<String, usize> = input
        .iter()
        .enumerate()
        .map(|(i, r)| (format!("{:?}", r.values[1]), i))
        .collect();
    let pos = |r: &Record| position[&format!("{:?}", r.values[1])];
    for pair in output.windows(2) {
        if int_key(&pair[0], 0) == int_key(&pair[1], 0) {
            assert!(pos(&pair[0]) < pos(&pair[1]));
        }
    }
}

#[test]
fn test_sort_leaves_only_result_and_source() {
    let store = memory_store(1);
    let input: Vec<Record> = (0..30).rev().map(|i| kv(Some(i), "v")).collect();
    create(&store, "t", kv_schema("k", "v"), &input);

    let sorter = ExternalSort::new(store.clone(), "t", column_comparator(0), 3).unwrap();
    let outcome = sorter.sort().unwrap();
    assert!(outcome.stats.merge_passes >= 3);

    let mut expected = vec!["t".to_string(), outcome.table_name.clone()];
    expected.sort();
    assert_eq!(store.tables().unwrap(), expected);
    assert_eq!(read_all(&store, "t"), input);
}

#[test]
fn test_sort_rejects_tiny_budget() {
    let store = memory_store(2);
    create(&store, "t", kv_schema("k", "v"), &[]);
    assert!(ExternalSort::new(store.clone(), "t", column_comparator(0), 2).is_err());
    assert!(ExternalSort::new(store, "missing", column_comparator(0), 3).is_err());
}
