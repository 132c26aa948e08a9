//! Mark/reset behaviour of the record iterators the joins rely on.

mod test_data_gen;

use emjoin_core::backtrack::BacktrackingIterator;
use emjoin_core::types::Record;
use emjoin_mem::PageStore;
use test_data_gen::{create, int_key, kv, kv_schema, memory_store};

fn keys(records: &[Record]) -> Vec<i64> {
    records.iter().filter_map(|r| int_key(r, 0)).collect()
}

#[test]
fn test_table_iter_replays_group_repeatedly() {
    let store = memory_store(2);
    let rows: Vec<Record> = (0..9).map(|i| kv(Some(i), "v")).collect();
    create(&store, "t", kv_schema("k", "v"), &rows);

    let mut it = store.record_iter("t").unwrap();
    for _ in 0..3 {
        it.next().unwrap().unwrap();
    }
    it.mark();
    let ahead: Vec<Record> = it.by_ref().take(3).map(|r| r.unwrap()).collect();
    assert_eq!(keys(&ahead), vec![3, 4, 5]);
    for _ in 0..2 {
        it.reset();
        let group: Vec<Record> = it.by_ref().take(4).map(|r| r.unwrap()).collect();
        assert_eq!(keys(&group), vec![2, 3, 4, 5]);
    }
    it.unmark();
    it.reset();
    let rest: Vec<Record> = it.by_ref().map(|r| r.unwrap()).collect();
    assert_eq!(keys(&rest), vec![6, 7, 8]);
}

#[test]
fn test_reset_without_mark_is_noop() {
    let store = memory_store(3);
    create(&store, "t", kv_schema("k", "v"), &[kv(Some(1), "a"), kv(Some(2), "b")]);
    let mut it = store.record_iter("t").unwrap();
    it.next().unwrap().unwrap();
    it.reset();
    assert_eq!(it.next().unwrap().unwrap(), kv(Some(2), "b"));
    assert!(it.next().is_none());
}

#[test]
fn test_block_iter_mark_at_start() {
    let store = memory_store(2);
    let rows: Vec<Record> = (0..5).map(|i| kv(Some(i), "v")).collect();
    create(&store, "t", kv_schema("k", "v"), &rows);

    let mut pages = store.page_iter("t").unwrap();
    pages.skip_header().unwrap();
    let block = pages.map(|p| p.unwrap()).collect();
    let mut it = PageStore::block_iter(block);
    it.mark();
    let first: Vec<Record> = it.by_ref().collect();
    it.reset();
    let second: Vec<Record> = it.by_ref().collect();
    assert_eq!(first, rows);
    assert_eq!(second, rows);
}
