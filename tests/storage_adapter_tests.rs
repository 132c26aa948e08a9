mod test_data_gen;

use std::sync::Arc;

use emjoin_core::config::EngineConfig;
use emjoin_core::id::PageNo;
use emjoin_io::storage::build_storage_from_config;
use emjoin_mem::store::segment::segment_path;
use emjoin_mem::{Codec, PageStore};
use test_data_gen::{kv_schema, random_kv, read_all};

fn fs_store(dir: &str, codec: Codec, rpp: usize) -> Arc<PageStore> {
    let cfg = EngineConfig {
        spill_dir: dir.to_string(),
        ..EngineConfig::default()
    };
    let storage_cfg = cfg.storage_config();
    let storage = build_storage_from_config(&storage_cfg).expect("fs storage");
    Arc::new(PageStore::new(storage, codec, storage_cfg.root, rpp))
}

#[test]
fn test_file_storage_builder_write_read() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_string_lossy().to_string();
    let cfg = EngineConfig {
        spill_dir: root.clone(),
        ..EngineConfig::default()
    };
    let storage = build_storage_from_config(&cfg.storage_config()).expect("fs storage");

    let path = format!("{root}/segment.seg");
    storage.write(&path, b"hello world").expect("write");
    assert_eq!(storage.read(&path).expect("read"), b"hello world");
    assert_eq!(storage.size(&path).unwrap(), 11);
    storage.delete(&path).unwrap();
    storage.delete(&path).unwrap();
    assert!(storage.list(&root).unwrap().is_empty());
}

#[test]
fn test_invalid_scheme_errors() {
    let cfg = EngineConfig {
        spill_uri: Some("ftp://example.com/spill".into()),
        ..EngineConfig::default()
    };
    let err = build_storage_from_config(&cfg.storage_config())
        .err()
        .expect("should fail");
    assert!(err.to_string().contains("unsupported spill scheme"));
}

#[test]
fn test_table_pages_survive_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_string_lossy().to_string();
    let store = fs_store(&root, Codec::None, 4);
    let records = random_kv(19, 5, 0, 11);
    store.create_table("t", kv_schema("k", "v")).unwrap();
    store.add_records("t", records.iter().cloned()).unwrap();

    assert_eq!(store.page_count("t").unwrap(), 5);
    assert_eq!(read_all(&store, "t"), records);
    assert!(dir.path().join("t").join("page_000005.seg").exists());

    store.drop_table("t").unwrap();
    assert!(!dir.path().join("t").join("page_000001.seg").exists());
}

#[test]
fn test_corrupted_page_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_string_lossy().to_string();
    let store = fs_store(&root, Codec::None, 2);
    store.create_table("t", kv_schema("k", "v")).unwrap();
    store.add_records("t", random_kv(6, 3, 0, 2)).unwrap();
    store.flush("t").unwrap();

    let path = segment_path(&root, "t", PageNo::new(2));
    let mut bytes = std::fs::read(&path).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xff;
    std::fs::write(&path, bytes).unwrap();

    assert!(store.read_page("t", PageNo::new(1)).is_ok());
    assert!(store.read_page("t", PageNo::new(2)).is_err());
    let results: Vec<_> = store.record_iter("t").unwrap().collect();
    assert_eq!(results.len(), 3);
    assert!(results[2].is_err());
}

#[cfg(feature = "zstd")]
#[test]
fn test_zstd_pages_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_string_lossy().to_string();
    let store = fs_store(&root, Codec::from_name("zstd").unwrap(), 8);
    let records = random_kv(40, 10, 5, 4);
    store.create_table("t", kv_schema("k", "v")).unwrap();
    store.add_records("t", records.iter().cloned()).unwrap();
    store.flush("t").unwrap();
    assert_eq!(read_all(&store, "t"), records);
}

#[cfg(not(feature = "zstd"))]
#[test]
fn test_zstd_without_feature_is_rejected() {
    let codec = Codec::from_name("zstd").unwrap();
    assert!(codec.compress(b"page").is_err());
}
