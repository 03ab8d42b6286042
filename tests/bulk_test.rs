//! Integration tests for bulk load and extract.

use std::fs;

use diskbtree::common::config::MIN_BLOCK_SIZE;
use diskbtree::{BTree, BulkLoader, Config, Error, Extractor, LoadPolicy, LoadReport, Result};
use tempfile::TempDir;

fn test_config() -> Config {
    Config::builder()
        .block_size(MIN_BLOCK_SIZE)
        .sync_writes(false)
        .build()
}

#[test]
fn test_extract_then_load_round_trip() {
    let dir = TempDir::new().unwrap();
    let config = test_config();

    let mut original = BTree::create(dir.path().join("a.idx"), &config).unwrap();
    for k in [50, 10, 40, 20, 30, 60, 5, 15, 25, 35, 45, 55] {
        original.insert(k, k * 1000 + 1).unwrap();
    }
    let expected = original.iter().collect::<Result<Vec<_>>>().unwrap();

    let csv = dir.path().join("dump.csv");
    let rows = Extractor::new().extract_path(&mut original, &csv).unwrap();
    assert_eq!(rows, 12);
    original.close().unwrap();

    // A different block size gives a different shape, same contents
    let big = Config::builder().sync_writes(false).build();
    let mut copy = BTree::create(dir.path().join("b.idx"), &big).unwrap();
    let report = BulkLoader::default().load_path(&mut copy, &csv).unwrap();

    assert_eq!(report, LoadReport { inserted: 12, skipped: 0 });
    assert_eq!(copy.iter().collect::<Result<Vec<_>>>().unwrap(), expected);
}

#[test]
fn test_extract_into_existing_file_fails() {
    let dir = TempDir::new().unwrap();
    let mut tree = BTree::create(dir.path().join("a.idx"), &test_config()).unwrap();
    tree.insert(1, 2).unwrap();

    let out = dir.path().join("out.csv");
    fs::write(&out, "1,1\n").unwrap();

    let err = Extractor::new().extract_path(&mut tree, &out).unwrap_err();
    assert!(matches!(err, Error::OutputExists(_)));
    assert_eq!(fs::read_to_string(&out).unwrap(), "1,1\n");
}

#[test]
fn test_extract_empty_tree() {
    let dir = TempDir::new().unwrap();
    let mut tree = BTree::create(dir.path().join("a.idx"), &test_config()).unwrap();

    let out = dir.path().join("out.csv");
    assert_eq!(Extractor::new().extract_path(&mut tree, &out).unwrap(), 0);
    assert_eq!(fs::read_to_string(&out).unwrap(), "");
}

#[test]
fn test_load_aborts_on_first_malformed_record() {
    let dir = TempDir::new().unwrap();
    let csv = dir.path().join("in.csv");
    fs::write(&csv, "1,100\n2,200\nthree,300\n4,400\n").unwrap();

    let mut tree = BTree::create(dir.path().join("a.idx"), &test_config()).unwrap();
    let err = BulkLoader::new(LoadPolicy::Abort)
        .load_path(&mut tree, &csv)
        .unwrap_err();

    assert!(matches!(err, Error::MalformedRecord { line: 3, .. }));
    assert_eq!(tree.verify().unwrap().entries, 2);
    assert!(matches!(tree.search(4), Err(Error::NotFound(4))));
}

#[test]
fn test_load_skip_continues_past_bad_records() {
    let dir = TempDir::new().unwrap();
    let csv = dir.path().join("in.csv");
    fs::write(&csv, "1,100\nbad\n2,200\n2,201\n3,300,ignored\n").unwrap();

    let config = Config::builder()
        .block_size(MIN_BLOCK_SIZE)
        .sync_writes(false)
        .load_policy(LoadPolicy::Skip)
        .build();
    let mut tree = BTree::create(dir.path().join("a.idx"), &config).unwrap();
    let report = BulkLoader::new(config.load_policy)
        .load_path(&mut tree, &csv)
        .unwrap();

    assert_eq!(report, LoadReport { inserted: 3, skipped: 2 });
    assert_eq!(tree.search(2).unwrap(), 200);
    assert_eq!(tree.search(3).unwrap(), 300);
}

#[test]
fn test_loaded_data_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let csv = dir.path().join("in.csv");
    let body: String = (1..=30).map(|k| format!("{},{}\n", k, k * 7)).collect();
    fs::write(&csv, body).unwrap();

    let path = dir.path().join("a.idx");
    let config = test_config();
    {
        let mut tree = BTree::create(&path, &config).unwrap();
        BulkLoader::default().load_path(&mut tree, &csv).unwrap();
    }

    let mut tree = BTree::open(&path, &config).unwrap();
    assert_eq!(tree.verify().unwrap().entries, 30);
    assert_eq!(tree.search(17).unwrap(), 119);
}
