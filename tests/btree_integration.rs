//! Integration tests for the B-tree engine over real index files.

use diskbtree::common::config::{MIN_BLOCK_SIZE, NODE_CACHE_CAPACITY};
use diskbtree::{BTree, BlockStore, Config, Error, Key, Result, Value};
use tempfile::TempDir;

/// Helper to create an order-4 tree in a temp directory.
fn create_test_tree() -> (BTree, TempDir, Config) {
    let dir = TempDir::new().unwrap();
    let config = Config::builder()
        .block_size(MIN_BLOCK_SIZE)
        .sync_writes(false)
        .build();
    let tree = BTree::create(dir.path().join("test.idx"), &config).unwrap();
    (tree, dir, config)
}

fn pairs(tree: &mut BTree) -> Vec<(Key, Value)> {
    tree.iter().collect::<Result<Vec<_>>>().unwrap()
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_ascending_25_keys() {
    let (mut tree, _dir, _) = create_test_tree();
    assert_eq!(tree.order(), 4);

    let mut grew_at = Vec::new();
    let mut height = tree.height().unwrap();
    for k in 1..=25 {
        tree.insert(k, k * 100).unwrap();

        let shape = tree.verify().unwrap();
        if shape.height != height {
            grew_at.push(k);
            height = shape.height;
        }
    }

    // The root splits when it is full on entry, i.e. on the 4th key
    assert_eq!(grew_at, vec![4, 9, 18]);
    assert_eq!(height, 4);
    assert_eq!(tree.info().unwrap().node_count, 21);

    assert_eq!(tree.search(13).unwrap(), 1300);
    let keys: Vec<Key> = pairs(&mut tree).into_iter().map(|(k, _)| k).collect();
    assert_eq!(keys, (1..=25).collect::<Vec<_>>());
}

#[test]
fn test_ascending_60_keys_stay_balanced() {
    let (mut tree, _dir, _) = create_test_tree();

    for k in 1..=60 {
        tree.insert(k, k + 7).unwrap();
        let shape = tree.verify().unwrap();
        assert_eq!(shape.entries, k);
        assert!(tree.resident_nodes() <= NODE_CACHE_CAPACITY);
    }

    let shape = tree.verify().unwrap();
    assert_eq!(shape.height, 5);
    assert_eq!(shape.nodes, 55);
    assert_eq!(
        pairs(&mut tree),
        (1..=60).map(|k| (k, k + 7)).collect::<Vec<_>>()
    );
}

#[test]
fn test_interleaved_keys() {
    let (mut tree, _dir, _) = create_test_tree();

    // Evens ascending, then odds descending
    let keys: Vec<Key> = (1..=50)
        .map(|k| k * 2)
        .chain((0..50).rev().map(|k| k * 2 + 1))
        .collect();
    for &k in &keys {
        tree.insert(k, k * 3).unwrap();
    }

    tree.verify().unwrap();
    for k in 1..=100 {
        assert_eq!(tree.search(k).unwrap(), k * 3);
    }
    assert!(matches!(tree.search(0), Err(Error::NotFound(0))));
    assert!(matches!(tree.search(101), Err(Error::NotFound(101))));
}

#[test]
fn test_extreme_keys() {
    let (mut tree, _dir, _) = create_test_tree();

    for k in [0, u64::MAX, 1, u64::MAX - 1, 42] {
        tree.insert(k, !k).unwrap();
    }

    assert_eq!(tree.search(0).unwrap(), u64::MAX);
    assert_eq!(tree.search(u64::MAX).unwrap(), 0);
    assert_eq!(pairs(&mut tree).first(), Some(&(0, u64::MAX)));
    assert_eq!(pairs(&mut tree).last(), Some(&(u64::MAX, 0)));
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_duplicate_key_leaves_tree_unchanged() {
    let (mut tree, _dir, _) = create_test_tree();
    for k in 1..=20 {
        tree.insert(k, k).unwrap();
    }
    let before = tree.info().unwrap();
    let contents = pairs(&mut tree);

    for k in [1, 10, 20] {
        assert!(matches!(tree.insert(k, 0), Err(Error::DuplicateKey(d)) if d == k));
    }

    assert_eq!(tree.info().unwrap(), before);
    assert_eq!(pairs(&mut tree), contents);
}

#[test]
fn test_create_refuses_existing_file() {
    let (tree, dir, config) = create_test_tree();
    tree.close().unwrap();

    let err = BTree::create(dir.path().join("test.idx"), &config)
        .err()
        .unwrap();
    assert!(matches!(err, Error::IndexExists(_)));
}

#[test]
fn test_invalid_block_size() {
    let dir = TempDir::new().unwrap();
    let config = Config::builder().block_size(16).build();

    let err = BTree::create(dir.path().join("tiny.idx"), &config)
        .err()
        .unwrap();
    assert!(matches!(err, Error::InvalidBlockSize(16)));
    assert!(!dir.path().join("tiny.idx").exists());
}

#[test]
fn test_open_missing_file() {
    let dir = TempDir::new().unwrap();
    let err = BTree::open(dir.path().join("nope.idx"), &Config::default())
        .err()
        .unwrap();
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn test_open_garbage_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("garbage.idx");
    std::fs::write(&path, vec![0xAB; 512]).unwrap();

    let err = BTree::open(&path, &Config::default()).err().unwrap();
    assert!(err.is_format());
}

#[test]
fn test_corrupt_node_detected() {
    let (mut tree, dir, config) = create_test_tree();
    for k in 1..=10 {
        tree.insert(k, k).unwrap();
    }
    let root = tree.root();
    tree.close().unwrap();

    // Flip a byte inside the root node's key area
    let path = dir.path().join("test.idx");
    let mut bytes = std::fs::read(&path).unwrap();
    let offset = root.0 as usize * MIN_BLOCK_SIZE as usize + 20;
    bytes[offset] ^= 0xFF;
    std::fs::write(&path, bytes).unwrap();

    let mut tree = BTree::open(&path, &config).unwrap();
    let err = tree.search(5).unwrap_err();
    assert!(err.is_format());
}

// ============================================================================
// Persistence
// ============================================================================

#[test]
fn test_persistence_across_reopen() {
    let (mut tree, dir, config) = create_test_tree();
    for k in (1..=40).rev() {
        tree.insert(k, k * k).unwrap();
    }
    let info = tree.info().unwrap();
    tree.close().unwrap();

    let mut tree = BTree::open(dir.path().join("test.idx"), &config).unwrap();
    assert_eq!(tree.info().unwrap(), info);
    assert_eq!(tree.verify().unwrap().entries, 40);
    for k in 1..=40 {
        assert_eq!(tree.search(k).unwrap(), k * k);
    }

    // Keep growing after reopen
    for k in 41..=60 {
        tree.insert(k, k * k).unwrap();
    }
    tree.verify().unwrap();
}

#[test]
fn test_header_on_disk_after_root_split() {
    let (mut tree, dir, config) = create_test_tree();
    for k in 1..=4 {
        tree.insert(k, k).unwrap();
    }
    let root = tree.root();

    // Without closing: the split already made the new root durable
    let mut store = BlockStore::open(dir.path().join("test.idx"), &config).unwrap();
    let header = store.read_header().unwrap();
    assert_eq!(header.root, root);
    assert_eq!(header.node_count, 3);
    drop(tree);
}

#[test]
fn test_default_block_size_order() {
    let dir = TempDir::new().unwrap();
    let config = Config::builder().sync_writes(false).build();
    let mut tree = BTree::create(dir.path().join("big.idx"), &config).unwrap();

    assert_eq!(tree.order(), 30);
    for k in 0..1000 {
        tree.insert(k, k).unwrap();
    }
    let shape = tree.verify().unwrap();
    assert_eq!(shape.entries, 1000);
    assert!(shape.height <= 3);
}
