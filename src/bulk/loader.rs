//! CSV bulk loader.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::{info, warn};

use crate::common::{Error, Key, LoadPolicy, Result, Value};
use crate::index::btree::BTree;

/// Outcome of a bulk load.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    /// Records inserted into the tree.
    pub inserted: u64,
    /// Records dropped under [`LoadPolicy::Skip`].
    pub skipped: u64,
}

/// Inserts `key,value` records into a tree in source order.
///
/// Each record needs at least two fields, both unsigned integers; any
/// further fields are ignored. Fields are trimmed and blank lines skipped.
///
/// # Example
/// ```no_run
/// use diskbtree::{BTree, BulkLoader, Config, LoadPolicy};
///
/// let mut tree = BTree::open("numbers.idx", &Config::default())?;
/// let report = BulkLoader::new(LoadPolicy::Abort).load_path(&mut tree, "numbers.csv")?;
/// println!("inserted {}", report.inserted);
/// # Ok::<(), diskbtree::Error>(())
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct BulkLoader {
    policy: LoadPolicy,
}

impl BulkLoader {
    pub fn new(policy: LoadPolicy) -> Self {
        Self { policy }
    }

    /// Load every record of the file at `path`.
    ///
    /// # Errors
    /// - `Error::Io` if the file cannot be opened or read
    /// - see [`load`](Self::load)
    pub fn load_path<P: AsRef<Path>>(&self, tree: &mut BTree, path: P) -> Result<LoadReport> {
        let path = path.as_ref();
        let report = self.load(tree, File::open(path)?)?;
        info!(
            source = %path.display(),
            inserted = report.inserted,
            skipped = report.skipped,
            "bulk load complete"
        );
        Ok(report)
    }

    /// Load every record from `reader`.
    ///
    /// Under [`LoadPolicy::Abort`] the first malformed record or duplicate
    /// key stops the load; records before it stay inserted. Under
    /// [`LoadPolicy::Skip`] both are logged and counted instead.
    ///
    /// # Errors
    /// - `Error::MalformedRecord` for an unparsable record (abort only)
    /// - `Error::DuplicateKey` for a key already in the tree (abort only)
    /// - I/O and format errors from the reader or the tree
    pub fn load<R: Read>(&self, tree: &mut BTree, reader: R) -> Result<LoadReport> {
        let mut records = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);

        let mut report = LoadReport::default();
        let mut record = StringRecord::new();

        loop {
            let parsed = match records.read_record(&mut record) {
                Ok(false) => break,
                Ok(true) => parse_record(&record),
                Err(e) => Err(Error::from(e)),
            };

            let outcome = parsed.and_then(|(key, value)| tree.insert(key, value));
            match outcome {
                Ok(()) => report.inserted += 1,
                Err(e @ (Error::MalformedRecord { .. } | Error::DuplicateKey(_)))
                    if self.policy == LoadPolicy::Skip =>
                {
                    warn!(error = %e, "skipping record");
                    report.skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }

        tree.flush()?;
        Ok(report)
    }
}

/// Parse the first two fields of a record as a key and a value.
fn parse_record(record: &StringRecord) -> Result<(Key, Value)> {
    let line = record.position().map_or(0, |p| p.line());
    let malformed = |reason: String| Error::MalformedRecord { line, reason };

    if record.len() < 2 {
        return Err(malformed(format!(
            "expected key and value, found {} field(s)",
            record.len()
        )));
    }

    let key = record[0]
        .parse::<Key>()
        .map_err(|e| malformed(format!("bad key {:?}: {}", &record[0], e)))?;
    let value = record[1]
        .parse::<Value>()
        .map_err(|e| malformed(format!("bad value {:?}: {}", &record[1], e)))?;

    Ok((key, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Config;
    use tempfile::tempdir;

    fn create_test_tree() -> (BTree, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let config = Config::builder().block_size(73).sync_writes(false).build();
        let tree = BTree::create(dir.path().join("test.idx"), &config).unwrap();
        (tree, dir)
    }

    #[test]
    fn test_load_records() {
        let (mut tree, _dir) = create_test_tree();
        let data = "3,30\n1,10\n\n 2 , 20 ,extra\n";

        let report = BulkLoader::default().load(&mut tree, data.as_bytes()).unwrap();

        assert_eq!(report, LoadReport { inserted: 3, skipped: 0 });
        assert_eq!(tree.search(2).unwrap(), 20);
        assert_eq!(tree.search(3).unwrap(), 30);
    }

    #[test]
    fn test_abort_on_malformed() {
        let (mut tree, _dir) = create_test_tree();
        let data = "1,10\n2,abc\n3,30\n";

        let err = BulkLoader::new(LoadPolicy::Abort)
            .load(&mut tree, data.as_bytes())
            .unwrap_err();

        match err {
            Error::MalformedRecord { line, .. } => assert_eq!(line, 2),
            other => panic!("expected MalformedRecord, got {:?}", other),
        }
        assert_eq!(tree.search(1).unwrap(), 10);
        assert!(!tree.contains_key(3).unwrap());
    }

    #[test]
    fn test_abort_on_missing_field() {
        let (mut tree, _dir) = create_test_tree();

        let err = BulkLoader::default().load(&mut tree, "1\n".as_bytes()).unwrap_err();
        assert!(err.is_format());
    }

    #[test]
    fn test_abort_on_duplicate() {
        let (mut tree, _dir) = create_test_tree();

        let err = BulkLoader::default()
            .load(&mut tree, "1,10\n1,11\n".as_bytes())
            .unwrap_err();

        assert!(matches!(err, Error::DuplicateKey(1)));
        assert_eq!(tree.search(1).unwrap(), 10);
    }

    #[test]
    fn test_skip_policy() {
        let (mut tree, _dir) = create_test_tree();
        let data = "1,10\nx,1\n2\n1,99\n-4,5\n2,20\n";

        let report = BulkLoader::new(LoadPolicy::Skip)
            .load(&mut tree, data.as_bytes())
            .unwrap();

        assert_eq!(report, LoadReport { inserted: 2, skipped: 4 });
        assert_eq!(tree.search(1).unwrap(), 10);
        assert_eq!(tree.search(2).unwrap(), 20);
    }

    #[test]
    fn test_load_missing_file() {
        let (mut tree, dir) = create_test_tree();

        let err = BulkLoader::default()
            .load_path(&mut tree, dir.path().join("missing.csv"))
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
