//! Ordered CSV snapshot of a tree.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

use csv::WriterBuilder;
use tracing::info;

use crate::common::{Error, Result};
use crate::index::btree::BTree;

/// Writes every pair of a tree, in ascending key order, as `key,value` rows.
///
/// The output can be fed back through [`BulkLoader`](super::BulkLoader)
/// into a fresh index.
#[derive(Debug, Default, Clone, Copy)]
pub struct Extractor;

impl Extractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract into a new file at `dest`, returning the number of rows.
    ///
    /// An existing `dest` is never touched. If a write fails midway the
    /// partial file is left in place.
    ///
    /// # Errors
    /// - `Error::OutputExists` if `dest` already exists
    /// - I/O errors while writing, format errors while traversing
    pub fn extract_path<P: AsRef<Path>>(&self, tree: &mut BTree, dest: P) -> Result<u64> {
        let dest = dest.as_ref();
        if dest.exists() {
            return Err(Error::OutputExists(dest.to_path_buf()));
        }

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(dest)
            .map_err(|e| match e.kind() {
                io::ErrorKind::AlreadyExists => Error::OutputExists(dest.to_path_buf()),
                _ => Error::Io(e),
            })?;

        let rows = self.extract(tree, file)?;
        info!(dest = %dest.display(), rows, "extract complete");
        Ok(rows)
    }

    /// Write every pair to `writer`, returning the number of rows.
    pub fn extract<W: Write>(&self, tree: &mut BTree, writer: W) -> Result<u64> {
        let mut out = WriterBuilder::new().has_headers(false).from_writer(writer);

        let mut rows = 0;
        for pair in tree.iter() {
            let (key, value) = pair?;
            out.write_record(&[key.to_string(), value.to_string()])?;
            rows += 1;
        }
        out.flush()?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Config;
    use tempfile::tempdir;

    #[test]
    fn test_extract_rows_in_order() {
        let dir = tempdir().unwrap();
        let config = Config::builder().block_size(73).sync_writes(false).build();
        let mut tree = BTree::create(dir.path().join("test.idx"), &config).unwrap();
        for k in [5, 1, 9, 3, 7] {
            tree.insert(k, k * 11).unwrap();
        }

        let mut buf = Vec::new();
        let rows = Extractor::new().extract(&mut tree, &mut buf).unwrap();

        assert_eq!(rows, 5);
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "1,11\n3,33\n5,55\n7,77\n9,99\n"
        );
    }

    #[test]
    fn test_extract_refuses_existing_output() {
        let dir = tempdir().unwrap();
        let mut tree = BTree::create(dir.path().join("test.idx"), &Config::default()).unwrap();
        tree.insert(1, 1).unwrap();

        let dest = dir.path().join("out.csv");
        std::fs::write(&dest, "keep me").unwrap();

        let err = Extractor::new().extract_path(&mut tree, &dest).unwrap_err();

        assert!(matches!(err, Error::OutputExists(_)));
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "keep me");
    }
}
