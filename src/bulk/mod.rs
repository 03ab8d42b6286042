//! Bulk import and export.
//!
//! - [`BulkLoader`]: inserts CSV `key,value` records in source order
//! - [`Extractor`]: writes the tree as ascending `key,value` CSV rows

mod extractor;
mod loader;

pub use extractor::Extractor;
pub use loader::{BulkLoader, LoadReport};
