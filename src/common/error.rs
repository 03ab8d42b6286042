//! Error types for the index.

use std::path::PathBuf;

use thiserror::Error;

use crate::common::{BlockId, Key};

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors raised by the index.
///
/// Every failure is surfaced to the caller; nothing is retried. The CLI
/// maps each kind to its own exit code via [`Error::exit_code`].
#[derive(Debug, Error)]
pub enum Error {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    /// Disk read, write or allocation failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Format Errors
    // -------------------------------------------------------------------------
    /// A header or node block failed validation.
    #[error("corrupt index: {0}")]
    Corrupt(String),

    /// A block id beyond the allocation cursor was requested.
    #[error("{id} is outside the allocated range (next free block is {next_free})")]
    BlockOutOfRange { id: BlockId, next_free: u64 },

    /// A bulk-load record could not be parsed.
    #[error("malformed record on line {line}: {reason}")]
    MalformedRecord { line: u64, reason: String },

    // -------------------------------------------------------------------------
    // Operation Errors
    // -------------------------------------------------------------------------
    /// Insert of a key that is already present. The tree is left unchanged.
    #[error("key {0} already exists")]
    DuplicateKey(Key),

    /// Search miss.
    #[error("key {0} not found")]
    NotFound(Key),

    /// Extract target already exists. Nothing was written.
    #[error("output file {} already exists", .0.display())]
    OutputExists(PathBuf),

    /// Create target already exists.
    #[error("index file {} already exists", .0.display())]
    IndexExists(PathBuf),

    /// Block size outside the supported range.
    #[error("invalid block size {0}")]
    InvalidBlockSize(u32),
}

impl Error {
    /// Whether this is a format error (corrupt block, bad range, bad record).
    pub fn is_format(&self) -> bool {
        matches!(
            self,
            Error::Corrupt(_) | Error::BlockOutOfRange { .. } | Error::MalformedRecord { .. }
        )
    }

    /// Process exit code for this error kind.
    ///
    /// 0 is success and 2 is left to the argument parser for usage errors.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Io(_) => 3,
            Error::Corrupt(_) | Error::BlockOutOfRange { .. } | Error::MalformedRecord { .. } => 4,
            Error::DuplicateKey(_) => 5,
            Error::NotFound(_) => 6,
            Error::OutputExists(_) => 7,
            Error::IndexExists(_) => 8,
            Error::InvalidBlockSize(_) => 9,
        }
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        let line = err.position().map(|p| p.line()).unwrap_or(0);
        match err.into_kind() {
            csv::ErrorKind::Io(e) => Error::Io(e),
            other => Error::MalformedRecord {
                line,
                reason: format!("{:?}", other),
            },
        }
    }
}
