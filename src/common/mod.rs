//! Common types and utilities shared across the index.
//!
//! This module contains fundamental primitives used throughout the codebase:
//! - Configuration constants and the [`Config`] builder
//! - Error types
//! - Identifiers ([`BlockId`]) and the [`Key`] / [`Value`] aliases

mod block_id;
pub mod config;
pub mod error;

pub use block_id::BlockId;
pub use config::{Config, ConfigBuilder, LoadPolicy};
pub use error::{Error, Result};

/// Keys are fixed-size unsigned 64-bit integers.
pub type Key = u64;

/// Values are fixed-size unsigned 64-bit integers.
pub type Value = u64;
