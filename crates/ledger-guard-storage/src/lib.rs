//! # ledger-guard-storage
//!
//! Storage abstraction layer for ledger-guard using RocksDB.
//!
//! Resource documents, principal records, the per-user transaction index and
//! the audit trail each live in their own column family. Writes that follow a
//! policy verdict go through [`Storage::commit_if_unchanged`] so that the
//! snapshot a verdict was computed against is the one that gets replaced.

#![warn(clippy::all)]

pub mod column_families;
pub mod errors;
pub mod rocksdb_impl;
pub mod traits;

pub use column_families::*;
pub use errors::{Result, StorageError};
pub use rocksdb_impl::RocksDbStorage;
pub use traits::{Batch, BatchExt, Storage};
