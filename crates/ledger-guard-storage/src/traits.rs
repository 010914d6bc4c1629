//! Storage trait definitions.

use crate::errors::{Result, StorageError};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

/// Storage interface for key-value operations
///
/// This trait abstracts the underlying storage implementation (RocksDB)
/// to enable testing with mock implementations.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Get a value by key from a column family
    ///
    /// # Returns
    ///
    /// `Ok(Some(value))` if key exists, `Ok(None)` if not found
    async fn get<K, V>(&self, cf: &str, key: &K) -> Result<Option<V>>
    where
        K: Serialize + Send + Sync,
        V: DeserializeOwned;

    /// Put a key-value pair into a column family
    async fn put<K, V>(&self, cf: &str, key: &K, value: &V) -> Result<()>
    where
        K: Serialize + Send + Sync,
        V: Serialize + Send + Sync;

    /// Get multiple values by prefix (range query)
    ///
    /// Returns all key-value pairs where keys start with the given prefix.
    async fn get_by_prefix<K, V>(&self, cf: &str, prefix: &K) -> Result<Vec<(Vec<u8>, V)>>
    where
        K: Serialize + Send + Sync,
        V: DeserializeOwned;

    /// Get every key-value pair in a column family
    async fn scan_all<V>(&self, cf: &str) -> Result<Vec<(Vec<u8>, V)>>
    where
        V: DeserializeOwned;

    /// Create a new batch for atomic operations
    fn batch(&self) -> Box<dyn Batch>;

    /// Commit `batch` only if `key` in `cf` still holds `expected`
    ///
    /// `expected == None` means the key must be absent. The comparison and the
    /// commit happen under the storage write lock, so two writers that read
    /// the same snapshot cannot both succeed.
    ///
    /// # Returns
    ///
    /// `Ok(true)` if the batch was committed, `Ok(false)` if the stored value
    /// no longer matches and nothing was written
    async fn commit_if_unchanged<K, V>(
        &self,
        cf: &str,
        key: &K,
        expected: Option<&V>,
        batch: Box<dyn Batch>,
    ) -> Result<bool>
    where
        K: Serialize + Send + Sync,
        V: Serialize + Send + Sync;
}

/// Batch interface for atomic operations
///
/// Batches allow multiple operations to be performed atomically.
///
/// Note: This trait works with pre-serialized bytes to maintain object safety.
/// Use the `BatchExt` helper methods, or serialize your keys/values before
/// calling the raw methods.
#[async_trait]
pub trait Batch: Send {
    /// Put a pre-serialized key-value pair in the batch
    ///
    /// For type-safe usage, use `BatchExt::put` instead.
    fn put_raw(&mut self, cf: &str, key: Vec<u8>, value: Vec<u8>) -> Result<()>;

    /// Delete a pre-serialized key in the batch
    ///
    /// For type-safe usage, use `BatchExt::delete` instead.
    fn delete_raw(&mut self, cf: &str, key: Vec<u8>) -> Result<()>;

    /// Commit the batch atomically
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Rollback the batch (drop without committing)
    fn rollback(self: Box<Self>);
}

/// Extension trait providing type-safe methods for Batch
pub trait BatchExt: Batch {
    /// Put a key-value pair in the batch (type-safe)
    fn put<K, V>(&mut self, cf: &str, key: &K, value: &V) -> Result<()>
    where
        K: Serialize,
        V: Serialize,
    {
        let key_bytes = serialize_key(key)?;
        let value_bytes = serialize_value(value)?;
        self.put_raw(cf, key_bytes, value_bytes)
    }

    /// Delete a key in the batch (type-safe)
    fn delete<K>(&mut self, cf: &str, key: &K) -> Result<()>
    where
        K: Serialize,
    {
        let key_bytes = serialize_key(key)?;
        self.delete_raw(cf, key_bytes)
    }
}

impl<T: Batch + ?Sized> BatchExt for T {}

/// Serialize a key with bincode.
///
/// Length-prefixed strings keep composite keys prefix-safe: the prefix for
/// `"u1"` never matches keys that start with `"u10"`.
pub(crate) fn serialize_key<K: Serialize>(key: &K) -> Result<Vec<u8>> {
    bincode::serialize(key).map_err(|e| StorageError::Serialization(e.to_string()))
}

/// Serialize a value as JSON.
///
/// Values are resource documents with arbitrary shape, so the encoding has to
/// be self-describing.
pub(crate) fn serialize_value<V: Serialize + ?Sized>(value: &V) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| StorageError::Serialization(e.to_string()))
}

/// Deserialize a JSON value
pub(crate) fn deserialize_value<V: DeserializeOwned>(bytes: &[u8]) -> Result<V> {
    serde_json::from_slice(bytes).map_err(|e| StorageError::Deserialization(e.to_string()))
}

/// Whether stored bytes hold the same JSON value as `expected`
pub(crate) fn matches_expected<V: Serialize + ?Sized>(
    stored: Option<&[u8]>,
    expected: Option<&V>,
) -> Result<bool> {
    match (stored, expected) {
        (None, None) => Ok(true),
        (Some(_), None) | (None, Some(_)) => Ok(false),
        (Some(bytes), Some(expected)) => {
            let stored: serde_json::Value = deserialize_value(bytes)?;
            let expected = serde_json::to_value(expected)
                .map_err(|e| StorageError::Serialization(e.to_string()))?;
            Ok(stored == expected)
        }
    }
}
