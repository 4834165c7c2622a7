use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    /// A persisted value failed to parse. Callers of the progress store never
    /// see this: corrupt values are logged and replaced by defaults.
    #[error("corrupt value under {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

/// One write inside a [`WriteBatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    Put { key: String, value: String },
    Delete { key: String },
}

/// Group of writes applied all-or-nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn put(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.ops.push(WriteOp::Put {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    #[must_use]
    pub fn delete(mut self, key: impl Into<String>) -> Self {
        self.ops.push(WriteOp::Delete { key: key.into() });
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    #[must_use]
    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }
}

/// String-keyed local persistent storage.
///
/// Reads of several keys and batches of writes are atomic relative to each
/// other: a `get_many` never observes half of an `apply`.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read several keys from one consistent snapshot, in the given order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<String>>, StorageError>;

    /// Apply every write in `batch`, or none of them.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the batch cannot be persisted.
    async fn apply(&self, batch: WriteBatch) -> Result<(), StorageError>;

    /// Read a single key.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.get_many(&[key]).await?.into_iter().next().flatten())
    }
}

/// Simple in-memory store for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<String>>, StorageError> {
        let guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(keys.iter().map(|key| guard.get(*key).cloned()).collect())
    }

    async fn apply(&self, batch: WriteBatch) -> Result<(), StorageError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        for op in batch.ops {
            match op {
                WriteOp::Put { key, value } => {
                    guard.insert(key, value);
                }
                WriteOp::Delete { key } => {
                    guard.remove(&key);
                }
            }
        }
        Ok(())
    }
}

/// Local storage handle behind a trait object for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub kv: Arc<dyn KeyValueStore>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            kv: Arc::new(InMemoryStore::new()),
        }
    }
}
