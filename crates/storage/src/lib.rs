#![forbid(unsafe_code)]

pub mod progress;
pub mod repository;
pub mod sqlite;

pub use progress::{LocalProgressStore, LocalProgressSummary, ProgressStoreError};
pub use repository::{InMemoryStore, KeyValueStore, Storage, StorageError, WriteBatch};
