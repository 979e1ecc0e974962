/// Persistence port.
/// Every store writes through this port. Memory is the writer, storage the
/// mirrored write-target; on startup storage seeds memory.
// region:    --- Imports
use crate::error::StorageError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

mod file;
mod memory;
mod postgres;
mod queries;

pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use postgres::{DatabaseManager, PostgresStorage};
// endregion: --- Imports

// region:    --- Keys
pub const USERS_KEY: &str = "users";
pub const CURRENT_USER_KEY: &str = "currentUser";
pub const AUCTIONS_KEY: &str = "auctions";
pub const BIDS_KEY: &str = "bids";
pub const NOTIFICATIONS_KEY: &str = "notifications";
// endregion: --- Keys

// region:    --- Write Batch
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Put(String, Value),
    Delete(String),
}

/// Ordered set of writes that belong to one store operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serializes `value` and stages it under `key`.
    pub fn put<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<(), StorageError> {
        self.ops
            .push(WriteOp::Put(key.to_string(), serde_json::to_value(value)?));
        Ok(())
    }

    pub fn delete(&mut self, key: &str) {
        self.ops.push(WriteOp::Delete(key.to_string()));
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.ops.iter().map(|op| match op {
            WriteOp::Put(key, _) | WriteOp::Delete(key) => key.as_str(),
        })
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}
// endregion: --- Write Batch

// region:    --- Storage Trait
/// Key-value persistence port.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn load(&self, key: &str) -> Result<Option<Value>, StorageError>;

    async fn save(&self, key: &str, value: Value) -> Result<(), StorageError>;

    async fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Applies every write of the batch. Adapters that can do so apply it
    /// atomically; the default applies the writes one by one, in order.
    async fn apply(&self, batch: WriteBatch) -> Result<(), StorageError> {
        for op in batch.into_ops() {
            match op {
                WriteOp::Put(key, value) => self.save(&key, value).await?,
                WriteOp::Delete(key) => self.remove(&key).await?,
            }
        }
        Ok(())
    }
}
// endregion: --- Storage Trait

// region:    --- Load Boundary
/// Loads and decodes one key. Missing keys, storage failures and malformed
/// values all come back as `None`.
pub async fn load_typed<T: DeserializeOwned>(storage: &dyn Storage, key: &str) -> Option<T> {
    let value = match storage.load(key).await {
        Ok(Some(value)) => value,
        Ok(None) => return None,
        Err(e) => {
            warn!("{:<12} --> failed to load {}: {}", "Storage", key, e);
            return None;
        }
    };

    match serde_json::from_value(value) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            warn!("{:<12} --> discarding malformed {}: {}", "Storage", key, e);
            None
        }
    }
}
// endregion: --- Load Boundary
