use super::{Storage, WriteBatch, WriteOp};
use crate::error::StorageError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

const SNAPSHOT_FILE: &str = "store.json";
const TEMP_FILE: &str = ".store.json.tmp";

/// Every key in one `store.json` object inside a directory.
///
/// A batch rewrites the whole object into a temp file and publishes it with
/// a single rename, so either all of its writes land or none do.
#[derive(Debug)]
pub struct FileStorage {
    dir: PathBuf,
    // serializes read-modify-write cycles
    writer: Mutex<()>,
}

impl FileStorage {
    /// Opens (and creates if needed) the data directory.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir,
            writer: Mutex::new(()),
        })
    }

    fn snapshot_path(&self) -> PathBuf {
        self.dir.join(SNAPSHOT_FILE)
    }

    async fn read_snapshot(&self) -> Result<Map<String, Value>, StorageError> {
        match fs::read(self.snapshot_path()).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Map::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_snapshot(&self, entries: &Map<String, Value>) -> Result<(), StorageError> {
        let tmp = self.dir.join(TEMP_FILE);
        fs::write(&tmp, serde_json::to_vec(entries)?).await?;
        fs::rename(&tmp, self.snapshot_path()).await?;
        Ok(())
    }

    async fn commit(&self, ops: Vec<WriteOp>) -> Result<(), StorageError> {
        if ops.is_empty() {
            return Ok(());
        }
        let _guard = self.writer.lock().await;
        let mut entries = self.read_snapshot().await?;
        let count = ops.len();
        for op in ops {
            match op {
                WriteOp::Put(key, value) => {
                    entries.insert(key, value);
                }
                WriteOp::Delete(key) => {
                    entries.remove(&key);
                }
            }
        }
        self.write_snapshot(&entries).await?;
        debug!(
            "{:<12} --> wrote {} keys to {}",
            "Storage",
            count,
            self.snapshot_path().display()
        );
        Ok(())
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn load(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.read_snapshot().await?.remove(key))
    }

    async fn save(&self, key: &str, value: Value) -> Result<(), StorageError> {
        self.commit(vec![WriteOp::Put(key.to_string(), value)]).await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.commit(vec![WriteOp::Delete(key.to_string())]).await
    }

    async fn apply(&self, batch: WriteBatch) -> Result<(), StorageError> {
        self.commit(batch.into_ops()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auction::AuctionStore;
    use crate::clock::ManualClock;
    use crate::config::MarketSettings;
    use crate::error::MarketError;
    use chrono::Utc;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn save_load_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path()).await.unwrap();

        assert_eq!(storage.load("auctions").await.unwrap(), None);

        storage.save("auctions", json!([{"id": "1"}])).await.unwrap();
        storage.save("bids", json!([])).await.unwrap();
        assert_eq!(
            storage.load("auctions").await.unwrap(),
            Some(json!([{"id": "1"}]))
        );

        storage.remove("auctions").await.unwrap();
        storage.remove("auctions").await.unwrap();
        assert_eq!(storage.load("auctions").await.unwrap(), None);
        assert_eq!(storage.load("bids").await.unwrap(), Some(json!([])));

        let reopened = FileStorage::open(dir.path()).await.unwrap();
        assert_eq!(reopened.load("bids").await.unwrap(), Some(json!([])));
    }

    #[tokio::test]
    async fn corrupted_file_is_a_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path()).await.unwrap();
        fs::write(dir.path().join(SNAPSHOT_FILE), b"{ not json")
            .await
            .unwrap();

        assert!(matches!(
            storage.load("bids").await,
            Err(StorageError::Serialization(_))
        ));
    }

    #[tokio::test]
    async fn failed_batch_leaves_every_key_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path()).await.unwrap();
        storage.save("users", json!([{"balance": 1000}])).await.unwrap();

        // a directory in the temp file's place makes the write fail
        fs::create_dir(dir.path().join(TEMP_FILE)).await.unwrap();
        let mut batch = WriteBatch::new();
        batch.put("users", &json!([{"balance": 100}])).unwrap();
        batch.put("bids", &json!([{"amount": 900}])).unwrap();
        assert!(storage.apply(batch).await.is_err());
        fs::remove_dir(dir.path().join(TEMP_FILE)).await.unwrap();

        assert_eq!(
            storage.load("users").await.unwrap(),
            Some(json!([{"balance": 1000}]))
        );
        assert_eq!(storage.load("bids").await.unwrap(), None);
    }

    #[tokio::test]
    async fn failed_bid_is_not_persisted_halfway() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(FileStorage::open(dir.path()).await.unwrap());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let settings = MarketSettings::default();

        let mut store = AuctionStore::load(storage.clone(), clock.clone(), &settings).await;
        store
            .accounts_mut()
            .register("alice", "alice@example.com", "pw")
            .await
            .unwrap();

        fs::create_dir(dir.path().join(TEMP_FILE)).await.unwrap();
        let err = store.place_bid("2", 900).await.unwrap_err();
        assert!(matches!(err, MarketError::Storage(_)));
        fs::remove_dir(dir.path().join(TEMP_FILE)).await.unwrap();

        let reloaded = AuctionStore::load(storage, clock, &settings).await;
        assert_eq!(reloaded.accounts().current_user().unwrap().balance, 1000);
        assert_eq!(reloaded.auction("2").unwrap().current_bid, 800);
        assert!(reloaded.bids().is_empty());
    }
}
