// region:    --- Imports
use super::queries;
use super::{Storage, WriteBatch, WriteOp};
use crate::error::StorageError;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::info;
// endregion: --- Imports

// region:    --- Database Manager
pub struct DatabaseManager {
    pool: Arc<PgPool>,
}

impl DatabaseManager {
    /// Connects a small pool to `database_url`.
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    pub fn get_pool(&self) -> Arc<PgPool> {
        Arc::clone(&self.pool)
    }

    /// Runs `f` inside a transaction; commits on `Ok`, rolls back on `Err`.
    pub async fn transaction<F, R, E>(&self, f: F) -> Result<R, E>
    where
        F: for<'c> FnOnce(
            &'c mut sqlx::Transaction<'_, sqlx::Postgres>,
        ) -> Pin<Box<dyn Future<Output = Result<R, E>> + Send + 'c>>,
        E: From<sqlx::Error>,
    {
        let mut tx = self.pool.begin().await?;
        let result = f(&mut tx).await;
        match result {
            Ok(r) => {
                tx.commit().await?;
                Ok(r)
            }
            Err(e) => {
                tx.rollback().await?;
                Err(e)
            }
        }
    }

    /// Creates the key-value table if it does not exist yet.
    pub async fn initialize_database(&self) -> Result<(), sqlx::Error> {
        sqlx::query(queries::CREATE_KV_TABLE)
            .execute(&*self.pool)
            .await?;
        info!("{:<12} --> kv_store table ready", "Storage");
        Ok(())
    }
}
// endregion: --- Database Manager

// region:    --- Postgres Storage
/// `kv_store` table backed storage. Batches run in one transaction.
pub struct PostgresStorage {
    db: Arc<DatabaseManager>,
}

impl PostgresStorage {
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Storage for PostgresStorage {
    async fn load(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let row = sqlx::query(queries::SELECT_VALUE)
            .bind(key)
            .fetch_optional(&*self.db.get_pool())
            .await?;
        match row {
            Some(row) => Ok(Some(row.try_get::<Value, _>("value")?)),
            None => Ok(None),
        }
    }

    async fn save(&self, key: &str, value: Value) -> Result<(), StorageError> {
        sqlx::query(queries::UPSERT_VALUE)
            .bind(key)
            .bind(value)
            .execute(&*self.db.get_pool())
            .await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        sqlx::query(queries::DELETE_VALUE)
            .bind(key)
            .execute(&*self.db.get_pool())
            .await?;
        Ok(())
    }

    async fn apply(&self, batch: WriteBatch) -> Result<(), StorageError> {
        let ops = batch.into_ops();
        self.db
            .transaction(move |tx| {
                Box::pin(async move {
                    for op in ops {
                        match op {
                            WriteOp::Put(key, value) => {
                                sqlx::query(queries::UPSERT_VALUE)
                                    .bind(key)
                                    .bind(value)
                                    .execute(&mut **tx)
                                    .await?;
                            }
                            WriteOp::Delete(key) => {
                                sqlx::query(queries::DELETE_VALUE)
                                    .bind(key)
                                    .execute(&mut **tx)
                                    .await?;
                            }
                        }
                    }
                    Ok::<(), StorageError>(())
                })
            })
            .await
    }
}
// endregion: --- Postgres Storage
