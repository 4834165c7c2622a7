use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;

use super::SqliteRepository;
use crate::repository::{KeyValueStore, StorageError, WriteBatch, WriteOp};

fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl KeyValueStore for SqliteRepository {
    async fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<String>>, StorageError> {
        // One transaction so every key comes from the same snapshot.
        let mut tx = self.pool.begin().await.map_err(conn)?;
        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            let row = sqlx::query("SELECT value FROM kv_entries WHERE key = ?1")
                .bind(*key)
                .fetch_optional(&mut *tx)
                .await
                .map_err(conn)?;
            let value = row
                .map(|row| row.try_get::<String, _>("value"))
                .transpose()
                .map_err(|e| StorageError::Serialization(e.to_string()))?;
            values.push(value);
        }
        tx.commit().await.map_err(conn)?;
        Ok(values)
    }

    async fn apply(&self, batch: WriteBatch) -> Result<(), StorageError> {
        if batch.is_empty() {
            return Ok(());
        }
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(conn)?;
        for op in batch.ops() {
            match op {
                WriteOp::Put { key, value } => {
                    sqlx::query(
                        r"
                            INSERT INTO kv_entries (key, value, updated_at)
                            VALUES (?1, ?2, ?3)
                            ON CONFLICT(key) DO UPDATE SET
                                value = excluded.value,
                                updated_at = excluded.updated_at
                        ",
                    )
                    .bind(key)
                    .bind(value)
                    .bind(now)
                    .execute(&mut *tx)
                    .await
                    .map_err(conn)?;
                }
                WriteOp::Delete { key } => {
                    sqlx::query("DELETE FROM kv_entries WHERE key = ?1")
                        .bind(key)
                        .execute(&mut *tx)
                        .await
                        .map_err(conn)?;
                }
            }
        }
        tx.commit().await.map_err(conn)?;
        Ok(())
    }
}
