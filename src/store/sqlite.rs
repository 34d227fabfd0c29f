//! SQLite-backed state store.
//!
//! Durable backend for multi-instance deployments sharing a database file.
//! The conditional write is a single `UPDATE .. WHERE version = ?`; SQLite
//! serializes writers, so checking `rows_affected` gives compare-and-swap
//! semantics without an explicit transaction.

use std::str::FromStr;

use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;

use super::{StateStore, StoreError, VersionedValue};

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `path` and ensure the
    /// state table exists.
    pub async fn connect(path: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{path}"))
            .map_err(sqlx::Error::from)?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS gateway_state (
                state_key TEXT PRIMARY KEY,
                version INTEGER NOT NULL,
                value TEXT NOT NULL
            );",
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }
}

impl StateStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<VersionedValue>, StoreError> {
        let row = sqlx::query("SELECT version, value FROM gateway_state WHERE state_key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let version: i64 = row.try_get("version").map_err(StoreError::Sqlite)?;
        let raw: String = row.try_get("value").map_err(StoreError::Sqlite)?;
        let value = serde_json::from_str(&raw).map_err(|e| StoreError::Corrupt {
            key: key.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Some(VersionedValue {
            version: version as u64,
            value,
        }))
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected_version: u64,
        value: Value,
    ) -> Result<bool, StoreError> {
        let raw = value.to_string();

        let affected = if expected_version == 0 {
            sqlx::query(
                "INSERT INTO gateway_state (state_key, version, value) VALUES (?, 1, ?)
                 ON CONFLICT(state_key) DO NOTHING",
            )
            .bind(key)
            .bind(&raw)
            .execute(&self.pool)
            .await?
            .rows_affected()
        } else {
            sqlx::query(
                "UPDATE gateway_state SET version = version + 1, value = ?
                 WHERE state_key = ? AND version = ?",
            )
            .bind(&raw)
            .bind(key)
            .bind(expected_version as i64)
            .execute(&self.pool)
            .await?
            .rows_affected()
        };

        Ok(affected == 1)
    }
}
