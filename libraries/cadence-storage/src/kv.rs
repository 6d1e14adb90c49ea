//! Key-value storage
//!
//! String values stored under string keys, with JSON helpers on top. Liked
//! tracks and user playlists each live under a single key.
//!
//! # Example
//!
//! ```rust,no_run
//! use cadence_storage::kv;
//! # async fn example(pool: &sqlx::SqlitePool) -> Result<(), Box<dyn std::error::Error>> {
//! kv::set_json(pool, "ui.theme", &"dark").await?;
//! let theme: Option<String> = kv::get_json(pool, "ui.theme").await?;
//! # Ok(())
//! # }
//! ```

use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::{Row, SqlitePool};

/// Read the raw value stored under `key`
pub async fn get_item(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
    let row = sqlx::query("SELECT value FROM key_value WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|r| r.get::<String, _>("value")))
}

/// Store `value` under `key`, replacing any previous value
pub async fn set_item(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    let now = chrono::Utc::now().timestamp();

    sqlx::query(
        "INSERT INTO key_value (key, value, updated_at)
         VALUES (?, ?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
    )
    .bind(key)
    .bind(value)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(())
}

/// Delete `key`; returns whether it existed
pub async fn remove_item(pool: &SqlitePool, key: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM key_value WHERE key = ?")
        .bind(key)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Read and deserialize the JSON value under `key`
pub async fn get_json<T: DeserializeOwned>(pool: &SqlitePool, key: &str) -> Result<Option<T>> {
    match get_item(pool, key).await? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Serialize `value` as JSON and store it under `key`
pub async fn set_json<T: Serialize + ?Sized>(pool: &SqlitePool, key: &str, value: &T) -> Result<()> {
    let raw = serde_json::to_string(value)?;
    set_item(pool, key, &raw).await
}
