//! Cadence Storage
//!
//! `SQLite` persistence for the collaborators the playback session consumes:
//! the liked-track set and user playlists. Both are JSON documents in a
//! single key-value table.
//!
//! # Example
//!
//! ```rust,no_run
//! use cadence_storage::{create_pool, run_migrations, LikedTracks};
//! use cadence_core::{LikedStore, TrackId};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = create_pool("sqlite://cadence.db").await?;
//! run_migrations(&pool).await?;
//!
//! let liked = LikedTracks::new(pool);
//! liked.like(&TrackId::new("track-1")).await?;
//! # Ok(())
//! # }
//! ```

mod error;

pub mod kv;
pub mod liked;
pub mod memory;
pub mod playlists;

pub use error::{Result, StorageError};
pub use liked::LikedTracks;
pub use memory::MemoryLikedStore;
pub use playlists::{PlaylistUpdate, UserPlaylists};
pub use sqlx::sqlite::SqlitePool;

use sqlx::migrate::Migrator;
use tracing::debug;

// Embed migrations into binary
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Run database migrations
///
/// Call once at startup, before any store is used.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    MIGRATOR.run(pool).await?;
    Ok(())
}

/// Create a new `SQLite` pool
///
/// The database file is created when missing and opened in WAL mode.
pub async fn create_pool(database_url: &str) -> Result<SqlitePool> {
    use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
    use std::str::FromStr;

    debug!(url = %database_url, "Creating SQLite pool");

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    Ok(pool)
}
