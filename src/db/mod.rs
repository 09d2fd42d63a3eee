//! Favourites storage.
//!
//! SQLite is the durable backend; the in-memory repository is a reference
//! implementation for tests and local runs.

mod memory;
mod repository;

pub use memory::MemoryRepository;
pub use repository::SqliteRepository;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;

use crate::config::DbConfig;
use crate::models::{Asset, AssetDecodeError, FavouriteRecord, ValidationErrors};

/// Errors surfaced by a favourites repository.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("favourite not found")]
    NotFound,
    #[error("favourite already exists")]
    AlreadyExists,
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("stored favourite {asset_id} is unreadable: {source}")]
    Corrupt {
        asset_id: String,
        #[source]
        source: AssetDecodeError,
    },
    #[error("{0}")]
    Backend(String),
}

/// Storage contract for favourites, keyed by (owner, asset id).
///
/// Implementations must make `create` atomic per key: two concurrent calls for
/// the same key yield exactly one success and one `AlreadyExists`.
#[async_trait]
pub trait FavouritesRepository: Send + Sync {
    /// All favourites of `user_id`, newest first. Unknown users get an empty list.
    async fn list(&self, user_id: &str) -> Result<Vec<FavouriteRecord>, StoreError>;

    async fn get(&self, user_id: &str, asset_id: &str) -> Result<FavouriteRecord, StoreError>;

    /// Validate and store a new favourite.
    async fn create(
        &self,
        user_id: &str,
        asset: Asset,
        description: &str,
    ) -> Result<FavouriteRecord, StoreError>;

    /// Replace the description and refresh `updated_at`.
    async fn update(
        &self,
        user_id: &str,
        asset_id: &str,
        description: &str,
    ) -> Result<(), StoreError>;

    async fn delete(&self, user_id: &str, asset_id: &str) -> Result<(), StoreError>;

    /// Connectivity probe for readiness checks.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Initialize the database connection pool and create the schema.
pub async fn init_database(config: &DbConfig) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = config.path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", config.path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .max_lifetime(config.max_lifetime)
        .idle_timeout(config.idle_timeout)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;

    sqlx::query("SELECT 1").execute(&pool).await?;

    Ok(pool)
}

/// Create tables if they don't exist.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS favourites (
            id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            asset_type TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            data TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            PRIMARY KEY (user_id, id)
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_favourites_user_created
            ON favourites(user_id, created_at DESC);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
