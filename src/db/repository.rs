//! SQLite-backed favourites repository.
//!
//! Create atomicity comes from the `(user_id, id)` primary key: a duplicate
//! insert fails inside the engine and is reported as `AlreadyExists`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

use super::{FavouritesRepository, StoreError};
use crate::models::validation::{check_description, check_new_favourite};
use crate::models::{now, Asset, AssetType, FavouriteRecord};

const LIST_FAVOURITES: &str = "SELECT id, user_id, asset_type, description, data, created_at, updated_at FROM favourites WHERE user_id = ? ORDER BY created_at DESC, id ASC";

const GET_FAVOURITE: &str = "SELECT id, user_id, asset_type, description, data, created_at, updated_at FROM favourites WHERE user_id = ? AND id = ?";

/// Durable repository over a SQLite pool.
#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FavouritesRepository for SqliteRepository {
    async fn list(&self, user_id: &str) -> Result<Vec<FavouriteRecord>, StoreError> {
        let rows = sqlx::query(LIST_FAVOURITES)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(favourite_from_row).collect()
    }

    async fn get(&self, user_id: &str, asset_id: &str) -> Result<FavouriteRecord, StoreError> {
        let row = sqlx::query(GET_FAVOURITE)
            .bind(user_id)
            .bind(asset_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => favourite_from_row(&row),
            None => Err(StoreError::NotFound),
        }
    }

    async fn create(
        &self,
        user_id: &str,
        asset: Asset,
        description: &str,
    ) -> Result<FavouriteRecord, StoreError> {
        check_new_favourite(&asset, description)?;

        let record = FavouriteRecord::new(user_id, asset, description);
        let data_json = serde_json::to_string(&record.data)?;

        let result = sqlx::query(
            "INSERT INTO favourites (id, user_id, asset_type, description, data, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)"
        )
        .bind(&record.id)
        .bind(&record.user_id)
        .bind(record.asset_type.as_str())
        .bind(&record.description)
        .bind(&data_json)
        .bind(record.created_at.timestamp_micros())
        .bind(record.updated_at.timestamp_micros())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(record),
            Err(e) if is_unique_violation(&e) => Err(StoreError::AlreadyExists),
            Err(e) => Err(e.into()),
        }
    }

    async fn update(
        &self,
        user_id: &str,
        asset_id: &str,
        description: &str,
    ) -> Result<(), StoreError> {
        check_description(description)?;

        // Single statement so concurrent updates cannot move updated_at backwards
        let result = sqlx::query(
            "UPDATE favourites SET description = ?, updated_at = MAX(?, updated_at + 1) WHERE user_id = ? AND id = ?"
        )
        .bind(description)
        .bind(now().timestamp_micros())
        .bind(user_id)
        .bind(asset_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, user_id: &str, asset_id: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM favourites WHERE user_id = ? AND id = ?")
            .bind(user_id)
            .bind(asset_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

// Helper functions for row conversion

fn favourite_from_row(row: &SqliteRow) -> Result<FavouriteRecord, StoreError> {
    let id: String = row.try_get("id")?;
    let type_str: String = row.try_get("asset_type")?;
    let raw_data: String = row.try_get("data")?;

    let asset_type = AssetType::parse(&type_str)
        .ok_or_else(|| StoreError::Backend(format!("unknown asset type: {}", type_str)))?;
    let data = Asset::from_json_str(asset_type, &raw_data).map_err(|source| {
        StoreError::Corrupt {
            asset_id: id.clone(),
            source,
        }
    })?;

    Ok(FavouriteRecord {
        id,
        user_id: row.try_get("user_id")?,
        asset_type,
        description: row.try_get("description")?,
        created_at: timestamp_from_micros(row.try_get("created_at")?)?,
        updated_at: timestamp_from_micros(row.try_get("updated_at")?)?,
        data,
    })
}

fn timestamp_from_micros(micros: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp_micros(micros)
        .ok_or_else(|| StoreError::Backend(format!("timestamp out of range: {}", micros)))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.is_unique_violation() || db_err.message().contains("UNIQUE constraint failed")
        }
        _ => false,
    }
}
