//! In-memory favourites repository.
//!
//! Reference implementation for tests and local runs. A single reader/writer
//! lock spans the whole `user -> asset id -> record` map, so every mutation of
//! a key is serialized.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{FavouritesRepository, StoreError};
use crate::models::validation::{check_description, check_new_favourite};
use crate::models::{next_update_time, Asset, FavouriteRecord};

type UserFavourites = HashMap<String, FavouriteRecord>;

#[derive(Default)]
pub struct MemoryRepository {
    favourites: RwLock<HashMap<String, UserFavourites>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FavouritesRepository for MemoryRepository {
    async fn list(&self, user_id: &str) -> Result<Vec<FavouriteRecord>, StoreError> {
        let mut records: Vec<FavouriteRecord> = self
            .favourites
            .read()
            .get(user_id)
            .map(|user| user.values().cloned().collect())
            .unwrap_or_default();

        records.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(records)
    }

    async fn get(&self, user_id: &str, asset_id: &str) -> Result<FavouriteRecord, StoreError> {
        self.favourites
            .read()
            .get(user_id)
            .and_then(|user| user.get(asset_id))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn create(
        &self,
        user_id: &str,
        asset: Asset,
        description: &str,
    ) -> Result<FavouriteRecord, StoreError> {
        check_new_favourite(&asset, description)?;

        let record = FavouriteRecord::new(user_id, asset, description);

        let mut favourites = self.favourites.write();
        let user = favourites.entry(user_id.to_string()).or_default();
        if user.contains_key(&record.id) {
            return Err(StoreError::AlreadyExists);
        }
        user.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        user_id: &str,
        asset_id: &str,
        description: &str,
    ) -> Result<(), StoreError> {
        check_description(description)?;

        let mut favourites = self.favourites.write();
        let record = favourites
            .get_mut(user_id)
            .and_then(|user| user.get_mut(asset_id))
            .ok_or(StoreError::NotFound)?;

        record.description = description.to_string();
        record.updated_at = next_update_time(record.updated_at);
        Ok(())
    }

    async fn delete(&self, user_id: &str, asset_id: &str) -> Result<(), StoreError> {
        let mut favourites = self.favourites.write();
        let user = favourites.get_mut(user_id).ok_or(StoreError::NotFound)?;
        user.remove(asset_id).ok_or(StoreError::NotFound)?;

        if user.is_empty() {
            favourites.remove(user_id);
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
