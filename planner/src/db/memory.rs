use std::sync::Mutex;

use chrono::{Duration, Utc};
use shared_types::{Coordinate, FavoritePlace, FavoriteUpdate, SavedSearch};

use super::places_repository::PlacesBackend;
use crate::error::StoreError;

#[derive(Default)]
struct Tables {
    next_id: u64,
    recent: Vec<(String, SavedSearch)>,
    favorites: Vec<(String, FavoritePlace)>,
}

impl Tables {
    fn next_id(&mut self) -> String {
        self.next_id += 1;
        format!("mem-{}", self.next_id)
    }
}

/// Process-local backend used when no database is configured.
#[derive(Default)]
pub struct InMemoryPlacesBackend {
    tables: Mutex<Tables>,
}

impl InMemoryPlacesBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_tables<T>(&self, f: impl FnOnce(&mut Tables) -> T) -> T {
        // tables hold plain data, a poisoned lock is still consistent
        let mut tables = self
            .tables
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut *tables)
    }
}

// Rows inserted within the same clock tick still sort newest-first.
fn stamp(sequence: u64) -> chrono::DateTime<Utc> {
    Utc::now() + Duration::microseconds(sequence as i64)
}

impl PlacesBackend for InMemoryPlacesBackend {
    async fn insert_recent_search(
        &self,
        user_id: &str,
        search_query: &str,
        coordinates: Coordinate,
        place_name: &str,
    ) -> Result<SavedSearch, StoreError> {
        Ok(self.with_tables(|tables| {
            let saved = SavedSearch {
                id: tables.next_id(),
                search_query: search_query.to_string(),
                place_name: place_name.to_string(),
                coordinates,
                created_at: stamp(tables.next_id),
            };
            tables.recent.push((user_id.to_string(), saved.clone()));
            saved
        }))
    }

    async fn recent_searches(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<SavedSearch>, StoreError> {
        Ok(self.with_tables(|tables| {
            tables
                .recent
                .iter()
                .rev()
                .filter(|(owner, _)| owner == user_id)
                .take(limit)
                .map(|(_, saved)| saved.clone())
                .collect()
        }))
    }

    async fn insert_favorite(
        &self,
        user_id: &str,
        place_name: &str,
        coordinates: Coordinate,
        notes: Option<&str>,
    ) -> Result<FavoritePlace, StoreError> {
        Ok(self.with_tables(|tables| {
            let favorite = FavoritePlace {
                id: tables.next_id(),
                place_name: place_name.to_string(),
                coordinates,
                notes: notes.map(str::to_string),
                created_at: stamp(tables.next_id),
            };
            tables.favorites.push((user_id.to_string(), favorite.clone()));
            favorite
        }))
    }

    async fn favorites(&self, user_id: &str) -> Result<Vec<FavoritePlace>, StoreError> {
        Ok(self.with_tables(|tables| {
            tables
                .favorites
                .iter()
                .rev()
                .filter(|(owner, _)| owner == user_id)
                .map(|(_, favorite)| favorite.clone())
                .collect()
        }))
    }

    async fn update_favorite(
        &self,
        user_id: &str,
        id: &str,
        update: &FavoriteUpdate,
    ) -> Result<FavoritePlace, StoreError> {
        self.with_tables(|tables| {
            let (_, favorite) = tables
                .favorites
                .iter_mut()
                .find(|(owner, favorite)| owner == user_id && favorite.id == id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            update.apply_to(favorite);
            Ok(favorite.clone())
        })
    }

    async fn delete_favorite(&self, user_id: &str, id: &str) -> Result<(), StoreError> {
        self.with_tables(|tables| {
            tables
                .favorites
                .retain(|(owner, favorite)| !(owner == user_id && favorite.id == id));
        });
        Ok(())
    }
}
