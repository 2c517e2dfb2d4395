use std::future::Future;

use shared_types::{Coordinate, FavoritePlace, FavoriteUpdate, SavedSearch};
use sqlx::{postgres::PgRow, PgPool, Row};

use crate::error::StoreError;

type DbResult<T> = Result<T, StoreError>;

/// Raw per-user persistence for recent searches and favorites.
///
/// Implementations do no identity checks of their own; `RecentPlacesStore`
/// resolves the user and passes the id in.
pub trait PlacesBackend: Send + Sync + 'static {
    fn insert_recent_search(
        &self,
        user_id: &str,
        search_query: &str,
        coordinates: Coordinate,
        place_name: &str,
    ) -> impl Future<Output = DbResult<SavedSearch>> + Send;

    /// Newest first, at most `limit` rows.
    fn recent_searches(
        &self,
        user_id: &str,
        limit: usize,
    ) -> impl Future<Output = DbResult<Vec<SavedSearch>>> + Send;

    fn insert_favorite(
        &self,
        user_id: &str,
        place_name: &str,
        coordinates: Coordinate,
        notes: Option<&str>,
    ) -> impl Future<Output = DbResult<FavoritePlace>> + Send;

    /// Newest first.
    fn favorites(&self, user_id: &str) -> impl Future<Output = DbResult<Vec<FavoritePlace>>> + Send;

    /// Fails with `StoreError::NotFound` when `id` does not belong to the user.
    fn update_favorite(
        &self,
        user_id: &str,
        id: &str,
        update: &FavoriteUpdate,
    ) -> impl Future<Output = DbResult<FavoritePlace>> + Send;

    /// Deleting an id that does not exist is not an error.
    fn delete_favorite(&self, user_id: &str, id: &str) -> impl Future<Output = DbResult<()>> + Send;
}

const SAVED_SEARCH_COLUMNS: &str = "id::text AS id, search_query, coordinates::text AS coordinates, place_name, created_at";
const FAVORITE_COLUMNS: &str = "id::text AS id, place_name, coordinates::text AS coordinates, notes, created_at";

#[derive(Clone)]
pub struct PgPlacesRepository {
    pool: PgPool,
}

impl PgPlacesRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn saved_search_from_row(row: &PgRow) -> DbResult<SavedSearch> {
    let coordinates: String = row.try_get("coordinates")?;
    Ok(SavedSearch {
        id: row.try_get("id")?,
        search_query: row.try_get("search_query")?,
        place_name: row.try_get("place_name")?,
        coordinates: coordinates.parse()?,
        created_at: row.try_get("created_at")?,
    })
}

fn favorite_from_row(row: &PgRow) -> DbResult<FavoritePlace> {
    let coordinates: String = row.try_get("coordinates")?;
    Ok(FavoritePlace {
        id: row.try_get("id")?,
        place_name: row.try_get("place_name")?,
        coordinates: coordinates.parse()?,
        notes: row.try_get("notes")?,
        created_at: row.try_get("created_at")?,
    })
}

impl PlacesBackend for PgPlacesRepository {
    async fn insert_recent_search(
        &self,
        user_id: &str,
        search_query: &str,
        coordinates: Coordinate,
        place_name: &str,
    ) -> DbResult<SavedSearch> {
        let row = sqlx::query(&format!(
            "INSERT INTO recent_searches (user_id, search_query, coordinates, place_name)
             VALUES ($1, $2, $3::text::point, $4)
             RETURNING {SAVED_SEARCH_COLUMNS}"
        ))
        .bind(user_id)
        .bind(search_query)
        .bind(coordinates.to_string())
        .bind(place_name)
        .fetch_one(&self.pool)
        .await?;

        saved_search_from_row(&row)
    }

    async fn recent_searches(&self, user_id: &str, limit: usize) -> DbResult<Vec<SavedSearch>> {
        let rows = sqlx::query(&format!(
            "SELECT {SAVED_SEARCH_COLUMNS}
             FROM recent_searches
             WHERE user_id = $1
             ORDER BY created_at DESC
             LIMIT $2"
        ))
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(saved_search_from_row).collect()
    }

    async fn insert_favorite(
        &self,
        user_id: &str,
        place_name: &str,
        coordinates: Coordinate,
        notes: Option<&str>,
    ) -> DbResult<FavoritePlace> {
        let row = sqlx::query(&format!(
            "INSERT INTO favorites (user_id, place_name, coordinates, notes)
             VALUES ($1, $2, $3::text::point, $4)
             RETURNING {FAVORITE_COLUMNS}"
        ))
        .bind(user_id)
        .bind(place_name)
        .bind(coordinates.to_string())
        .bind(notes)
        .fetch_one(&self.pool)
        .await?;

        favorite_from_row(&row)
    }

    async fn favorites(&self, user_id: &str) -> DbResult<Vec<FavoritePlace>> {
        let rows = sqlx::query(&format!(
            "SELECT {FAVORITE_COLUMNS}
             FROM favorites
             WHERE user_id = $1
             ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(favorite_from_row).collect()
    }

    async fn update_favorite(
        &self,
        user_id: &str,
        id: &str,
        update: &FavoriteUpdate,
    ) -> DbResult<FavoritePlace> {
        let row = sqlx::query(&format!(
            "UPDATE favorites
             SET place_name = COALESCE($3, place_name),
                 notes = COALESCE($4, notes)
             WHERE id::text = $1 AND user_id = $2
             RETURNING {FAVORITE_COLUMNS}"
        ))
        .bind(id)
        .bind(user_id)
        .bind(update.place_name.as_deref())
        .bind(update.notes.as_deref())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => favorite_from_row(&row),
            None => Err(StoreError::NotFound(id.to_string())),
        }
    }

    async fn delete_favorite(&self, user_id: &str, id: &str) -> DbResult<()> {
        let result = sqlx::query(
            "DELETE FROM favorites
             WHERE id::text = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            tracing::debug!("Favorite {} was already gone", id);
        }
        Ok(())
    }
}
