use std::sync::Arc;

use shared_types::{Coordinate, FavoritePlace, FavoriteUpdate, SavedSearch};

use super::places_repository::PlacesBackend;
use crate::utils::auth::{Identity, SessionContext};

/// Saved places for whoever is signed in.
///
/// Every operation resolves the identity first. Without one nothing reaches
/// the backend and the call reports "nothing happened" (`None`, empty, or
/// `false`). Backend failures are logged and reported the same way, so
/// callers never see an error.
pub struct RecentPlacesStore<B> {
    backend: Arc<B>,
    session: SessionContext,
    recent_limit: usize,
}

impl<B> Clone for RecentPlacesStore<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            session: self.session.clone(),
            recent_limit: self.recent_limit,
        }
    }
}

impl<B: PlacesBackend> RecentPlacesStore<B> {
    pub fn new(backend: Arc<B>, session: SessionContext, recent_limit: usize) -> Self {
        Self {
            backend,
            session,
            recent_limit,
        }
    }

    fn identity(&self, operation: &str) -> Option<Identity> {
        let identity = self.session.current();
        if identity.is_none() {
            tracing::debug!("Skipping {} for anonymous user", operation);
        }
        identity
    }

    pub async fn save_recent_search(
        &self,
        search_query: &str,
        coordinates: Coordinate,
        place_name: &str,
    ) -> Option<SavedSearch> {
        let identity = self.identity("save_recent_search")?;
        match self
            .backend
            .insert_recent_search(&identity.user_id, search_query, coordinates, place_name)
            .await
        {
            Ok(saved) => Some(saved),
            Err(e) => {
                tracing::error!("Error saving recent search: {}", e);
                None
            }
        }
    }

    pub async fn list_recent_searches(&self) -> Vec<SavedSearch> {
        let Some(identity) = self.identity("list_recent_searches") else {
            return Vec::new();
        };
        match self
            .backend
            .recent_searches(&identity.user_id, self.recent_limit)
            .await
        {
            Ok(mut recent) => {
                recent.truncate(self.recent_limit);
                recent
            }
            Err(e) => {
                tracing::error!("Error fetching recent searches: {}", e);
                Vec::new()
            }
        }
    }

    pub async fn add_favorite(
        &self,
        place_name: &str,
        coordinates: Coordinate,
        notes: Option<&str>,
    ) -> Option<FavoritePlace> {
        let identity = self.identity("add_favorite")?;
        match self
            .backend
            .insert_favorite(&identity.user_id, place_name, coordinates, notes)
            .await
        {
            Ok(favorite) => Some(favorite),
            Err(e) => {
                tracing::error!("Error adding favorite: {}", e);
                None
            }
        }
    }

    pub async fn list_favorites(&self) -> Vec<FavoritePlace> {
        let Some(identity) = self.identity("list_favorites") else {
            return Vec::new();
        };
        match self.backend.favorites(&identity.user_id).await {
            Ok(favorites) => favorites,
            Err(e) => {
                tracing::error!("Error fetching favorites: {}", e);
                Vec::new()
            }
        }
    }

    pub async fn update_favorite(&self, id: &str, update: &FavoriteUpdate) -> Option<FavoritePlace> {
        let identity = self.identity("update_favorite")?;
        match self
            .backend
            .update_favorite(&identity.user_id, id, update)
            .await
        {
            Ok(favorite) => Some(favorite),
            Err(e) => {
                tracing::error!("Error updating favorite {}: {}", id, e);
                None
            }
        }
    }

    /// True when the backend reported no error, including for ids that were
    /// already gone.
    pub async fn delete_favorite(&self, id: &str) -> bool {
        let Some(identity) = self.identity("delete_favorite") else {
            return false;
        };
        match self.backend.delete_favorite(&identity.user_id, id).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Error deleting favorite {}: {}", id, e);
                false
            }
        }
    }
}
