use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Coordinate;

/// One geocoder hit. Ordering of a result list is the provider's relevance rank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchCandidate {
    pub id: String,
    pub label: String,
    pub coordinate: Coordinate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedSearch {
    pub id: String,
    pub search_query: String,
    pub place_name: String,
    pub coordinates: Coordinate,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoritePlace {
    pub id: String,
    pub place_name: String,
    pub coordinates: Coordinate,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Editable fields of a favorite. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FavoriteUpdate {
    pub place_name: Option<String>,
    pub notes: Option<String>,
}

impl FavoriteUpdate {
    pub fn is_empty(&self) -> bool {
        self.place_name.is_none() && self.notes.is_none()
    }

    pub fn apply_to(&self, favorite: &mut FavoritePlace) {
        if let Some(name) = &self.place_name {
            favorite.place_name = name.clone();
        }
        if let Some(notes) = &self.notes {
            favorite.notes = Some(notes.clone());
        }
    }
}
