use std::{env, fmt::Display, str::FromStr, time::Duration};

use shared_types::Coordinate;
use tracing::{debug, info};

use crate::{
    components::SearchSettings,
    error::ConfigError,
    map::{ControllerSettings, MapSettings},
};

const DEFAULT_BASE_URL: &str = "https://api.mapbox.com";

#[derive(Debug, Clone)]
pub struct PlannerConfig {
    pub mapbox_token: String,
    pub mapbox_base_url: String,
    /// `None` selects the in-memory places backend.
    pub database_url: Option<String>,
    pub jwt_secret: Option<String>,
    pub geocode_country: String,
    pub search: SearchSettings,
    pub recent_search_limit: usize,
    pub initial_center: Coordinate,
    pub initial_zoom: f64,
    pub http_timeout: Duration,
}

impl PlannerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let mapbox_token = var("MAPBOX_TOKEN").ok_or(ConfigError::Missing("MAPBOX_TOKEN"))?;

        let debounce_ms: u64 = try_load(&var, "SEARCH_DEBOUNCE_MS", "300")?;
        let search = SearchSettings {
            debounce: Duration::from_millis(debounce_ms),
            min_chars: try_load(&var, "SEARCH_MIN_CHARS", "2")?,
            page_size: try_load(&var, "SEARCH_PAGE_SIZE", "5")?,
        };
        if search.page_size == 0 {
            return Err(ConfigError::Invalid {
                key: "SEARCH_PAGE_SIZE",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let initial_zoom: f64 = try_load(&var, "INITIAL_ZOOM", "10")?;
        if !(0.0..=22.0).contains(&initial_zoom) {
            return Err(ConfigError::Invalid {
                key: "INITIAL_ZOOM",
                value: initial_zoom.to_string(),
                reason: "zoom must be between 0 and 22".to_string(),
            });
        }

        let database_url = var("DATABASE_URL");
        if database_url.is_none() {
            info!("DATABASE_URL not set, saved places are kept in memory");
        }

        Ok(Self {
            mapbox_token,
            mapbox_base_url: var("MAPBOX_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            database_url,
            jwt_secret: var("JWT_SECRET"),
            geocode_country: var("GEOCODE_COUNTRY").unwrap_or_else(|| "IL".to_string()),
            search,
            recent_search_limit: try_load(&var, "RECENT_SEARCH_LIMIT", "10")?,
            initial_center: try_load(&var, "INITIAL_CENTER", "(34.7818,32.0853)")?,
            initial_zoom,
            http_timeout: Duration::from_secs(15),
        })
    }

    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            map: MapSettings {
                initial_center: self.initial_center,
                initial_zoom: self.initial_zoom,
                focus_zoom: 14.0,
                fit_padding: 50,
            },
            search: self.search.clone(),
            recent_limit: self.recent_search_limit,
        }
    }
}

fn try_load<T, F>(var: &F, key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    let raw = var(key).unwrap_or_else(|| {
        debug!("{key} not set, using default: {default}");
        default.to_string()
    });

    match raw.trim().parse::<T>() {
        Ok(value) => Ok(value),
        Err(e) => Err(ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value: raw,
        }),
    }
}
