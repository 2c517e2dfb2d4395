// Mapbox geocoding + directions client
// Maps the loosely-typed JSON responses into the strict shared types

use reqwest::Client;
use serde::Deserialize;
use shared_types::{Coordinate, RouteResult, SearchCandidate, TransportMode};

use super::provider::{DirectionsProvider, GeocodeProvider};
use crate::{
    config::PlannerConfig,
    error::{ProviderError, ProviderErrorPayload},
};

// --- Data Structures for parsing Mapbox responses ---
#[derive(Deserialize, Debug)]
struct GeocodeResponse {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Deserialize, Debug)]
struct Feature {
    id: String,
    #[serde(default)]
    place_name: String,
    #[serde(default)]
    center: Vec<f64>,
}

#[derive(Deserialize, Debug)]
struct DirectionsResponse {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    routes: Vec<Route>,
}

#[derive(Deserialize, Debug)]
struct Route {
    geometry: LineString,
    duration: f64,
    distance: f64,
}

#[derive(Deserialize, Debug)]
struct LineString {
    #[serde(default)]
    coordinates: Vec<Vec<f64>>,
}

#[derive(Clone)]
pub struct MapboxClient {
    client: Client,
    access_token: String,
    base_url: String,
    country: String,
}

impl MapboxClient {
    pub fn new(config: &PlannerConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            client: Client::builder().timeout(config.http_timeout).build()?,
            access_token: config.mapbox_token.clone(),
            base_url: config.mapbox_base_url.trim_end_matches('/').to_string(),
            country: config.geocode_country.clone(),
        })
    }

    fn geocode_url(&self, query: &str, limit: usize) -> String {
        format!(
            "{}/geocoding/v5/mapbox.places/{}.json?access_token={}&country={}&limit={}",
            self.base_url,
            urlencoding::encode(query),
            urlencoding::encode(&self.access_token),
            urlencoding::encode(&self.country),
            limit
        )
    }

    fn directions_url(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        mode: TransportMode,
    ) -> String {
        format!(
            "{}/directions/v5/mapbox/{}/{},{};{},{}?steps=true&geometries=geojson&access_token={}",
            self.base_url,
            mode.profile(),
            origin.lon(),
            origin.lat(),
            destination.lon(),
            destination.lat(),
            urlencoding::encode(&self.access_token)
        )
    }

    async fn get_text(&self, url: &str) -> Result<String, ProviderError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            // Try to parse the structured error first
            let message = match serde_json::from_str::<ProviderErrorPayload>(&text) {
                Ok(payload) => payload.message,
                Err(_) => {
                    tracing::error!(
                        "Mapbox returned non-success status: {}. Unparseable Body: {}",
                        status,
                        text
                    );
                    text
                }
            };
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(text)
    }
}

impl GeocodeProvider for MapboxClient {
    async fn search_places(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchCandidate>, ProviderError> {
        tracing::debug!("[PROVIDER] Calling mapbox geocode for query: {:?}", query);
        let text = self.get_text(&self.geocode_url(query, limit)).await?;
        let candidates = parse_geocode_response(&text, limit)?;
        tracing::debug!("Geocode {:?} returned {} candidates", query, candidates.len());
        Ok(candidates)
    }
}

impl DirectionsProvider for MapboxClient {
    async fn directions(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        mode: TransportMode,
    ) -> Result<RouteResult, ProviderError> {
        tracing::debug!(
            "[PROVIDER] Calling mapbox directions for {} -> {} ({})",
            origin,
            destination,
            mode
        );
        let text = self
            .get_text(&self.directions_url(origin, destination, mode))
            .await?;
        parse_directions_response(&text)
    }
}

/// Keeps features with a usable center, in provider order, up to `limit`.
pub fn parse_geocode_response(body: &str, limit: usize) -> Result<Vec<SearchCandidate>, ProviderError> {
    let response: GeocodeResponse = serde_json::from_str(body)?;

    Ok(response
        .features
        .into_iter()
        .filter_map(|feature| {
            let coordinate = match feature.center.as_slice() {
                [lon, lat] => Coordinate::clamped(*lon, *lat),
                _ => None,
            };
            match coordinate {
                Some(coordinate) => Some(SearchCandidate {
                    id: feature.id,
                    label: feature.place_name,
                    coordinate,
                }),
                None => {
                    tracing::warn!("Skipping geocode feature {} without a usable center", feature.id);
                    None
                }
            }
        })
        .take(limit)
        .collect())
}

/// Takes `routes[0]`; anything but `code == "Ok"` with at least one route is
/// reported as no route.
pub fn parse_directions_response(body: &str) -> Result<RouteResult, ProviderError> {
    let response: DirectionsResponse = serde_json::from_str(body)?;

    if let Some(code) = response.code.as_deref().filter(|code| *code != "Ok") {
        let detail = response
            .message
            .map(|message| format!("{}: {}", code, message))
            .unwrap_or_else(|| code.to_string());
        return Err(ProviderError::NoRoute(detail));
    }

    let route = response
        .routes
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::NoRoute("No route found in success response".to_string()))?;

    let geometry: Vec<Coordinate> = route
        .geometry
        .coordinates
        .iter()
        .filter_map(|point| match point.as_slice() {
            [lon, lat, ..] => Coordinate::clamped(*lon, *lat),
            _ => None,
        })
        .collect();

    if geometry.is_empty() {
        return Err(ProviderError::NoRoute("Route geometry was empty".to_string()));
    }

    Ok(RouteResult::new(geometry, route.duration, route.distance))
}
