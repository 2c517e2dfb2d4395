use std::future::Future;

use shared_types::{Coordinate, RouteResult, SearchCandidate, TransportMode};

use crate::error::ProviderError;

pub trait GeocodeProvider: Send + Sync + 'static {
    /// Free-text place search. Results come back in provider relevance order,
    /// at most `limit` of them.
    fn search_places(
        &self,
        query: &str,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<SearchCandidate>, ProviderError>> + Send;
}

pub trait DirectionsProvider: Send + Sync + 'static {
    /// Route between two points for the given travel profile.
    fn directions(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        mode: TransportMode,
    ) -> impl Future<Output = Result<RouteResult, ProviderError>> + Send;
}
