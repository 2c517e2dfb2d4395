pub mod geocode_search;
pub mod route_request;

// Re-export commonly used types
pub use geocode_search::{GeocodeSearchSession, SearchSettings, SearchTicket, SelectedPlace};
pub use route_request::{
    format_distance, format_duration, PlannedRoute, RouteRequestCoordinator, RouteStatus,
    RouteTicket, SelectionPhase, SelectionState,
};
