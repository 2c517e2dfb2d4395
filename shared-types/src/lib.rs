mod coordinate;
mod places;
mod route;

pub use coordinate::{Bounds, Coordinate, CoordinateError};
pub use places::{FavoritePlace, FavoriteUpdate, SavedSearch, SearchCandidate};
pub use route::{RouteResult, TransportMode, UnknownTransportMode};
