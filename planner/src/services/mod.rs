pub mod mapbox;
pub mod provider;

pub use mapbox::MapboxClient;
pub use provider::{DirectionsProvider, GeocodeProvider};
