pub mod memory;
pub mod places_repository;
pub mod pool;
pub mod store;

pub use memory::InMemoryPlacesBackend;
pub use places_repository::{PgPlacesRepository, PlacesBackend};
pub use store::RecentPlacesStore;
