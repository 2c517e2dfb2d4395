pub mod auth;

pub use auth::{Identity, SessionContext, SessionSubscription};
