use serde::Deserialize;
use shared_types::CoordinateError;
use thiserror::Error;

// Body the mapping API sends alongside non-success statuses
#[derive(Deserialize, Debug)]
pub struct ProviderErrorPayload {
    pub message: String,
}

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Underlying request failed: {0}")]
    Request(#[from] reqwest::Error),

    // This variant holds the structured error from the API
    #[error("API Error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse provider response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("No route available: {0}")]
    NoRoute(String),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Stored coordinates are invalid: {0}")]
    Coordinates(#[from] CoordinateError),

    #[error("Record {0} not found")]
    NotFound(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SelectionError {
    #[error("A destination cannot be set before an origin")]
    DestinationWithoutOrigin,
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    #[error("JWT_SECRET is not configured")]
    MissingSecret,

    #[error("Session context was dropped")]
    Closed,
}

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Environment variable {0} is required")]
    Missing(&'static str),

    #[error("Invalid {key} value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}
