//! Error types for the meditrack_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for meditrack_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A request failed client-side checks before being sent
    #[error("Validation error: {0}")]
    Validation(String),

    /// No bearer token is held by the session
    #[error("Not logged in. Run `meditrack login` first.")]
    NotAuthenticated,

    /// The backend rejected the token (HTTP 401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The current user lacks the role for an operation (HTTP 403 or local check)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Any other non-success response from the backend
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Transport failure talking to the backend
    #[error("HTTP error: {0}")]
    Http(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
