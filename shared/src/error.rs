//! Error types for the lawn-care backend.

use thiserror::Error;

use crate::schema::SchemaDefinitionError;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while generating, relaying or serving lawn-care data.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed schema description
    #[error("Schema definition error: {0}")]
    SchemaDefinition(#[from] SchemaDefinitionError),

    /// Transport failure before any HTTP response was received
    #[error("Network error: {0}")]
    Network(String),

    /// The call exceeded its deadline
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Remote service answered with a non-2xx status
    #[error("Remote service returned {status}: {body}")]
    RemoteService { status: u16, body: String },

    /// Response body could not be decoded
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for transport-level failures, timeouts included.
    pub fn is_network(&self) -> bool {
        matches!(self, Error::Network(_) | Error::Timeout(_))
    }

    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Validation(_) => 400,
            Error::Network(_) | Error::RemoteService { .. } | Error::MalformedResponse(_) => 502,
            Error::Config(_) => 503,
            Error::Timeout(_) => 504,
            _ => 500,
        }
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        Error::Validation(errors.to_string())
    }
}
