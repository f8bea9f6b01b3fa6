//! Custom error types for connector operations

use thiserror::Error;

/// Connector-related errors
///
/// Variants only ever carry credential ids, never secret values.
#[derive(Error, Debug)]
pub enum ConnectorError {
    /// No credential has been selected in the provider configuration
    #[error("ModernMT service is not configured")]
    NotConfigured,

    /// The key store has no usable entry for the configured id
    #[error("Credential not found: {id}")]
    CredentialNotFound {
        /// Credential identifier that failed to resolve
        id: String,
    },

    /// Provider answered with an unexpected status
    #[error("API error: {status} - {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Response body or status text
        message: String,
    },

    /// Request never produced a response
    #[error("Network error: {message}")]
    NetworkError {
        /// Transport error text
        message: String,
    },

    /// Response body could not be decoded into a translation
    #[error("Malformed response: {message}")]
    MalformedResponse {
        /// What was wrong with the body
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the invalid setting
        message: String,
    },

    /// Wrapper for anyhow errors
    #[error("Internal error: {0}")]
    InternalError(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl ConnectorError {
    /// Whether this error means the provider could not be reached or refused
    /// the request (as opposed to a bad body or local misconfiguration).
    pub fn is_transport_failure(&self) -> bool {
        matches!(
            self,
            ConnectorError::ApiError { .. } | ConnectorError::NetworkError { .. }
        )
    }
}

impl From<anyhow::Error> for ConnectorError {
    fn from(err: anyhow::Error) -> Self {
        ConnectorError::InternalError(err.to_string())
    }
}

impl From<config::ConfigError> for ConnectorError {
    fn from(err: config::ConfigError) -> Self {
        ConnectorError::ConfigError {
            message: err.to_string(),
        }
    }
}

/// Result type for connector operations
pub type Result<T> = std::result::Result<T, ConnectorError>;
