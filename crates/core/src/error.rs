//! Error types for the Optimus domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; [`Error`] wraps them all.

use thiserror::Error;

/// The top-level error type for all Optimus operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Store errors ---
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // --- Capability errors ---
    #[error("Capability error: {0}")]
    Capability(#[from] CapabilityError),

    // --- Agent errors ---
    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Missing {0} API key")]
    MissingCredential(String),

    #[error("Unsupported model provider: {0}")]
    UnsupportedProvider(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl ProviderError {
    /// True for failures that stem from local configuration rather than
    /// the remote service. These surface before any request is sent.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::NotConfigured(_) | Self::MissingCredential(_) | Self::UnsupportedProvider(_)
        )
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Embedding generation failed: {0}")]
    EmbeddingFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Failure of a single capability invocation.
///
/// Dispatch never lets one of these escape to the reasoning loop: it is
/// normalized into an error payload carrying [`CapabilityError::error_type`].
#[derive(Debug, Clone, Error)]
pub enum CapabilityError {
    #[error("{0}")]
    PolicyViolation(String),

    #[error("{0}")]
    InvalidArguments(String),

    #[error("{0}")]
    UpstreamFailure(String),

    #[error("Capability not found: {0}")]
    NotFound(String),
}

impl CapabilityError {
    /// Stable error type name used in normalized payloads.
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::PolicyViolation(_) => "PolicyViolation",
            Self::InvalidArguments(_) => "ValidationError",
            Self::UpstreamFailure(_) => "UpstreamFailure",
            Self::NotFound(_) => "UnknownCapability",
        }
    }
}

/// Errors surfaced by the agent session driver to its callers.
#[derive(Debug, Clone, Error)]
pub enum AgentError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Upstream failure: {0}")]
    Upstream(String),
}

impl From<ProviderError> for AgentError {
    fn from(err: ProviderError) -> Self {
        if err.is_configuration() {
            Self::Configuration(err.to_string())
        } else {
            Self::Upstream(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn capability_error_types_are_stable() {
        assert_eq!(
            CapabilityError::PolicyViolation("x".into()).error_type(),
            "PolicyViolation"
        );
        assert_eq!(
            CapabilityError::InvalidArguments("x".into()).error_type(),
            "ValidationError"
        );
        assert_eq!(
            CapabilityError::UpstreamFailure("x".into()).error_type(),
            "UpstreamFailure"
        );
        assert_eq!(
            CapabilityError::NotFound("x".into()).error_type(),
            "UnknownCapability"
        );
    }

    #[test]
    fn provider_configuration_errors_map_to_agent_configuration() {
        let err: AgentError = ProviderError::MissingCredential("OpenAI".into()).into();
        assert!(matches!(err, AgentError::Configuration(_)));
        assert!(err.to_string().contains("Missing OpenAI API key"));

        let err: AgentError = ProviderError::Network("reset".into()).into();
        assert!(matches!(err, AgentError::Upstream(_)));
    }
}
