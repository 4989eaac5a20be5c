use super::capability::Capability;
use thiserror::Error;

/// Errors returned by a single beacon node endpoint.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum NodeError {
    /// Request exceeded the configured timeout duration.
    #[error("Request timeout")]
    Timeout,

    /// Failed to establish a connection to the endpoint.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Non-2xx HTTP status. First field is the status code, second the body.
    #[error("HTTP error {0}: {1}")]
    Http(u16, String),

    /// Network-level error from the underlying HTTP client.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Response could not be parsed or was semantically malformed.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The endpoint does not implement this operation.
    #[error("Operation {0} is not supported by this endpoint")]
    Unsupported(Capability),

    /// Failure injected by a test decorator.
    #[error("Injected failure")]
    Injected,

    /// The endpoint client was constructed with invalid parameters.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Failure reported by a nested multi-endpoint client.
    #[error("Cluster error: {0}")]
    Cluster(String),
}

impl NodeError {
    /// Returns `true` if the same call may succeed on retry or on another endpoint.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::Connection(_) | Self::Network(_) | Self::Injected => true,
            Self::Http(status, _) => (500..=599).contains(status) || *status == 429,
            Self::Cluster(_) => true,
            Self::InvalidResponse(_) | Self::Unsupported(_) | Self::Configuration(_) => false,
        }
    }

    /// Returns `true` if this failure says something about the endpoint's health
    /// and should trigger an out-of-cycle probe.
    ///
    /// Client-side 4xx responses (bad input) and capability gaps are not the
    /// endpoint's fault.
    #[must_use]
    pub fn should_demote(&self) -> bool {
        match self {
            Self::Http(status, _) => !(400..=499).contains(status) || *status == 429,
            Self::Unsupported(_) | Self::Configuration(_) => false,
            _ => true,
        }
    }
}

/// Convenience alias for results of single-endpoint calls.
pub type NodeResult<T> = Result<T, NodeError>;
