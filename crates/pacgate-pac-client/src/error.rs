//! PAC client error types.

/// Errors from PAC API calls.
///
/// Every variant names the endpoint it came from so the orchestrator can
/// record a self-explanatory history entry.
#[derive(Debug, thiserror::Error)]
pub enum PacApiError {
    /// HTTP transport error, including timeouts.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    /// The PAC returned a non-2xx status.
    #[error("PAC {endpoint} returned {status}: {body}")]
    ApiError {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// The PAC answered 2xx but refused the request at the business level.
    #[error("PAC {endpoint} rejected the request (code {code}): {message}")]
    Rejected {
        endpoint: String,
        code: String,
        message: String,
    },
    /// Response deserialization failed.
    #[error("failed to deserialize response from {endpoint}: {source}")]
    Deserialization {
        endpoint: String,
        source: reqwest::Error,
    },
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl PacApiError {
    /// Whether the call was abandoned because the request timed out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Http { source, .. } if source.is_timeout())
    }

    /// Endpoint label of the failing call, if the error came from one.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            Self::Http { endpoint, .. }
            | Self::ApiError { endpoint, .. }
            | Self::Rejected { endpoint, .. }
            | Self::Deserialization { endpoint, .. } => Some(endpoint),
            Self::Config(_) => None,
        }
    }
}
