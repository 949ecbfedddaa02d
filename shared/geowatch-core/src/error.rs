//! Error types for Geowatch services

use thiserror::Error;

pub type Result<T> = std::result::Result<T, GeowatchError>;

#[derive(Error, Debug)]
pub enum GeowatchError {
    /// Required upstream or service configuration is missing. Never retried.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A payload from a cache tier or upstream did not have the expected shape.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Non-2xx response or transport failure talking to a third-party API.
    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Origin not allowed: {0}")]
    Forbidden(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Timeout: {0}")]
    Timeout(String),
}

impl GeowatchError {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) | Self::BadRequest(_) => 400,
            Self::Forbidden(_) => 403,
            Self::RateLimited(_) => 429,
            Self::Upstream(_) | Self::Network(_) => 502,
            Self::Config(_) | Self::Unavailable(_) => 503,
            Self::Timeout(_) => 504,
            Self::Internal(_) => 500,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG_ERROR",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Upstream(_) => "UPSTREAM_ERROR",
            Self::Network(_) => "NETWORK_ERROR",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::RateLimited(_) => "RATE_LIMITED",
            Self::Unavailable(_) => "UNAVAILABLE",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Timeout(_) => "TIMEOUT",
        }
    }

    /// Whether the stale-fallback chain may absorb this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::Upstream(_) | Self::Network(_) | Self::Timeout(_)
        )
    }
}

impl From<std::io::Error> for GeowatchError {
    fn from(err: std::io::Error) -> Self {
        GeowatchError::Network(err.to_string())
    }
}
