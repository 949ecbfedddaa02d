//! Error types for the cache layer

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CacheError>;

/// Durable-tier failures. Always logged and treated as a miss by callers.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Durable cache transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Durable cache returned HTTP {0}")]
    Status(u16),

    #[error("Durable cache protocol error: {0}")]
    Protocol(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Why a JSON payload was rejected by a source's decoder
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("payload is not a JSON object")]
    NotAnObject,

    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("field `{field}` is not {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },

    #[error("malformed payload: {0}")]
    Malformed(String),
}

/// Failure of an upstream fetch cycle.
///
/// `Clone` because a coalesced fetch hands the same outcome to every waiter.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Required connection settings are missing; never retried or masked.
    #[error("{0}")]
    NotConfigured(String),

    #[error("{message}")]
    Upstream { status: Option<u16>, message: String },

    #[error("invalid upstream payload: {0}")]
    Decode(#[from] DecodeError),

    #[error("upstream timed out: {0}")]
    Timeout(String),
}

impl FetchError {
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream {
            status: None,
            message: message.into(),
        }
    }

    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Upstream {
            status: Some(status),
            message: message.into(),
        }
    }

    /// HTTP status reported by the upstream, if there was a response at all
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            Self::Upstream { status, .. } => *status,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::Timeout(err.to_string());
        }
        Self::Upstream {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}
