//! Error types for the data proxy

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use geowatch_cache::FetchError;
use serde_json::{json, Map, Value};

/// Result type alias
pub type Result<T> = std::result::Result<T, ApiError>;

/// Seconds a rate-limited client is told to wait
pub const RETRY_AFTER_SECS: u64 = 60;

/// Data proxy error types
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Origin not allowed")]
    OriginNotAllowed,

    #[error("Rate limited")]
    RateLimited,

    #[error("{0}")]
    NotConfigured(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{message}")]
    Upstream { status: StatusCode, message: String },
}

impl ApiError {
    pub fn upstream(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Upstream {
            status,
            message: message.into(),
        }
    }

    /// Map a failed fetch cycle to the endpoint's error status
    pub fn from_fetch(error: &FetchError, error_status: StatusCode) -> Self {
        match error {
            FetchError::NotConfigured(message) => Self::NotConfigured(message.clone()),
            other => Self::upstream(error_status, format!("Fetch failed: {}", other)),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::OriginNotAllowed => StatusCode::FORBIDDEN,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Upstream { status, .. } => *status,
        }
    }

    /// Attach extra body fields, e.g. the empty collections a dashboard
    /// panel expects or the `fallback` hint.
    pub fn with_fields(self, fields: Value) -> ErrorResponse {
        ErrorResponse {
            error: self,
            fields,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.with_fields(Value::Null).into_response()
    }
}

/// An [`ApiError`] with endpoint-specific body fields
#[derive(Debug)]
pub struct ErrorResponse {
    pub error: ApiError,
    fields: Value,
}

impl From<ApiError> for ErrorResponse {
    fn from(error: ApiError) -> Self {
        error.with_fields(Value::Null)
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        let status = self.error.status_code();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self.error, "request failed");
        }

        let mut body = Map::new();
        body.insert("error".to_string(), json!(self.error.to_string()));
        if let Value::Object(fields) = self.fields {
            body.extend(fields);
        }

        let mut response = (status, Json(Value::Object(body))).into_response();
        if matches!(self.error, ApiError::RateLimited) {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(RETRY_AFTER_SECS));
        }
        response
    }
}
