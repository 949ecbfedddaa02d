//! Request admission for the proxy endpoints
//!
//! Order: preflight, method, origin, per-client rate limit. Every response,
//! including rejections, carries the endpoint's CORS headers.

use axum::{
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::Value;
use std::future::Future;
use tracing::debug;

use crate::error::ApiError;
use crate::security::{client_ip, RateLimitResult, RateLimiter};
use crate::AppState;

/// Static description of one endpoint's gate
#[derive(Clone)]
pub struct Route {
    pub method: Method,
    /// `Access-Control-Allow-Methods` value
    pub cors_methods: &'static str,
    /// Fields added to every error body, e.g. `{"data": []}`
    pub empty_body: fn() -> Value,
}

impl Route {
    pub const fn get(empty_body: fn() -> Value) -> Self {
        Self {
            method: Method::GET,
            cors_methods: "GET, OPTIONS",
            empty_body,
        }
    }

    pub const fn post(empty_body: fn() -> Value) -> Self {
        Self {
            method: Method::POST,
            cors_methods: "POST, OPTIONS",
            empty_body,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Admission {
    Proceed,
    /// Answer an `OPTIONS` request with this status and no body
    Preflight(StatusCode),
}

pub fn admit(
    state: &AppState,
    route: &Route,
    method: &Method,
    headers: &HeaderMap,
    limiter: Option<&RateLimiter>,
) -> Result<Admission, ApiError> {
    let disallowed_origin = state.cors.is_disallowed(headers);

    if method == Method::OPTIONS {
        let status = if disallowed_origin {
            StatusCode::FORBIDDEN
        } else {
            StatusCode::NO_CONTENT
        };
        return Ok(Admission::Preflight(status));
    }

    if *method != route.method {
        return Err(ApiError::MethodNotAllowed);
    }

    if disallowed_origin {
        return Err(ApiError::OriginNotAllowed);
    }

    if let Some(limiter) = limiter {
        let ip = client_ip(headers);
        if let RateLimitResult::Exceeded { retry_after } = limiter.evaluate(&ip) {
            debug!(client = %ip, retry_after, "client rate limited");
            return Err(ApiError::RateLimited);
        }
    }

    Ok(Admission::Proceed)
}

/// Run `serve` when the request is admitted and attach CORS headers to
/// whatever comes back.
pub async fn guarded<F, Fut>(
    state: &AppState,
    route: Route,
    method: &Method,
    headers: &HeaderMap,
    limiter: Option<&RateLimiter>,
    serve: F,
) -> Response
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Response>,
{
    let cors = state.cors.response_headers(headers, route.cors_methods);

    let mut response = match admit(state, &route, method, headers, limiter) {
        Ok(Admission::Proceed) => serve().await,
        Ok(Admission::Preflight(status)) => status.into_response(),
        Err(e) => e.with_fields((route.empty_body)()).into_response(),
    };

    response.headers_mut().extend(cors);
    response
}

pub fn no_fields() -> Value {
    Value::Null
}
