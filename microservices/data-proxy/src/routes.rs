//! Router configuration for the data proxy

use axum::{
    extract::Request,
    http::HeaderValue,
    middleware::{self, Next},
    response::Response,
    routing::{any, get},
    Router,
};
use tracing::Instrument;
use uuid::Uuid;

use crate::handlers;
use crate::sources::{ais, climate, summarize, ucdp, unhcr, worldpop};
use crate::AppState;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Create the main router with all routes.
///
/// Data endpoints take every method so the gate can answer preflights and
/// wrong methods with the endpoint's own body and CORS headers.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health & Metrics
        .route("/health", get(handlers::health))
        .route("/ready", get(handlers::ready))
        .route("/stats", get(handlers::stats))
        // Data endpoints
        .route(ucdp::ENDPOINT, any(handlers::ucdp_events))
        .route(unhcr::ENDPOINT, any(handlers::unhcr_population))
        .route(climate::ENDPOINT, any(handlers::climate_anomalies))
        .route(worldpop::ENDPOINT, any(handlers::worldpop_exposure))
        .route(ais::ENDPOINT, any(handlers::ais_snapshot))
        .route(summarize::ENDPOINT, any(handlers::groq_summarize))
        .layer(middleware::from_fn(request_id))
        .with_state(state)
}

/// Tag each request with an id, reusing the caller's when present
async fn request_id(request: Request, next: Next) -> Response {
    let id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let span = tracing::info_span!(
        "request",
        request_id = %id,
        method = %request.method(),
        path = %request.uri().path(),
    );

    let mut response = next.run(request).instrument(span).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}
