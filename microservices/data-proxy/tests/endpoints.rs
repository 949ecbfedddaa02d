//! Router-level tests: admission, cache status headers and error bodies

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use data_proxy::{create_router, AppState, Config, Limiters};
use geowatch_cache::NullStore;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use wiremock::matchers::{method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn app(config: Config) -> Router {
    let state = AppState::with_parts(config, Arc::new(NullStore), Limiters::default()).unwrap();
    create_router(state)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn get_from(uri: &str, ip: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-forwarded-for", ip)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn x_cache(response: &Response) -> &str {
    response.headers()["x-cache"].to_str().unwrap()
}

fn ucdp_page() -> Value {
    json!({
        "TotalCount": 2,
        "TotalPages": 1,
        "Result": [
            {
                "id": 1, "date_start": "2025-03-01", "date_end": "2025-03-01",
                "latitude": 15.5, "longitude": 32.5, "country": "Sudan",
                "side_a": "Government of Sudan", "side_b": "RSF",
                "best": 12, "low": 10, "high": 20, "type_of_violence": 1,
                "source_original": "Radio Dabanga"
            },
            {
                "id": 2, "date_start": "2025-02-01", "date_end": "2025-02-02",
                "latitude": 48.0, "longitude": 37.8, "country": "Ukraine",
                "side_a": "Russia", "side_b": "Ukraine",
                "best": 3, "low": 3, "high": 5, "type_of_violence": 1,
                "source_original": "Wire"
            }
        ]
    })
}

fn ais_snapshot() -> Value {
    json!({
        "status": { "connected": true, "vessels": 1200, "messages": 50000 },
        "disruptions": [],
        "density": [{ "lat": 26.5, "lon": 56.2, "intensity": 0.8 }]
    })
}

#[tokio::test]
async fn test_ucdp_miss_then_memory_hit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/api/gedevents/\d+\.1$"))
        .and(query_param("page", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ucdp_page()))
        .expect(1)
        .mount(&server)
        .await;

    let app = app(Config {
        ucdp_api_base: server.uri(),
        ..Config::default()
    });

    let first = send(&app, get("/api/ucdp-events")).await;
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(x_cache(&first), "MISS");
    assert_eq!(first.headers()[header::CACHE_CONTROL], "public, max-age=3600");
    let body = body_json(first).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["count"], 2);
    assert_eq!(body["data"][0]["country"], "Sudan");

    let second = send(&app, get("/api/ucdp-events")).await;
    assert_eq!(x_cache(&second), "MEMORY-HIT");
}

#[tokio::test]
async fn test_ucdp_upstream_failure_without_copy() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let app = app(Config {
        ucdp_api_base: server.uri(),
        ..Config::default()
    });

    let response = send(&app, get("/api/ucdp-events")).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(x_cache(&response), "ERROR");
    let body = body_json(response).await;
    assert_eq!(
        body["error"],
        "Fetch failed: Unable to fetch UCDP GED metadata from known API versions"
    );
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn test_ais_fallback_sequence() {
    let relay = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ais/snapshot"))
        .and(query_param("candidates", "false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ais_snapshot()))
        .up_to_n_times(1)
        .mount(&relay)
        .await;
    Mock::given(method("GET"))
        .and(path("/ais/snapshot"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&relay)
        .await;

    let app = app(Config {
        ws_relay_url: Some(relay.uri()),
        ..Config::default()
    });

    let fresh = send(&app, get("/api/ais-snapshot")).await;
    assert_eq!(fresh.status(), StatusCode::OK);
    assert_eq!(x_cache(&fresh), "MISS");
    assert_eq!(fresh.headers()[header::CACHE_CONTROL], "public, max-age=8");
    assert_eq!(body_json(fresh).await, ais_snapshot());

    let hit = send(&app, get("/api/ais-snapshot")).await;
    assert_eq!(x_cache(&hit), "MEMORY-HIT");

    // Past the 8s TTL but inside the 60s in-process window
    tokio::time::pause();
    tokio::time::advance(Duration::from_secs(9)).await;
    tokio::time::resume();

    let fallback = send(&app, get("/api/ais-snapshot")).await;
    assert_eq!(fallback.status(), StatusCode::OK);
    assert_eq!(x_cache(&fallback), "MEMORY-ERROR-FALLBACK");
    assert_eq!(body_json(fallback).await, ais_snapshot());

    tokio::time::pause();
    tokio::time::advance(Duration::from_secs(60)).await;
    tokio::time::resume();

    let failed = send(&app, get("/api/ais-snapshot")).await;
    assert_eq!(failed.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(x_cache(&failed), "ERROR");
    assert_eq!(
        body_json(failed).await,
        json!({ "error": "Fetch failed: AIS relay HTTP 500" })
    );
}

#[tokio::test]
async fn test_ais_without_relay() {
    let app = app(Config::default());

    let response = send(&app, get("/api/ais-snapshot?candidates=true")).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(x_cache(&response), "NO-RELAY-CONFIG");
    assert_eq!(
        body_json(response).await,
        json!({ "error": "AIS relay not configured" })
    );
}

#[tokio::test]
async fn test_wrong_method_keeps_empty_collections() {
    let app = app(Config::default());

    let response = send(&app, post_json("/api/ucdp-events", json!({}))).await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_METHODS],
        "GET, OPTIONS"
    );
    assert_eq!(
        body_json(response).await,
        json!({ "error": "Method not allowed", "data": [] })
    );

    let response = send(&app, get("/api/groq-summarize")).await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(
        body_json(response).await,
        json!({ "error": "Method not allowed", "fallback": true })
    );
}

#[tokio::test]
async fn test_origin_checks() {
    let app = app(Config {
        allowed_origins: vec!["https://*.geowatch.example".to_string()],
        ..Config::default()
    });

    let request = Request::builder()
        .uri("/api/unhcr-population")
        .header(header::ORIGIN, "https://evil.example")
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
    assert_eq!(
        body_json(response).await,
        json!({ "error": "Origin not allowed", "countries": [], "topFlows": [] })
    );

    let preflight = Request::builder()
        .method("OPTIONS")
        .uri("/api/climate-anomalies")
        .header(header::ORIGIN, "https://app.geowatch.example")
        .body(Body::empty())
        .unwrap();
    let response = send(&app, preflight).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://app.geowatch.example"
    );
    assert_eq!(response.headers()[header::ACCESS_CONTROL_MAX_AGE], "86400");

    let rejected = Request::builder()
        .method("OPTIONS")
        .uri("/api/climate-anomalies")
        .header(header::ORIGIN, "https://evil.example")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, rejected).await.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_rate_limit_per_client() {
    let app = app(Config::default());

    for _ in 0..30 {
        let response = send(&app, get_from("/api/worldpop-exposure", "203.0.113.7")).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let limited = send(&app, get_from("/api/worldpop-exposure", "203.0.113.7, 10.0.0.1")).await;
    assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(limited.headers()[header::RETRY_AFTER], "60");
    assert_eq!(body_json(limited).await, json!({ "error": "Rate limited" }));

    let other = send(&app, get_from("/api/worldpop-exposure", "198.51.100.2")).await;
    assert_eq!(other.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_worldpop_modes() {
    let app = app(Config::default());

    let countries = send(&app, get("/api/worldpop-exposure")).await;
    assert_eq!(x_cache(&countries), "MISS");
    assert_eq!(countries.headers()[header::CACHE_CONTROL], "public, max-age=86400");
    let body = body_json(countries).await;
    assert_eq!(body["success"], true);
    assert!(!body["countries"].as_array().unwrap().is_empty());

    let again = send(&app, get("/api/worldpop-exposure?mode=countries")).await;
    assert_eq!(x_cache(&again), "MEMORY-HIT");

    let exposure = send(
        &app,
        get("/api/worldpop-exposure?mode=exposure&lat=15.5&lon=32.5&radius=25"),
    )
    .await;
    assert_eq!(exposure.status(), StatusCode::OK);
    assert!(exposure.headers().get("x-cache").is_none());
    assert_eq!(exposure.headers()[header::CACHE_CONTROL], "public, max-age=3600");
    let body = body_json(exposure).await;
    assert_eq!(body["exposureRadiusKm"], 25.0);

    let bad = send(&app, get("/api/worldpop-exposure?mode=exposure&lat=abc&lon=32")).await;
    assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(bad).await, json!({ "error": "lat and lon required" }));
}

#[tokio::test]
async fn test_summarize_requires_key_and_headlines() {
    let unconfigured = app(Config::default());
    let response = send(
        &unconfigured,
        post_json("/api/groq-summarize", json!({ "headlines": ["A"] })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        body_json(response).await,
        json!({ "error": "Groq API key not configured", "fallback": true })
    );

    let configured = app(Config {
        groq_api_key: Some("gsk_test".to_string()),
        ..Config::default()
    });
    for body in [json!({}), json!({ "headlines": [] }), json!({ "headlines": "nope" })] {
        let response = send(&configured, post_json("/api/groq-summarize", body)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({ "error": "Headlines array required", "fallback": true })
        );
    }
}

#[tokio::test]
async fn test_summarize_generates_then_serves_from_cache() {
    let groq = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "content": " Fighting intensified around the port. " } }],
            "usage": { "total_tokens": 87 }
        })))
        .expect(1)
        .mount(&groq)
        .await;

    let app = app(Config {
        groq_api_key: Some("gsk_test".to_string()),
        groq_api_url: format!("{}/openai/v1/chat/completions", groq.uri()),
        ..Config::default()
    });

    let first = send(
        &app,
        post_json("/api/groq-summarize", json!({ "headlines": ["Port shelled", "Talks stall"] })),
    )
    .await;
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(x_cache(&first), "MISS");
    assert_eq!(
        body_json(first).await,
        json!({
            "summary": "Fighting intensified around the port.",
            "model": "llama-3.1-8b-instant",
            "provider": "groq",
            "cached": false,
            "tokens": 87
        })
    );

    // Same headlines, different order
    let second = send(
        &app,
        post_json("/api/groq-summarize", json!({ "headlines": ["Talks stall", "Port shelled"] })),
    )
    .await;
    assert_eq!(x_cache(&second), "MEMORY-HIT");
    let body = body_json(second).await;
    assert_eq!(body["provider"], "cache");
    assert_eq!(body["cached"], true);
}

#[tokio::test]
async fn test_summarize_upstream_rate_limit() {
    let groq = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&groq)
        .await;

    let app = app(Config {
        groq_api_key: Some("gsk_test".to_string()),
        groq_api_url: groq.uri(),
        ..Config::default()
    });

    let response = send(
        &app,
        post_json("/api/groq-summarize", json!({ "headlines": ["A"], "mode": "analysis" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        body_json(response).await,
        json!({ "error": "Rate limited", "fallback": true })
    );
}

#[tokio::test]
async fn test_health_and_stats() {
    let app = app(Config::default());

    let health = send(&app, get("/health")).await;
    assert_eq!(health.status(), StatusCode::OK);
    assert_eq!(body_json(health).await["service_id"], "data-proxy");

    send(&app, get("/api/ais-snapshot")).await;
    let stats = body_json(send(&app, get("/stats")).await).await;
    assert_eq!(stats["durable_backend"], "none");
    assert_eq!(
        stats["cache"]["/api/ais-snapshot"]["by_status"]["NO-RELAY-CONFIG"],
        1
    );
}
