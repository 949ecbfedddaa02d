//! DashboardClient against a mocked data proxy

use geowatch_sdk::{BreakerConfig, CircuitState, DashboardClient, ExposureTarget};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> DashboardClient {
    DashboardClient::with_client(
        reqwest::Client::new(),
        &server.uri(),
        BreakerConfig {
            max_failures: 2,
            cooldown: Duration::from_secs(300),
        },
    )
    .unwrap()
}

fn ucdp_body() -> serde_json::Value {
    json!({
        "success": true,
        "count": 1,
        "version": "25.1",
        "cached_at": "2025-01-01T00:00:00Z",
        "data": [{
            "id": "1",
            "date_start": "2024-05-01",
            "date_end": "2024-05-01",
            "latitude": 15.0,
            "longitude": 32.0,
            "country": "Sudan",
            "side_a": "A",
            "side_b": "B",
            "deaths_best": 10,
            "deaths_low": 8,
            "deaths_high": 12,
            "type_of_violence": "state-based",
            "source_original": "wire"
        }]
    })
}

#[tokio::test]
async fn test_fetches_ucdp_events() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/ucdp-events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ucdp_body()))
        .mount(&server)
        .await;

    let response = client(&server).fetch_ucdp_events().await;
    assert!(response.success);
    assert_eq!(response.data.len(), 1);
    assert_eq!(response.data[0].country, "Sudan");
}

#[tokio::test]
async fn test_breaker_opens_and_stops_calling() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/climate-anomalies"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let client = client(&server);
    for _ in 0..5 {
        let response = client.fetch_climate_anomalies().await;
        assert!(!response.success);
        assert!(response.anomalies.is_empty());
    }

    let unhealthy = client.unhealthy_feeds();
    assert_eq!(unhealthy.len(), 1);
    assert_eq!(unhealthy[0].state, CircuitState::Open);
    // dropping the server verifies the expectation of exactly two calls
}

#[tokio::test]
async fn test_deduplicates_against_secondary_source() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/ucdp-events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ucdp_body()))
        .mount(&server)
        .await;

    let acled: Vec<geowatch_geo::AcledEvent> = serde_json::from_value(json!([{
        "latitude": "15.02",
        "longitude": "32.0",
        "event_date": "2024-05-03",
        "fatalities": "8"
    }]))
    .unwrap();

    let events = client(&server).fetch_deduplicated_events(&acled).await;
    assert!(events.is_empty());
}

#[tokio::test]
async fn test_enrichment_skips_failures_and_sorts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/worldpop-exposure"))
        .and(query_param("lat", "48"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "exposedPopulation": 481000,
            "exposureRadiusKm": 50.0,
            "nearestCountry": "UKR",
            "densityPerKm2": 61
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/worldpop-exposure"))
        .and(query_param("lat", "15"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "exposedPopulation": 2000000,
            "exposureRadiusKm": 100.0,
            "nearestCountry": "SDN",
            "densityPerKm2": 26
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/worldpop-exposure"))
        .and(query_param("lat", "0"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let targets = vec![
        ExposureTarget {
            id: "a".into(),
            name: "Ukraine".into(),
            event_type: "conflict".into(),
            lat: 48.0,
            lon: 31.0,
        },
        ExposureTarget {
            id: "b".into(),
            name: "Sudan".into(),
            event_type: "flood".into(),
            lat: 15.0,
            lon: 32.0,
        },
        ExposureTarget {
            id: "c".into(),
            name: "Nowhere".into(),
            event_type: "fire".into(),
            lat: 0.0,
            lon: 0.0,
        },
    ];

    let exposures = client(&server).enrich_events_with_exposure(&targets).await;
    assert_eq!(exposures.len(), 2);
    assert_eq!(exposures[0].event_id, "b");
    assert_eq!(exposures[0].exposure_radius_km, 100.0);
    assert_eq!(exposures[1].event_id, "a");
    assert_eq!(exposures[1].exposure_radius_km, 50.0);
}

#[tokio::test]
async fn test_summary_declined_returns_none() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/groq-summarize"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({
            "error": "Groq API key not configured",
            "fallback": true
        })))
        .mount(&server)
        .await;

    let summary = client(&server)
        .summarize(&["Ceasefire talks resume".to_string()], "brief")
        .await;
    assert!(summary.is_none());
}

#[test]
fn test_rejects_non_http_base_url() {
    assert!(DashboardClient::new("ftp://example.org").is_err());
    tokio_test::assert_ok!(DashboardClient::new("http://localhost:8080/"));
}
