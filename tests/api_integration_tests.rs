//! Integration Tests for API Endpoints
//!
//! Tests full request/response cycle for each endpoint.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;
use url::Url;

use prewarm::config::{Config, PrefetchLimits};
use prewarm::network::NetworkMonitor;
use prewarm::route_config::{RouteRule, RouteTable};
use prewarm::transport::{InstantTransport, PrefetchTransport};
use prewarm::{create_router, AppState, PrefetchScheduler};

// == Helper Functions ==

fn app_with(
    transport: Arc<dyn PrefetchTransport>,
    limits: PrefetchLimits,
    routes: RouteTable,
) -> Router {
    let config = Config::default();
    let scheduler = Arc::new(PrefetchScheduler::new(
        Url::parse("http://localhost:8080").unwrap(),
        config.default_ttl_ms,
        limits,
        routes,
        NetworkMonitor::new(),
        transport,
    ));
    create_router(AppState::new(scheduler, &config))
}

fn create_test_app() -> Router {
    app_with(
        Arc::new(InstantTransport::new()),
        PrefetchLimits::default(),
        RouteTable::default(),
    )
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn post_json(app: &Router, uri: &str, body: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

// == Prefetch Endpoint Tests ==

#[tokio::test]
async fn test_prefetch_endpoint_success() {
    let app = create_test_app();

    let (status, json) = post_json(&app, "/prefetch", r#"{"url":"/pricing"}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "success");
    assert_eq!(json["url"], "http://localhost:8080/pricing");
    assert_eq!(json["from_cache"], false);
}

#[tokio::test]
async fn test_prefetch_endpoint_second_call_is_cached() {
    let app = create_test_app();

    post_json(&app, "/prefetch", r#"{"url":"/pricing"}"#).await;
    let (status, json) = post_json(&app, "/prefetch", r#"{"url":"/pricing"}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "cached");
    assert_eq!(json["from_cache"], true);
    assert_eq!(json["duration_ms"], 0);
}

#[tokio::test]
async fn test_prefetch_endpoint_external_url_is_structured_error() {
    let app = create_test_app();

    let (status, json) =
        post_json(&app, "/prefetch", r#"{"url":"https://evil.example.com/x"}"#).await;

    // Failed prefetches are data, not HTTP errors
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "error");
    assert_eq!(json["reason"], "External URL not supported");
}

#[tokio::test]
async fn test_prefetch_endpoint_empty_url_is_bad_request() {
    let app = create_test_app();

    let (status, json) = post_json(&app, "/prefetch", r#"{"url":""}"#).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json.get("error").is_some());
}

// == Enable Toggle Tests ==

#[tokio::test]
async fn test_disabled_prefetching_rejects_with_reason() {
    let app = create_test_app();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/enabled")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"enabled":false}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let (_, json) = post_json(&app, "/prefetch", r#"{"url":"/pricing"}"#).await;
    assert_eq!(json["status"], "error");
    assert_eq!(json["reason"], "Prefetching disabled");
}

// == Rate Limit Tests ==

#[tokio::test]
async fn test_rate_limit_over_api() {
    let app = app_with(
        Arc::new(InstantTransport::new()),
        PrefetchLimits {
            max_per_minute: 1,
            ..PrefetchLimits::default()
        },
        RouteTable::default(),
    );

    let (_, first) = post_json(&app, "/prefetch", r#"{"url":"/a"}"#).await;
    let (_, second) = post_json(&app, "/prefetch", r#"{"url":"/b"}"#).await;

    assert_eq!(first["status"], "success");
    assert_eq!(second["status"], "error");
    assert_eq!(second["reason"], "Rate limit exceeded");
}

// == Network Gating Tests ==

#[tokio::test]
async fn test_save_data_gates_sensitive_route_over_api() {
    let mut rule = RouteRule::default_for("/heavy");
    rule.fast_connection_only = true;
    let app = app_with(
        Arc::new(InstantTransport::new()),
        PrefetchLimits::default(),
        RouteTable::new(vec![rule]),
    );

    // Push a save-data snapshot; downlink and type are otherwise fast
    let (status, _) = post_json(
        &app,
        "/network",
        r#"{"effective_type":"4g","downlink_mbps":50.0,"rtt_ms":20,"save_data":true}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, json) = post_json(&app, "/prefetch", r#"{"url":"/heavy"}"#).await;
    assert_eq!(json["status"], "error");
    assert_eq!(json["reason"], "Connection too slow");

    // Clearing the capability restores the optimistic default
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/network")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let (_, json) = post_json(&app, "/prefetch", r#"{"url":"/heavy","force":true}"#).await;
    assert_eq!(json["status"], "success");
}

// == Cache Endpoint Tests ==

#[tokio::test]
async fn test_cache_contains_endpoint() {
    let app = create_test_app();

    let (_, before) = get_json(&app, "/cache/contains?url=/pricing").await;
    assert_eq!(before["cached"], false);

    post_json(&app, "/prefetch", r#"{"url":"/pricing"}"#).await;

    let (_, after) = get_json(&app, "/cache/contains?url=/pricing").await;
    assert_eq!(after["cached"], true);
}

#[tokio::test]
async fn test_cache_entries_and_clear() {
    let app = create_test_app();

    post_json(&app, "/prefetch", r#"{"url":"/a"}"#).await;
    post_json(&app, "/prefetch", r#"{"url":"/b"}"#).await;

    let (_, entries) = get_json(&app, "/cache").await;
    assert_eq!(entries.as_array().unwrap().len(), 2);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/cache")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cleared = body_to_json(response.into_body()).await;
    assert_eq!(cleared["removed"], 2);

    let (_, entries) = get_json(&app, "/cache").await;
    assert!(entries.as_array().unwrap().is_empty());
}

// == Metrics Endpoint Tests ==

#[tokio::test]
async fn test_metrics_reflect_operations() {
    let app = create_test_app();

    post_json(&app, "/prefetch", r#"{"url":"/a"}"#).await;
    post_json(&app, "/prefetch", r#"{"url":"/a"}"#).await; // cache hit

    let (status, json) = get_json(&app, "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_operations"], 2);
    assert_eq!(json["successful_operations"], 2);
    assert!((json["cache_hit_rate"].as_f64().unwrap() - 0.5).abs() < 1e-9);

    post_json(&app, "/metrics/reset", "{}").await;
    let (_, json) = get_json(&app, "/metrics").await;
    assert_eq!(json["total_operations"], 0);
}

// == Target Registration Tests ==

#[tokio::test]
async fn test_register_and_unregister_target() {
    let app = create_test_app();

    let (status, json) = post_json(&app, "/targets", r#"{"url":"/pricing"}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["message"].as_str().unwrap().contains("/pricing"));

    let (status, _) = post_json(&app, "/targets/event", r#"{"url":"/pricing","event":"pointer_enter"}"#).await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = post_json(&app, "/targets/unregister", r#"{"url":"/pricing"}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["message"].as_str().unwrap().contains("unregistered"));
}

// == Debug and Health Tests ==

#[tokio::test]
async fn test_debug_endpoint_snapshot() {
    let app = create_test_app();
    post_json(&app, "/prefetch", r#"{"url":"/a"}"#).await;

    let (status, json) = get_json(&app, "/debug").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["enabled"], true);
    assert_eq!(json["in_flight"], 0);
    assert_eq!(json["cached_entries"], 1);
    assert!(json["limits"]["max_concurrent"].is_number());
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app();

    let (status, json) = get_json(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
}
