//! Integration tests for the resilient API client
//!
//! **Coverage:**
//! - Single-flight refresh: concurrent 401s trigger one refresh, the rest
//!   fail fast with the original 401
//! - Refresh success reissues with the new token; failure logs out
//! - Retry ceiling and linear backoff on transient server errors
//! - Rate limiting is surfaced immediately with a localized message
//! - CSRF attached only to state-changing requests, cached per TTL
//! - Offline fallback for mutating requests, on transport failures and on
//!   408/504 responses; online 408/504 go through the retry path
//!
//! **Infrastructure:**
//! - WireMock HTTP server standing in for the Lugn backend
//! - Default HTTP-backed collaborators where the server can play them,
//!   in-memory fakes where timing must be controlled

#![allow(dead_code)]

#[path = "support.rs"]
mod support;

use std::sync::Arc;

use futures::future::join_all;
use lugn_domain::constants::{EVENT_API_ERROR, EVENT_API_RATE_LIMITED, EVENT_API_REQUEST};
use lugn_domain::QueuedMethod;
use lugn_infra::api::{
    ApiClient, ApiError, ConnectivityFlag, MemoryOfflineQueue, MockClock, SessionStore,
};
use serde_json::{json, Value};
use support::{client_builder, unreachable_url, GatedRefresher, RecordingTelemetry, UnavailableCsrfIssuer};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_csrf(server: &MockServer, token: &str) {
    Mock::given(method("GET"))
        .and(path("/api/csrf-token/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "csrfToken": token })))
        .mount(server)
        .await;
}

// ============================================================================
// Token refresh
// ============================================================================

#[tokio::test]
async fn test_single_flight_refresh_fails_fast_for_concurrent_401s() {
    const CALLERS: usize = 5;

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/journal"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/journal"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "entries": [] })))
        .mount(&server)
        .await;

    let telemetry = Arc::new(RecordingTelemetry::default());
    let refresher = Arc::new(GatedRefresher::new("fresh"));
    let (builder, session) = client_builder(&server.uri(), &telemetry);
    let client = Arc::new(builder.credential_refresher(refresher.clone()).build().unwrap());

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    for _ in 0..CALLERS {
        let client = client.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            let result = client.get::<Value>("/api/journal").await;
            tx.send(result).expect("receiver alive");
        });
    }

    // Fail-fast policy: every caller that hits a 401 while the refresh is
    // running gets the original 401 without waiting for the new token.
    for _ in 0..CALLERS - 1 {
        let result = rx.recv().await.expect("result");
        assert!(
            matches!(result, Err(ApiError::Unauthorized { ref endpoint }) if endpoint == "/api/journal"),
            "expected fail-fast 401, got {result:?}"
        );
    }
    assert_eq!(refresher.refresh_calls(), 1);
    assert!(client.is_refreshing());

    refresher.release();
    let last = rx.recv().await.expect("result");
    assert_eq!(last.expect("refreshing caller succeeds"), json!({ "entries": [] }));

    assert_eq!(refresher.refresh_calls(), 1);
    assert!(!client.is_refreshing());
    assert_eq!(session.access_token().await.unwrap().as_deref(), Some("fresh"));
}

#[tokio::test]
async fn test_refresh_success_reissues_with_new_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/me"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/me"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name": "Alva" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access": "fresh" })))
        .expect(1)
        .mount(&server)
        .await;

    let telemetry = Arc::new(RecordingTelemetry::default());
    let (builder, session) = client_builder(&server.uri(), &telemetry);
    let client = builder.build().unwrap();

    let me: Value = client.get("/api/me").await.unwrap();

    assert_eq!(me["name"], "Alva");
    assert_eq!(session.access_token().await.unwrap().as_deref(), Some("fresh"));
    assert!(!client.is_refreshing());
    let errors = telemetry.named(EVENT_API_ERROR);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["classification"], "unauthorized");
    assert_eq!(telemetry.named(EVENT_API_REQUEST).len(), 1);
}

#[tokio::test]
async fn test_refresh_failure_logs_out_and_surfaces_401() {
    let server = MockServer::start().await;
    mount_csrf(&server, "csrf-1").await;
    Mock::given(method("POST"))
        .and(path("/api/mood/log"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh/"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/logout/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let telemetry = Arc::new(RecordingTelemetry::default());
    let (builder, session) = client_builder(&server.uri(), &telemetry);
    let client = builder.build().unwrap();

    let result: Result<Value, _> = client.post("/api/mood/log", &json!({ "mood": "glad" })).await;

    assert!(matches!(result, Err(ApiError::Unauthorized { .. })), "got {result:?}");
    assert!(!client.is_refreshing());
    assert!(session.access_token().await.unwrap().is_none());
    assert!(client.csrf_cache().cached().await.is_none());
}

#[tokio::test]
async fn test_401_after_refresh_is_not_refreshed_again() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/me"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access": "fresh" })))
        .expect(1)
        .mount(&server)
        .await;

    let telemetry = Arc::new(RecordingTelemetry::default());
    let (builder, _session) = client_builder(&server.uri(), &telemetry);
    let client = builder.build().unwrap();

    let result: Result<Value, _> = client.get("/api/me").await;

    assert!(matches!(result, Err(ApiError::Unauthorized { .. })), "got {result:?}");
    let classifications: Vec<_> =
        telemetry.named(EVENT_API_ERROR).iter().map(|e| e["classification"].clone()).collect();
    assert_eq!(classifications, [json!("unauthorized"), json!("server_other")]);
}

// ============================================================================
// Retry
// ============================================================================

#[tokio::test]
async fn test_retry_ceiling_on_persistent_503() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(503))
        .expect(4)
        .mount(&server)
        .await;

    let telemetry = Arc::new(RecordingTelemetry::default());
    let (builder, _session) = client_builder(&server.uri(), &telemetry);
    let client = builder.build().unwrap();

    let result: Result<Value, _> = client.get("/api/health").await;

    assert!(matches!(result, Err(ApiError::Server { status: 503, .. })), "got {result:?}");
    let errors = telemetry.named(EVENT_API_ERROR);
    assert_eq!(errors.len(), 4);
    let retry_counts: Vec<_> = errors.iter().map(|e| e["retry_count"].as_u64().unwrap()).collect();
    assert_eq!(retry_counts, [0, 1, 2, 3]);
    assert_eq!(client.metrics().retried_requests(), 3);
    assert_eq!(client.metrics().failed_requests(), 4);
}

#[tokio::test]
async fn test_retry_recovers_after_transient_failures() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;

    let telemetry = Arc::new(RecordingTelemetry::default());
    let (builder, _session) = client_builder(&server.uri(), &telemetry);
    let client = builder.build().unwrap();

    let health: Value = client.get("/api/health").await.unwrap();

    assert_eq!(health, json!({ "ok": true }));
    let success = telemetry.named(EVENT_API_REQUEST);
    assert_eq!(success.len(), 1);
    assert_eq!(success[0]["retry_count"], 2);
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("missing"))
        .expect(1)
        .mount(&server)
        .await;

    let telemetry = Arc::new(RecordingTelemetry::default());
    let (builder, _session) = client_builder(&server.uri(), &telemetry);
    let client = builder.build().unwrap();

    let result: Result<Value, _> = client.get("/api/journal/99").await;

    let err = result.unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert_eq!(err.endpoint(), Some("/api/journal/99"));
}

// ============================================================================
// Rate limiting
// ============================================================================

#[tokio::test]
async fn test_rate_limit_is_surfaced_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/journal"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "30"))
        .expect(1)
        .mount(&server)
        .await;

    let telemetry = Arc::new(RecordingTelemetry::default());
    let (builder, _session) = client_builder(&server.uri(), &telemetry);
    let client = builder.build().unwrap();

    let result: Result<Value, _> = client.get("/api/journal").await;

    match result {
        Err(ApiError::RateLimited { retry_after_secs, message, .. }) => {
            assert_eq!(retry_after_secs, 30);
            assert!(message.contains("30 sekunder"), "message: {message}");
        }
        other => panic!("expected rate limit error, got {other:?}"),
    }
    let limited = telemetry.named(EVENT_API_RATE_LIMITED);
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0]["retry_after"], 30);
}

#[tokio::test]
async fn test_rate_limit_defaults_to_sixty_seconds() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .expect(1)
        .mount(&server)
        .await;

    let telemetry = Arc::new(RecordingTelemetry::default());
    let (builder, _session) = client_builder(&server.uri(), &telemetry);
    let client = builder.build().unwrap();

    let err = client.get::<Value>("/api/journal").await.unwrap_err();
    assert!(matches!(err, ApiError::RateLimited { retry_after_secs: 60, .. }));
}

// ============================================================================
// CSRF
// ============================================================================

#[tokio::test]
async fn test_csrf_only_on_state_changing_requests() {
    let server = MockServer::start().await;
    mount_csrf(&server, "csrf-1").await;
    Mock::given(method("GET"))
        .and(path("/api/journal"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/journal"))
        .and(header("x-csrftoken", "csrf-1"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 1 })))
        .expect(1)
        .mount(&server)
        .await;

    let telemetry = Arc::new(RecordingTelemetry::default());
    let (builder, _session) = client_builder(&server.uri(), &telemetry);
    let client = builder.build().unwrap();

    let _: Value = client.get("/api/journal").await.unwrap();
    let _: Value = client.post("/api/journal", &json!({ "text": "idag" })).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let get = requests
        .iter()
        .find(|r| r.method.as_str() == "GET" && r.url.path() == "/api/journal")
        .expect("GET request recorded");
    assert!(get.headers.get("x-csrftoken").is_none());
    assert_eq!(get.headers.get("authorization").unwrap(), "Bearer stale");
}

#[tokio::test]
async fn test_csrf_token_cached_for_ttl() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/csrf-token/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "csrf_token": "csrf-1" })))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(204))
        .expect(3)
        .mount(&server)
        .await;

    let clock = MockClock::new();
    let telemetry = Arc::new(RecordingTelemetry::default());
    let (builder, _session) = client_builder(&server.uri(), &telemetry);
    let client = builder.clock(Arc::new(clock.clone())).build().unwrap();

    client.put::<_, ()>("/api/settings", &json!({ "theme": "dark" })).await.unwrap();
    clock.advance(chrono::Duration::minutes(30));
    client.put::<_, ()>("/api/settings", &json!({ "theme": "light" })).await.unwrap();
    clock.advance(chrono::Duration::minutes(31));
    client.put::<_, ()>("/api/settings", &json!({ "theme": "dark" })).await.unwrap();
}

#[tokio::test]
async fn test_concurrent_posts_share_one_csrf_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/csrf-token/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "csrfToken": "csrf-1" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/mood/log"))
        .and(header("x-csrftoken", "csrf-1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(5)
        .mount(&server)
        .await;

    let telemetry = Arc::new(RecordingTelemetry::default());
    let (builder, _session) = client_builder(&server.uri(), &telemetry);
    let client = builder.build().unwrap();

    let bodies: Vec<Value> = (0..5).map(|i| json!({ "mood": i })).collect();
    let results =
        join_all(bodies.iter().map(|body| client.post::<_, ()>("/api/mood/log", body))).await;
    assert!(results.iter().all(Result::is_ok));
}

#[tokio::test]
async fn test_csrf_failure_does_not_block_request() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/journal/4"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let telemetry = Arc::new(RecordingTelemetry::default());
    let (builder, _session) = client_builder(&server.uri(), &telemetry);
    let client = builder.csrf_issuer(Arc::new(UnavailableCsrfIssuer)).build().unwrap();

    client.delete::<()>("/api/journal/4").await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("x-csrftoken").is_none());
}

// ============================================================================
// Offline fallback
// ============================================================================

#[tokio::test]
async fn test_offline_post_is_queued() {
    let queue = Arc::new(MemoryOfflineQueue::new());
    let telemetry = Arc::new(RecordingTelemetry::default());
    let (builder, _session) = client_builder(&unreachable_url(), &telemetry);
    let client = builder
        .offline_queue(queue.clone())
        .connectivity(Arc::new(ConnectivityFlag::offline()))
        .csrf_issuer(Arc::new(UnavailableCsrfIssuer))
        .build()
        .unwrap();

    let result: Result<Value, _> = client.post("/api/mood/log", &json!({ "mood": "glad" })).await;

    let err = result.unwrap_err();
    assert!(err.is_queued_offline(), "got {err:?}");
    assert!(err.to_string().contains("offline"));

    let queued = queue.drain();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].method, QueuedMethod::Post);
    assert_eq!(queued[0].endpoint, "/api/mood/log");
    assert_eq!(queued[0].payload, Some(json!({ "mood": "glad" })));
    assert_eq!(queued[0].retries, 0);
}

#[tokio::test]
async fn test_offline_get_surfaces_network_error() {
    let queue = Arc::new(MemoryOfflineQueue::new());
    let telemetry = Arc::new(RecordingTelemetry::default());
    let (builder, _session) = client_builder(&unreachable_url(), &telemetry);
    let client = builder
        .offline_queue(queue.clone())
        .connectivity(Arc::new(ConnectivityFlag::offline()))
        .build()
        .unwrap();

    let result: Result<Value, _> = client.get("/api/journal").await;

    assert!(matches!(result, Err(ApiError::Network { .. })), "got {result:?}");
    assert!(queue.is_empty());
}

#[tokio::test]
async fn test_online_network_error_is_not_queued() {
    let queue = Arc::new(MemoryOfflineQueue::new());
    let telemetry = Arc::new(RecordingTelemetry::default());
    let (builder, _session) = client_builder(&unreachable_url(), &telemetry);
    let client = builder
        .offline_queue(queue.clone())
        .csrf_issuer(Arc::new(UnavailableCsrfIssuer))
        .build()
        .unwrap();

    let result: Result<Value, _> = client.post("/api/mood/log", &json!({ "mood": "glad" })).await;

    assert!(matches!(result, Err(ApiError::Network { .. })), "got {result:?}");
    assert!(queue.is_empty());
    assert_eq!(telemetry.named(EVENT_API_ERROR)[0]["classification"], "network_error");
}

#[tokio::test]
async fn test_offline_gateway_timeout_queues_put() {
    let server = MockServer::start().await;
    mount_csrf(&server, "csrf-1").await;
    Mock::given(method("PUT"))
        .and(path("/api/journal/4"))
        .respond_with(ResponseTemplate::new(504))
        .expect(1)
        .mount(&server)
        .await;

    let queue = Arc::new(MemoryOfflineQueue::new());
    let telemetry = Arc::new(RecordingTelemetry::default());
    let (builder, _session) = client_builder(&server.uri(), &telemetry);
    let client = builder
        .offline_queue(queue.clone())
        .connectivity(Arc::new(ConnectivityFlag::offline()))
        .build()
        .unwrap();

    let result: Result<Value, _> = client.put("/api/journal/4", &json!({ "text": "lugnt" })).await;

    let err = result.unwrap_err();
    assert!(err.is_queued_offline(), "got {err:?}");
    let queued = queue.drain();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].method, QueuedMethod::Put);
    assert_eq!(telemetry.named(EVENT_API_ERROR)[0]["classification"], "timeout");
    assert_eq!(client.metrics().retried_requests(), 0);
}

#[tokio::test]
async fn test_online_request_timeout_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/journal"))
        .respond_with(ResponseTemplate::new(408))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/journal"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let queue = Arc::new(MemoryOfflineQueue::new());
    let telemetry = Arc::new(RecordingTelemetry::default());
    let (builder, _session) = client_builder(&server.uri(), &telemetry);
    let client = builder.offline_queue(queue.clone()).build().unwrap();

    let entries: Value = client.get("/api/journal").await.unwrap();

    assert_eq!(entries, json!([]));
    assert!(queue.is_empty());
    assert_eq!(client.metrics().retried_requests(), 1);
    assert_eq!(telemetry.named(EVENT_API_REQUEST)[0]["retry_count"], 1);
}
