//! Shared fakes and helpers for the API client integration tests

use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lugn_domain::ApiConfig;
use lugn_infra::api::{
    ApiClient, ApiClientBuilder, CollaboratorError, CredentialRefresher, CsrfIssuer,
    InMemorySessionStore, TelemetrySink,
};
use serde_json::Value;
use tokio::sync::Notify;

/// Telemetry sink that keeps every event in memory
#[derive(Default)]
pub struct RecordingTelemetry {
    events: Mutex<Vec<(String, Value)>>,
}

impl RecordingTelemetry {
    pub fn events(&self) -> Vec<(String, Value)> {
        self.events.lock().expect("telemetry lock").clone()
    }

    pub fn named(&self, name: &str) -> Vec<Value> {
        self.events().into_iter().filter(|(n, _)| n == name).map(|(_, props)| props).collect()
    }
}

#[async_trait]
impl TelemetrySink for RecordingTelemetry {
    async fn track_event(&self, name: &str, properties: Value) -> Result<(), CollaboratorError> {
        self.events.lock().expect("telemetry lock").push((name.to_string(), properties));
        Ok(())
    }
}

/// Refresher that blocks until released, then hands out `token`
pub struct GatedRefresher {
    token: String,
    gate: Notify,
    refresh_calls: AtomicUsize,
    logout_calls: AtomicUsize,
}

impl GatedRefresher {
    pub fn new(token: &str) -> Self {
        Self {
            token: token.to_string(),
            gate: Notify::new(),
            refresh_calls: AtomicUsize::new(0),
            logout_calls: AtomicUsize::new(0),
        }
    }

    pub fn release(&self) {
        self.gate.notify_one();
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn logout_calls(&self) -> usize {
        self.logout_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialRefresher for GatedRefresher {
    async fn refresh_access_token(&self) -> Result<String, CollaboratorError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        self.gate.notified().await;
        Ok(self.token.clone())
    }

    async fn logout_user(&self) -> Result<(), CollaboratorError> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// CSRF issuer that always fails
pub struct UnavailableCsrfIssuer;

#[async_trait]
impl CsrfIssuer for UnavailableCsrfIssuer {
    async fn fetch_csrf_token(&self) -> Result<String, CollaboratorError> {
        Err(CollaboratorError::new("csrf issuer", "service unavailable"))
    }
}

/// Configuration pointing at `base_url` with a short backoff unit
pub fn fast_config(base_url: &str) -> ApiConfig {
    let mut config = ApiConfig::new(base_url);
    config.base_delay_ms = 10;
    config.timeout_ms = 2_000;
    config
}

/// Builder preloaded with a stale access token and recording telemetry
pub fn client_builder(
    base_url: &str,
    telemetry: &Arc<RecordingTelemetry>,
) -> (ApiClientBuilder, Arc<InMemorySessionStore>) {
    let session = Arc::new(InMemorySessionStore::with_token("stale"));
    let builder = ApiClient::builder()
        .config(fast_config(base_url))
        .session_store(session.clone())
        .telemetry(telemetry.clone());
    (builder, session)
}

/// URL of a local port nothing is listening on
pub fn unreachable_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind port");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    format!("http://{addr}")
}
