//! Collaborator fakes shared by the unit tests of this module

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use lugn_domain::QueuedRequest;
use serde_json::Value;
use tokio::sync::Notify;

use super::errors::CollaboratorError;
use super::traits::{CredentialRefresher, CsrfIssuer, OfflineQueue, TelemetrySink};

/// Issuer that hands out a fixed sequence of tokens, repeating the last one
pub struct StaticCsrfIssuer {
    tokens: Mutex<VecDeque<String>>,
    last: Mutex<Option<String>>,
    fail: bool,
    calls: AtomicUsize,
}

impl StaticCsrfIssuer {
    pub fn sequence<const N: usize>(tokens: [&str; N]) -> Self {
        Self {
            tokens: Mutex::new(tokens.iter().map(ToString::to_string).collect()),
            last: Mutex::new(None),
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self { fail: true, ..Self::sequence([]) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CsrfIssuer for StaticCsrfIssuer {
    async fn fetch_csrf_token(&self) -> Result<String, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if self.fail {
            return Err(CollaboratorError::new("csrf issuer", "unavailable"));
        }
        let mut last = self.last.lock().unwrap();
        if let Some(next) = self.tokens.lock().unwrap().pop_front() {
            *last = Some(next);
        }
        last.clone().ok_or_else(|| CollaboratorError::new("csrf issuer", "no tokens"))
    }
}

/// Refresher with scripted outcome and call counters
///
/// A gated refresher blocks inside `refresh_access_token` until
/// [`FakeRefresher::release`] is called.
pub struct FakeRefresher {
    token: Option<String>,
    gate: Option<Notify>,
    entered: Notify,
    refresh_calls: AtomicUsize,
    logout_calls: AtomicUsize,
}

impl FakeRefresher {
    fn build(token: Option<&str>, gated: bool) -> Self {
        Self {
            token: token.map(ToString::to_string),
            gate: gated.then(Notify::new),
            entered: Notify::new(),
            refresh_calls: AtomicUsize::new(0),
            logout_calls: AtomicUsize::new(0),
        }
    }

    pub fn succeeding(token: &str) -> Self {
        Self::build(Some(token), false)
    }

    pub fn failing() -> Self {
        Self::build(None, false)
    }

    pub fn gated(token: &str) -> Self {
        Self::build(Some(token), true)
    }

    pub async fn wait_until_called(&self) {
        if self.refresh_calls() == 0 {
            self.entered.notified().await;
        }
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn logout_calls(&self) -> usize {
        self.logout_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialRefresher for FakeRefresher {
    async fn refresh_access_token(&self) -> Result<String, CollaboratorError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        self.entered.notify_one();
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.token.clone().ok_or_else(|| CollaboratorError::new("credential refresh", "rejected"))
    }

    async fn logout_user(&self) -> Result<(), CollaboratorError> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingTelemetry {
    events: Mutex<Vec<(String, Value)>>,
}

impl RecordingTelemetry {
    pub fn events(&self) -> Vec<(String, Value)> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl TelemetrySink for RecordingTelemetry {
    async fn track_event(&self, name: &str, properties: Value) -> Result<(), CollaboratorError> {
        self.events.lock().unwrap().push((name.to_string(), properties));
        Ok(())
    }
}

pub struct FailingTelemetry;

#[async_trait]
impl TelemetrySink for FailingTelemetry {
    async fn track_event(&self, _name: &str, _properties: Value) -> Result<(), CollaboratorError> {
        Err(CollaboratorError::new("telemetry", "sink offline"))
    }
}

pub struct FailingQueue;

#[async_trait]
impl OfflineQueue for FailingQueue {
    async fn queue_request(&self, _request: QueuedRequest) -> Result<(), CollaboratorError> {
        Err(CollaboratorError::new("offline queue", "storage full"))
    }
}
