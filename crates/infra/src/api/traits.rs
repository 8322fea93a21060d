//! Collaborator seams
//!
//! Every side-effecting dependency of the client is injected behind one of
//! these traits. Default implementations live next to the concern they serve
//! (`auth`, `csrf`, `offline`, `observability::telemetry`).

use async_trait::async_trait;
use lugn_domain::QueuedRequest;
use serde_json::Value;

use super::errors::CollaboratorError;

/// Persistent storage for the access token
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Current access token, `None` when signed out
    async fn access_token(&self) -> Result<Option<String>, CollaboratorError>;

    async fn set_access_token(&self, token: &str) -> Result<(), CollaboratorError>;

    /// Remove all stored credentials
    async fn clear_tokens(&self) -> Result<(), CollaboratorError>;
}

/// Remote credential refresh and logout
#[async_trait]
pub trait CredentialRefresher: Send + Sync {
    /// Obtain a new access token using the refresh credential
    async fn refresh_access_token(&self) -> Result<String, CollaboratorError>;

    async fn logout_user(&self) -> Result<(), CollaboratorError>;
}

/// Source of fresh CSRF tokens
#[async_trait]
pub trait CsrfIssuer: Send + Sync {
    async fn fetch_csrf_token(&self) -> Result<String, CollaboratorError>;
}

/// Durable store for mutating requests made while offline
#[async_trait]
pub trait OfflineQueue: Send + Sync {
    async fn queue_request(&self, request: QueuedRequest) -> Result<(), CollaboratorError>;
}

/// Analytics event sink
#[async_trait]
pub trait TelemetrySink: Send + Sync {
    async fn track_event(&self, name: &str, properties: Value) -> Result<(), CollaboratorError>;
}

/// Current connectivity
pub trait ConnectivityProbe: Send + Sync {
    fn is_online(&self) -> bool;
}
