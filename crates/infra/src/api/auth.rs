//! Session storage and credential refresh backed by the Lugn backend
//!
//! The refresh credential lives in an HTTP-only cookie managed by the
//! shared cookie jar; only the short-lived access token is held in memory.

use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::errors::CollaboratorError;
use super::traits::{CredentialRefresher, SessionStore};
use crate::http::HttpClient;

/// Access token held in process memory
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    access_token: RwLock<Option<String>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a token (e.g. restored at startup)
    pub fn with_token(token: impl Into<String>) -> Self {
        Self { access_token: RwLock::new(Some(token.into())) }
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn access_token(&self) -> Result<Option<String>, CollaboratorError> {
        Ok(self.access_token.read().await.clone())
    }

    async fn set_access_token(&self, token: &str) -> Result<(), CollaboratorError> {
        *self.access_token.write().await = Some(token.to_string());
        Ok(())
    }

    async fn clear_tokens(&self) -> Result<(), CollaboratorError> {
        *self.access_token.write().await = None;
        Ok(())
    }
}

#[derive(Deserialize)]
struct RefreshPayload {
    #[serde(alias = "access", alias = "access_token")]
    token: String,
}

/// Refreshes the access token through the backend auth endpoints
pub struct HttpCredentialRefresher {
    http: HttpClient,
    refresh_url: String,
    logout_url: String,
}

impl HttpCredentialRefresher {
    pub fn new(http: HttpClient, refresh_url: impl Into<String>, logout_url: impl Into<String>) -> Self {
        Self { http, refresh_url: refresh_url.into(), logout_url: logout_url.into() }
    }
}

#[async_trait]
impl CredentialRefresher for HttpCredentialRefresher {
    async fn refresh_access_token(&self) -> Result<String, CollaboratorError> {
        debug!(url = %self.refresh_url, "requesting new access token");
        let response = self
            .http
            .request(Method::POST, &self.refresh_url)
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| CollaboratorError::new("credential refresh", e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollaboratorError::new("credential refresh", format!("HTTP {status}")));
        }

        let payload: RefreshPayload = response.json().await.map_err(|e| {
            CollaboratorError::new("credential refresh", format!("invalid payload: {e}"))
        })?;
        Ok(payload.token)
    }

    async fn logout_user(&self) -> Result<(), CollaboratorError> {
        let response = self
            .http
            .request(Method::POST, &self.logout_url)
            .send()
            .await
            .map_err(|e| CollaboratorError::new("logout", e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollaboratorError::new("logout", format!("HTTP {status}")));
        }
        info!("user logged out");
        Ok(())
    }
}
