//! Anti-CSRF token cache
//!
//! One token is cached per client with a fixed lifetime. The cache lock is
//! held across the issuer call, so concurrent state-changing requests that
//! find the cache empty wait for a single fetch instead of racing.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

use super::clock::Clock;
use super::errors::CollaboratorError;
use super::traits::CsrfIssuer;
use crate::http::HttpClient;

/// A cached CSRF token; replaced wholesale on refresh, never mutated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrfToken {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl CsrfToken {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

#[derive(Debug, Error)]
pub enum CsrfError {
    #[error("CSRF token fetch failed: {0}")]
    Fetch(#[from] CollaboratorError),

    #[error("CSRF issuer returned an empty token")]
    Empty,
}

pub struct CsrfTokenCache {
    issuer: Arc<dyn CsrfIssuer>,
    clock: Arc<dyn Clock>,
    ttl: chrono::Duration,
    cached: Mutex<Option<CsrfToken>>,
}

impl CsrfTokenCache {
    pub fn new(issuer: Arc<dyn CsrfIssuer>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::hours(1));
        Self { issuer, clock, ttl, cached: Mutex::new(None) }
    }

    /// Return the cached token, fetching a new one if none is cached or the
    /// cached one has expired.
    ///
    /// # Errors
    /// Returns `CsrfError` if the issuer fails or hands back an empty token.
    /// The previous cache entry is left untouched in that case.
    pub async fn get_token(&self) -> Result<String, CsrfError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.is_valid_at(self.clock.now())) {
            return Ok(token.value.clone());
        }

        debug!("fetching CSRF token");
        let value = self.issuer.fetch_csrf_token().await?;
        if value.trim().is_empty() {
            return Err(CsrfError::Empty);
        }

        *cached = Some(CsrfToken { value: value.clone(), expires_at: self.clock.now() + self.ttl });
        Ok(value)
    }

    /// Drop the cached token (used on logout)
    pub async fn clear(&self) {
        *self.cached.lock().await = None;
    }

    /// Snapshot of the cache contents
    pub async fn cached(&self) -> Option<CsrfToken> {
        self.cached.lock().await.clone()
    }
}

/// Fetches CSRF tokens from the backend issuance endpoint
///
/// Shares the pipeline's cookie jar, so the token matches the CSRF cookie
/// the server sets alongside it.
pub struct HttpCsrfIssuer {
    http: HttpClient,
    url: String,
}

#[derive(Deserialize)]
struct CsrfPayload {
    #[serde(alias = "csrfToken", alias = "csrf_token")]
    token: String,
}

impl HttpCsrfIssuer {
    pub fn new(http: HttpClient, url: impl Into<String>) -> Self {
        Self { http, url: url.into() }
    }
}

#[async_trait]
impl CsrfIssuer for HttpCsrfIssuer {
    async fn fetch_csrf_token(&self) -> Result<String, CollaboratorError> {
        let response = self
            .http
            .request(Method::GET, &self.url)
            .send()
            .await
            .map_err(|e| CollaboratorError::new("csrf issuer", e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollaboratorError::new("csrf issuer", format!("HTTP {status}")));
        }

        let payload: CsrfPayload = response
            .json()
            .await
            .map_err(|e| CollaboratorError::new("csrf issuer", format!("invalid payload: {e}")))?;
        Ok(payload.token)
    }
}
