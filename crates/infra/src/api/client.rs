//! Resilient API client
//!
//! Composes the request interceptor, the transport, and the response
//! interceptor into one loop. Each iteration is one transmission; the
//! response interceptor decides whether the call is delivered, reissued
//! (after a credential refresh or a retry backoff), or surfaced as an error.

use std::sync::Arc;
use std::time::Instant;

use lugn_domain::ApiConfig;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument};

use super::auth::{HttpCredentialRefresher, InMemorySessionStore};
use super::classifier::ErrorClassifier;
use super::clock::{Clock, SystemClock};
use super::context::{ApiResponse, CallFailure, RequestContext};
use super::csrf::{CsrfTokenCache, HttpCsrfIssuer};
use super::errors::ApiError;
use super::offline::{ConnectivityFlag, MemoryOfflineQueue, OfflineQueueBridge};
use super::refresh::TokenRefreshCoordinator;
use super::request::RequestInterceptor;
use super::response::{Disposition, ResponseInterceptor};
use super::retry::{RetryConfig, RetryScheduler};
use super::traits::{
    ConnectivityProbe, CredentialRefresher, CsrfIssuer, OfflineQueue, SessionStore, TelemetrySink,
};
use crate::http::HttpClient;
use crate::observability::metrics::RequestMetrics;
use crate::observability::telemetry::TracingTelemetrySink;

/// API client with auth refresh, CSRF, retry, and offline fallback
pub struct ApiClient {
    config: ApiConfig,
    http: HttpClient,
    request: RequestInterceptor,
    response: ResponseInterceptor,
    refresh: Arc<TokenRefreshCoordinator>,
    csrf: Arc<CsrfTokenCache>,
    metrics: Arc<RequestMetrics>,
}

impl ApiClient {
    /// Create a client with default collaborators
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid or the HTTP client
    /// cannot be created
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        Self::builder().config(config).build()
    }

    /// Create a builder for fluent configuration
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    /// Configuration the client was built with
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Latency and failure counters for every completed attempt
    pub fn metrics(&self) -> &RequestMetrics {
        &self.metrics
    }

    /// Shared CSRF token cache
    pub fn csrf_cache(&self) -> &CsrfTokenCache {
        &self.csrf
    }

    /// Whether a credential refresh is currently running
    pub fn is_refreshing(&self) -> bool {
        self.refresh.is_refreshing()
    }

    /// Run one logical call through the pipeline
    ///
    /// # Errors
    ///
    /// Returns the surfaced [`ApiError`] once every applicable recovery
    /// (refresh, retry, offline queue) has been exhausted
    #[instrument(skip(self, ctx), fields(method = %ctx.method, url = %ctx.url, request_id = %ctx.request_id))]
    pub async fn execute(&self, ctx: RequestContext) -> Result<ApiResponse, ApiError> {
        let mut ctx = ctx;
        loop {
            let result = match self.prepare(&mut ctx).await {
                Ok(url) => self.http.execute(&url, &ctx).await,
                Err(failure) => {
                    ctx.start_time = Some(Instant::now());
                    Err(failure)
                }
            };

            match self.response.handle(ctx, result).await {
                Disposition::Deliver(response) => return Ok(response),
                Disposition::Reissue(next) => {
                    debug!(retry_count = next.retry_count, retried_for_auth = next.retried_for_auth, "reissuing request");
                    ctx = next;
                }
                Disposition::Surface(err) => return Err(err),
            }
        }
    }

    /// Attach credentials and resolve the absolute URL for one transmission
    async fn prepare(&self, ctx: &mut RequestContext) -> Result<String, CallFailure> {
        self.request.intercept(ctx).await.map_err(setup_failure)?;
        self.config.resolve(&ctx.url).map_err(|e| setup_failure(e.into()))
    }

    /// Execute a GET request
    ///
    /// # Errors
    ///
    /// Returns error if request fails or response cannot be deserialized
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send_json(Method::GET, path, None).await
    }

    /// Execute a POST request
    ///
    /// # Errors
    ///
    /// Returns error if request fails or response cannot be deserialized.
    /// An offline POST returns `ApiError::QueuedOffline`.
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(Method::POST, path, Some(to_json(body)?)).await
    }

    /// # Errors
    ///
    /// Same as [`ApiClient::post`]
    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(Method::PUT, path, Some(to_json(body)?)).await
    }

    /// # Errors
    ///
    /// Same as [`ApiClient::post`], except that PATCH is never queued offline
    pub async fn patch<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(Method::PATCH, path, Some(to_json(body)?)).await
    }

    /// # Errors
    ///
    /// Same as [`ApiClient::post`]
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send_json(Method::DELETE, path, None).await
    }

    /// Clear the CSRF cache and stored tokens, then log out server-side
    pub async fn logout(&self) {
        self.refresh.logout().await;
        info!("session cleared");
    }

    #[instrument(skip(self, body), fields(path = %path))]
    async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T, ApiError> {
        let mut ctx = RequestContext::new(method.clone(), path);
        ctx.body = body;

        let response = self.execute(ctx).await?;
        let result = response.json().map_err(|e| ApiError::Decode {
            endpoint: path.to_string(),
            message: format!("{} ({})", e, response.status.as_u16()),
        })?;

        info!(%method, path = %path, "request successful");
        Ok(result)
    }
}

fn setup_failure(err: ApiError) -> CallFailure {
    match err {
        ApiError::Setup(message) => CallFailure::Setup(message),
        other => CallFailure::Setup(other.to_string()),
    }
}

fn to_json<B: Serialize + ?Sized>(body: &B) -> Result<Value, ApiError> {
    serde_json::to_value(body).map_err(|e| ApiError::Setup(format!("Failed to serialize body: {e}")))
}

/// Builder for [`ApiClient`]
///
/// Every collaborator is optional; unset ones fall back to the in-process or
/// HTTP-backed defaults.
#[derive(Default)]
pub struct ApiClientBuilder {
    config: Option<ApiConfig>,
    http: Option<HttpClient>,
    session: Option<Arc<dyn SessionStore>>,
    refresher: Option<Arc<dyn CredentialRefresher>>,
    csrf_issuer: Option<Arc<dyn CsrfIssuer>>,
    offline_queue: Option<Arc<dyn OfflineQueue>>,
    telemetry: Option<Arc<dyn TelemetrySink>>,
    connectivity: Option<Arc<dyn ConnectivityProbe>>,
    clock: Option<Arc<dyn Clock>>,
}

impl ApiClientBuilder {
    /// Configuration to build from (required)
    #[must_use]
    pub fn config(mut self, config: ApiConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use a preconfigured transport instead of one built from the config
    #[must_use]
    pub fn http_client(mut self, http: HttpClient) -> Self {
        self.http = Some(http);
        self
    }

    /// Access token store; defaults to [`InMemorySessionStore`]
    #[must_use]
    pub fn session_store(mut self, session: Arc<dyn SessionStore>) -> Self {
        self.session = Some(session);
        self
    }

    /// Refresh and logout service; defaults to [`HttpCredentialRefresher`]
    #[must_use]
    pub fn credential_refresher(mut self, refresher: Arc<dyn CredentialRefresher>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    /// CSRF token source; defaults to [`HttpCsrfIssuer`]
    #[must_use]
    pub fn csrf_issuer(mut self, issuer: Arc<dyn CsrfIssuer>) -> Self {
        self.csrf_issuer = Some(issuer);
        self
    }

    /// Store for requests made while offline; defaults to [`MemoryOfflineQueue`]
    #[must_use]
    pub fn offline_queue(mut self, queue: Arc<dyn OfflineQueue>) -> Self {
        self.offline_queue = Some(queue);
        self
    }

    /// Analytics sink; defaults to [`TracingTelemetrySink`]
    #[must_use]
    pub fn telemetry(mut self, telemetry: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Connectivity probe; defaults to an always-online [`ConnectivityFlag`]
    #[must_use]
    pub fn connectivity(mut self, connectivity: Arc<dyn ConnectivityProbe>) -> Self {
        self.connectivity = Some(connectivity);
        self
    }

    /// Clock for CSRF expiry; defaults to [`SystemClock`]
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Assemble the pipeline, filling unset collaborators with defaults
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Config` if no configuration was supplied, the
    /// configuration is invalid, or the HTTP client cannot be created
    pub fn build(self) -> Result<ApiClient, ApiError> {
        let config = self
            .config
            .ok_or_else(|| ApiError::Config("ApiClient requires an ApiConfig".to_string()))?;
        config.validate()?;

        let http = match self.http {
            Some(http) => http,
            None => HttpClient::builder()
                .timeout(config.timeout())
                .user_agent(config.user_agent.clone())
                .build()?,
        };

        let session = self.session.unwrap_or_else(|| Arc::new(InMemorySessionStore::new()));
        let refresher: Arc<dyn CredentialRefresher> = match self.refresher {
            Some(refresher) => refresher,
            None => Arc::new(HttpCredentialRefresher::new(
                http.clone(),
                config.resolve(&config.refresh_path)?,
                config.resolve(&config.logout_path)?,
            )),
        };
        let issuer: Arc<dyn CsrfIssuer> = match self.csrf_issuer {
            Some(issuer) => issuer,
            None => Arc::new(HttpCsrfIssuer::new(http.clone(), config.resolve(&config.csrf_path)?)),
        };
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let queue = self.offline_queue.unwrap_or_else(|| Arc::new(MemoryOfflineQueue::new()));
        let telemetry = self.telemetry.unwrap_or_else(|| Arc::new(TracingTelemetrySink));
        let connectivity = self.connectivity.unwrap_or_else(|| Arc::new(ConnectivityFlag::online()));

        let csrf = Arc::new(CsrfTokenCache::new(issuer, clock, config.csrf_ttl()));
        let refresh =
            Arc::new(TokenRefreshCoordinator::new(session.clone(), refresher, csrf.clone()));
        let metrics = Arc::new(RequestMetrics::new());

        let request = RequestInterceptor::new(session, csrf.clone(), &config.csrf_header)?;
        let response = ResponseInterceptor::new(
            ErrorClassifier::new(config.rate_limit_default_secs),
            refresh.clone(),
            RetryScheduler::new(RetryConfig::from(&config)),
            OfflineQueueBridge::new(queue, connectivity),
            telemetry,
            metrics.clone(),
            config.locale,
        );

        debug!(base_url = %config.base_url, "API client created");
        Ok(ApiClient { config, http, request, response, refresh, csrf, metrics })
    }
}
