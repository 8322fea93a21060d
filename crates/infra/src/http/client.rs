use std::time::Duration;

use lugn_domain::constants::{CONTENT_TYPE_JSON, DEFAULT_TIMEOUT_MS, DEFAULT_USER_AGENT};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client as ReqwestClient, Method, RequestBuilder};
use tracing::debug;

use crate::api::context::{ApiResponse, CallFailure, RequestContext};
use crate::api::errors::ApiError;

/// Single-attempt HTTP client with a shared cookie jar.
///
/// Cloning is cheap and clones share the connection pool and cookies, so the
/// CSRF issuer and credential refresher see the same session cookies as the
/// main pipeline.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: ReqwestClient,
}

impl HttpClient {
    /// Start building a new HTTP client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Convenience constructor with default configuration.
    ///
    /// # Errors
    /// Returns `ApiError::Config` if the TLS backend cannot be initialized.
    pub fn new() -> Result<Self, ApiError> {
        Self::builder().build()
    }

    /// Create a request builder using the underlying reqwest client.
    pub fn request<U>(&self, method: Method, url: U) -> RequestBuilder
    where
        U: reqwest::IntoUrl,
    {
        self.client.request(method, url)
    }

    /// Transmit the request described by `ctx` to `url` once.
    ///
    /// Non-2xx responses are returned as [`CallFailure::Response`] with the
    /// body already read, so classification never touches the network.
    pub async fn execute(&self, url: &str, ctx: &RequestContext) -> Result<ApiResponse, CallFailure> {
        let mut builder = self.client.request(ctx.method.clone(), url).headers(ctx.headers.clone());
        if let Some(body) = &ctx.body {
            builder = builder.json(body);
        }
        let request = builder.build().map_err(|err| CallFailure::Setup(err.to_string()))?;

        let method = request.method().clone();
        let attempt = ctx.retry_count + 1;
        debug!(attempt, %method, %url, request_id = %ctx.request_id, "sending HTTP request");

        let response = self.client.execute(request).await.map_err(|err| {
            debug!(attempt, %method, %url, error = %err, "HTTP request failed");
            CallFailure::Transport(describe_transport_error(&err))
        })?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|err| CallFailure::Transport(describe_transport_error(&err)))?
            .to_vec();
        debug!(attempt, %method, %url, %status, bytes = body.len(), "received HTTP response");

        let response = ApiResponse { status, headers, body };
        if status.is_success() {
            Ok(response)
        } else {
            Err(CallFailure::Response(response))
        }
    }
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    user_agent: String,
    default_headers: HeaderMap,
    cookie_store: bool,
    accept_invalid_certs: bool,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_JSON));
        Self {
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            default_headers,
            cookie_store: true,
            accept_invalid_certs: false,
        }
    }
}

impl HttpClientBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    /// Merge extra headers into the defaults sent with every request.
    pub fn default_headers(mut self, headers: HeaderMap) -> Self {
        self.default_headers.extend(headers);
        self
    }

    /// Keep cookies between requests (enabled by default).
    pub fn cookie_store(mut self, enabled: bool) -> Self {
        self.cookie_store = enabled;
        self
    }

    /// Test-only helper to allow insecure TLS (e.g., self-signed certs).
    #[cfg(test)]
    pub fn accept_invalid_certs(mut self, enabled: bool) -> Self {
        self.accept_invalid_certs = enabled;
        self
    }

    /// # Errors
    /// Returns `ApiError::Config` if reqwest rejects the configuration.
    pub fn build(self) -> Result<HttpClient, ApiError> {
        let mut builder = ReqwestClient::builder()
            .timeout(self.timeout)
            .user_agent(self.user_agent)
            .default_headers(self.default_headers)
            .cookie_store(self.cookie_store)
            .no_proxy();

        if self.accept_invalid_certs {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder
            .build()
            .map_err(|err| ApiError::Config(format!("Failed to build HTTP client: {err}")))?;

        Ok(HttpClient { client })
    }
}

fn describe_transport_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        return format!("request timed out: {err}");
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        if err.is_connect() {
            return format!("connection failed: {err}");
        }
    }
    err.to_string()
}
