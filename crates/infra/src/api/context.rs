//! Per-call request state and raw call outcomes
//!
//! A [`RequestContext`] is created once per logical call and threaded
//! through every interceptor. Retries and the post-refresh reissue reuse the
//! same context, so `retry_count` and `retried_for_auth` survive across
//! attempts.

use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

/// Mutable state of one logical API call
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Correlates log lines and telemetry events of one call
    pub request_id: Uuid,
    /// Endpoint path (or absolute URL)
    pub url: String,
    pub method: Method,
    /// Case-insensitive header map; inserting replaces any previous value
    pub headers: HeaderMap,
    pub body: Option<Value>,
    /// Stamped by the request interceptor right before transmission
    pub start_time: Option<Instant>,
    /// Number of transient-failure retries issued so far
    pub retry_count: u32,
    /// Set once a credential refresh has been attempted for this call
    pub retried_for_auth: bool,
}

impl RequestContext {
    /// Create a fresh context for `method url`
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            url: url.into(),
            method,
            headers: HeaderMap::new(),
            body: None,
            start_time: None,
            retry_count: 0,
            retried_for_auth: false,
        }
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Whether the method mutates server state and therefore needs CSRF
    pub fn is_state_changing(&self) -> bool {
        matches!(self.method, Method::POST | Method::PUT | Method::PATCH | Method::DELETE)
    }

    /// Time since the last transmission was stamped
    pub fn elapsed(&self) -> Option<Duration> {
        self.start_time.map(|start| start.elapsed())
    }

    /// Elapsed time in whole milliseconds, zero if never stamped
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed().map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }
}

/// A fully-read HTTP response
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|value| value.to_str().ok())
    }

    /// Response body size in bytes
    pub fn size(&self) -> usize {
        self.body.len()
    }

    /// Body decoded as UTF-8, with invalid sequences replaced
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decode the body as JSON
    ///
    /// An empty body decodes as JSON `null`, so `()` and `Option<T>` targets
    /// work for 204 responses.
    ///
    /// # Errors
    /// Returns the `serde_json` error if the body does not match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return serde_json::from_value(Value::Null);
        }
        serde_json::from_slice(&self.body)
    }
}

/// Why a single transmission did not yield a 2xx response
#[derive(Debug, Clone)]
pub enum CallFailure {
    /// The server answered with a non-success status
    Response(ApiResponse),
    /// No response: connection refused, DNS, TLS, transport timeout
    Transport(String),
    /// The request could not be built
    Setup(String),
}

impl CallFailure {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Response(response) => Some(response.status),
            Self::Transport(_) | Self::Setup(_) => None,
        }
    }

    pub const fn response(&self) -> Option<&ApiResponse> {
        match self {
            Self::Response(response) => Some(response),
            Self::Transport(_) | Self::Setup(_) => None,
        }
    }
}
