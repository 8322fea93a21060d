//! API-specific error types
//!
//! `ApiError` is everything a caller of the client can receive. Recoverable
//! conditions (token refresh, transient retries, offline queuing) are
//! resolved inside the pipeline and only reach the caller when recovery
//! itself fails.

use lugn_domain::{Locale, LugnError, QueuedMethod};
use thiserror::Error;

use super::context::CallFailure;
use super::messages;

/// Categories of surfaced API errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorCategory {
    /// Session could not be recovered (401 after refresh failed)
    Authentication,
    /// Rate limiting (429), not retried by the client
    RateLimit,
    /// Request parked in the offline queue
    Offline,
    /// Transport failures and gateway/request timeouts
    Network,
    /// Server errors (5xx) after retries were exhausted
    Server,
    /// Client errors (4xx except auth and rate limit)
    Client,
    /// Request could not be built, or response could not be decoded
    Setup,
    /// Configuration errors
    Config,
}

/// Failure reported by an injected collaborator (session store, refresh
/// service, CSRF issuer, offline queue, telemetry sink)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{service} failed: {message}")]
pub struct CollaboratorError {
    /// Collaborator name, used in logs
    pub service: &'static str,
    /// Failure description
    pub message: String,
}

impl CollaboratorError {
    /// Create a collaborator error
    pub fn new(service: &'static str, message: impl Into<String>) -> Self {
        Self { service, message: message.into() }
    }
}

/// API operation errors surfaced to callers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {endpoint} returned 401")]
    Unauthorized { endpoint: String },

    #[error("{message}")]
    RateLimited { endpoint: String, retry_after_secs: u64, message: String },

    #[error("{message}")]
    QueuedOffline { method: QueuedMethod, endpoint: String, message: String },

    #[error("Network error for {endpoint}: {message}")]
    Network { endpoint: String, message: String },

    #[error("Timeout ({status}) from {endpoint}")]
    Timeout { status: u16, endpoint: String },

    #[error("Server error ({status}) from {endpoint}: {body}")]
    Server { status: u16, endpoint: String, body: String },

    #[error("Client error ({status}) from {endpoint}: {body}")]
    Client { status: u16, endpoint: String, body: String },

    #[error("Request setup failed: {0}")]
    Setup(String),

    #[error("Failed to decode response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ApiError {
    /// Build the error a failed call surfaces when no recovery applies
    pub(crate) fn from_failure(failure: &CallFailure, endpoint: &str) -> Self {
        let endpoint = endpoint.to_string();
        match failure {
            CallFailure::Setup(message) => Self::Setup(message.clone()),
            CallFailure::Transport(message) => Self::Network { endpoint, message: message.clone() },
            CallFailure::Response(response) => {
                let status = response.status.as_u16();
                match status {
                    401 => Self::Unauthorized { endpoint },
                    408 | 504 => Self::Timeout { status, endpoint },
                    500..=599 => Self::Server { status, endpoint, body: response.text() },
                    _ => Self::Client { status, endpoint, body: response.text() },
                }
            }
        }
    }

    /// Get the error category for this error
    pub const fn category(&self) -> ApiErrorCategory {
        match self {
            Self::Unauthorized { .. } => ApiErrorCategory::Authentication,
            Self::RateLimited { .. } => ApiErrorCategory::RateLimit,
            Self::QueuedOffline { .. } => ApiErrorCategory::Offline,
            Self::Network { .. } | Self::Timeout { .. } => ApiErrorCategory::Network,
            Self::Server { .. } => ApiErrorCategory::Server,
            Self::Client { .. } => ApiErrorCategory::Client,
            Self::Setup(_) | Self::Decode { .. } => ApiErrorCategory::Setup,
            Self::Config(_) => ApiErrorCategory::Config,
        }
    }

    /// HTTP status carried by this error, if a response was received
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized { .. } => Some(401),
            Self::RateLimited { .. } => Some(429),
            Self::Timeout { status, .. }
            | Self::Server { status, .. }
            | Self::Client { status, .. } => Some(*status),
            Self::QueuedOffline { .. }
            | Self::Network { .. }
            | Self::Setup(_)
            | Self::Decode { .. }
            | Self::Config(_) => None,
        }
    }

    /// Endpoint the failed call targeted
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            Self::Unauthorized { endpoint }
            | Self::RateLimited { endpoint, .. }
            | Self::QueuedOffline { endpoint, .. }
            | Self::Network { endpoint, .. }
            | Self::Timeout { endpoint, .. }
            | Self::Server { endpoint, .. }
            | Self::Client { endpoint, .. }
            | Self::Decode { endpoint, .. } => Some(endpoint),
            Self::Setup(_) | Self::Config(_) => None,
        }
    }

    /// True when the outcome is a deferred success rather than a failure
    pub const fn is_queued_offline(&self) -> bool {
        matches!(self, Self::QueuedOffline { .. })
    }

    /// Message suitable for display to the end user
    ///
    /// Client errors, setup errors, and configuration errors are surfaced
    /// verbatim; everything else maps onto a localized notice.
    pub fn user_message(&self, locale: Locale) -> String {
        match self {
            Self::RateLimited { message, .. } | Self::QueuedOffline { message, .. } => {
                message.clone()
            }
            Self::Unauthorized { .. } => messages::session_expired(locale).to_string(),
            Self::Network { .. } | Self::Timeout { .. } => {
                messages::network_error(locale).to_string()
            }
            Self::Server { .. } => messages::generic_failure(locale).to_string(),
            Self::Client { .. } | Self::Setup(_) | Self::Decode { .. } | Self::Config(_) => {
                self.to_string()
            }
        }
    }
}

impl From<LugnError> for ApiError {
    fn from(err: LugnError) -> Self {
        match err {
            LugnError::Config(message) => Self::Config(message),
            LugnError::InvalidInput(message) | LugnError::Internal(message) => {
                Self::Setup(message)
            }
        }
    }
}
