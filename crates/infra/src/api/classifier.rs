//! Failure classification
//!
//! Maps a failed transmission onto exactly one [`ErrorClassification`],
//! which the response interceptor uses to pick a recovery strategy.

use lugn_domain::constants::{
    RETRY_AFTER_HEADER, TIMEOUT_STATUS_CODES, TRANSIENT_SERVER_STATUS_CODES,
};
use reqwest::header::HeaderMap;
use reqwest::StatusCode;

use super::context::{CallFailure, RequestContext};

/// Mutually exclusive failure categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClassification {
    /// 401 on a call that has not yet been retried for auth
    Unauthorized,
    /// 429, with the server-advertised (or default) wait
    RateLimited { retry_after_secs: u64 },
    /// 408 or 504
    Timeout,
    /// No response was received
    NetworkError,
    /// 500, 502, 503
    ServerTransient(u16),
    /// Any other response status, including a repeated 401
    ServerOther(u16),
    /// The request could not be built
    SetupError,
}

impl ErrorClassification {
    /// Stable label used in logs and telemetry
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::RateLimited { .. } => "rate_limited",
            Self::Timeout => "timeout",
            Self::NetworkError => "network_error",
            Self::ServerTransient(_) => "server_transient",
            Self::ServerOther(_) => "server_other",
            Self::SetupError => "setup_error",
        }
    }
}

/// Stateless classifier
#[derive(Debug, Clone, Copy)]
pub struct ErrorClassifier {
    default_retry_after_secs: u64,
}

impl ErrorClassifier {
    pub const fn new(default_retry_after_secs: u64) -> Self {
        Self { default_retry_after_secs }
    }

    pub fn classify(&self, failure: &CallFailure, ctx: &RequestContext) -> ErrorClassification {
        let response = match failure {
            CallFailure::Setup(_) => return ErrorClassification::SetupError,
            CallFailure::Transport(_) => return ErrorClassification::NetworkError,
            CallFailure::Response(response) => response,
        };

        let status = response.status.as_u16();
        match response.status {
            StatusCode::UNAUTHORIZED if !ctx.retried_for_auth => ErrorClassification::Unauthorized,
            StatusCode::TOO_MANY_REQUESTS => ErrorClassification::RateLimited {
                retry_after_secs: parse_retry_after(&response.headers)
                    .unwrap_or(self.default_retry_after_secs),
            },
            _ if TIMEOUT_STATUS_CODES.contains(&status) => ErrorClassification::Timeout,
            _ if TRANSIENT_SERVER_STATUS_CODES.contains(&status) => {
                ErrorClassification::ServerTransient(status)
            }
            _ => ErrorClassification::ServerOther(status),
        }
    }
}

/// Parse a `retry-after` header given in whole seconds
///
/// HTTP-date values and anything non-numeric yield `None`.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<u64> {
    headers.get(RETRY_AFTER_HEADER)?.to_str().ok()?.trim().parse().ok()
}
