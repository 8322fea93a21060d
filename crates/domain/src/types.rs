//! Common data types used throughout the client layer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::impl_domain_status_conversions;

/// Language used for user-facing error messages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    /// Swedish (default)
    #[default]
    Sv,
    /// English
    En,
}

impl_domain_status_conversions!(Locale {
    Sv => "sv",
    En => "en",
});

/// HTTP methods the offline queue accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QueuedMethod {
    Post,
    Put,
    Delete,
}

impl QueuedMethod {
    /// Wire representation of the method
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }

    /// Map an HTTP method name onto a queueable method
    ///
    /// Returns `None` for read-only methods and for `PATCH`, which the
    /// offline queue does not store.
    #[must_use]
    pub fn from_http(method: &str) -> Option<Self> {
        match method.to_ascii_uppercase().as_str() {
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "DELETE" => Some(Self::Delete),
            _ => None,
        }
    }
}

impl std::fmt::Display for QueuedMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A mutating request parked while the device is offline
///
/// Owned by the offline queue. Immutable once created, except for
/// `retries`, which only the queue's own replay policy increments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedRequest {
    pub id: Uuid,
    pub method: QueuedMethod,
    pub endpoint: String,
    pub payload: Option<serde_json::Value>,
    pub enqueued_at: DateTime<Utc>,
    pub retries: u32,
}

impl QueuedRequest {
    /// Create a queue record stamped with the current time
    #[must_use]
    pub fn new(
        method: QueuedMethod,
        endpoint: impl Into<String>,
        payload: Option<serde_json::Value>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            method,
            endpoint: endpoint.into(),
            payload,
            enqueued_at: Utc::now(),
            retries: 0,
        }
    }
}
