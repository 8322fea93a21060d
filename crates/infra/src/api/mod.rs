//! Resilient API client layer for the Lugn backend
//!
//! Every outbound call passes through one pipeline that attaches the bearer
//! token and CSRF token, classifies failures, and recovers where it can.
//!
//! # Architecture
//!
//! - [`request::RequestInterceptor`] prepares each transmission
//! - [`crate::http::HttpClient`] sends it exactly once
//! - [`response::ResponseInterceptor`] delivers the response or dispatches
//!   the failure to refresh, retry, or the offline queue
//! - [`client::ApiClient`] loops until one of them terminates the call
//!
//! All side-effecting dependencies are injected through [`traits`].

pub mod auth;
pub mod classifier;
pub mod client;
pub mod clock;
pub mod context;
pub mod csrf;
pub mod errors;
pub mod messages;
pub mod offline;
pub mod refresh;
pub mod request;
pub mod response;
pub mod retry;
pub mod traits;

#[cfg(test)]
pub(crate) mod testing;

pub use auth::{HttpCredentialRefresher, InMemorySessionStore};
pub use classifier::{ErrorClassification, ErrorClassifier};
pub use client::{ApiClient, ApiClientBuilder};
pub use clock::{Clock, MockClock, SystemClock};
pub use context::{ApiResponse, CallFailure, RequestContext};
pub use csrf::{CsrfError, CsrfToken, CsrfTokenCache, HttpCsrfIssuer};
pub use errors::{ApiError, ApiErrorCategory, CollaboratorError};
pub use offline::{ConnectivityFlag, MemoryOfflineQueue, OfflineQueueBridge};
pub use refresh::{RefreshOutcome, TokenRefreshCoordinator};
pub use request::RequestInterceptor;
pub use response::{Disposition, ResponseInterceptor};
pub use retry::{RetryConfig, RetryScheduler};
pub use traits::{
    ConnectivityProbe, CredentialRefresher, CsrfIssuer, OfflineQueue, SessionStore, TelemetrySink,
};
