//! # Lugn Infrastructure
//!
//! Resilient API client layer for the Lugn backend.
//!
//! This crate contains:
//! - The request pipeline (auth, CSRF, retry, refresh, offline fallback)
//! - HTTP transport built on `reqwest`
//! - Configuration loading from the environment or config files
//! - Logging initialization and in-process request metrics
//!
//! ## Architecture
//! - Depends on `lugn-domain` for configuration and shared types
//! - Contains all "impure" code (network I/O, file and environment access)
//! - Every external collaborator is injected through a trait in
//!   [`api::traits`]

pub mod api;
pub mod config;
pub mod http;
pub mod observability;

// Re-export commonly used items
pub use api::{ApiClient, ApiClientBuilder, ApiError, ApiErrorCategory, RequestContext};
pub use http::HttpClient;
pub use observability::init_tracing;
