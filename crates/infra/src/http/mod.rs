//! HTTP transport
//!
//! Thin wrapper around `reqwest` that performs exactly one transmission per
//! call. Retry, refresh, and offline handling live in [`crate::api`].

pub mod client;

pub use client::{HttpClient, HttpClientBuilder};
