//! # Lugn Domain
//!
//! Domain types shared by the Lugn API client layer.
//!
//! This crate contains:
//! - Client configuration structures
//! - Protocol constants (headers, status codes, retry and CSRF defaults)
//! - Domain error types and Result definitions
//! - Offline queue records and locale selection
//!
//! ## Architecture
//! - No dependencies on other Lugn crates
//! - No I/O; only serde/chrono/uuid/thiserror
//! - Consumed by `lugn-infra`

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
