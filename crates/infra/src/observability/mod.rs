//! Observability infrastructure for logging, telemetry, and latency metrics
//!
//! ## Design Principles
//!
//! 1. **Poison Recovery**: mutex locks recover the inner data instead of
//!    panicking; a poisoned metrics buffer is logged and reused.
//!
//! 2. **Future-Proof Returns**: record methods return `MetricsResult<()>`
//!    but currently always succeed.
//!
//! 3. **Ring Buffers**: `VecDeque` for O(1) eviction of old latency samples.
//!
//! ## Error Handling
//!
//! ```rust
//! use std::time::Duration;
//! use lugn_infra::observability::metrics::RequestMetrics;
//!
//! let metrics = RequestMetrics::new();
//!
//! if let Err(e) = metrics.record_attempt(Duration::from_millis(12), true) {
//!     tracing::warn!("Failed to record metric: {}", e);
//! }
//! ```

pub mod metrics;
pub mod telemetry;

use lugn_domain::LoggingConfig;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::EnvFilter;

/// Metrics error type
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Empty data set - cannot calculate aggregate metric
    #[error("Empty data: cannot calculate {metric}")]
    EmptyData {
        /// Metric name that failed (e.g., "P95", "P50")
        metric: &'static str,
    },
}

/// Result type for metrics operations
pub type MetricsResult<T> = Result<T, MetricsError>;

/// Install the global tracing subscriber
///
/// `RUST_LOG` takes precedence over `config.level`. Should be called once
/// at application startup.
///
/// # Errors
/// Returns `TryInitError` if a global subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), TryInitError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    if config.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry().with(filter).with(tracing_subscriber::fmt::layer()).try_init()
    }
}
