//! Request metrics for the API pipeline
//!
//! Counts completed attempts, failed attempts, and scheduled retries, and
//! keeps the latest 1000 attempt latencies for P50/P95/P99.
//!
//! ## Design
//! - **VecDeque ring buffer** for O(1) eviction
//! - **Poison-safe locking** with explicit match pattern (no .expect())
//! - **MetricsResult returns** (currently always Ok)

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crate::observability::{MetricsError, MetricsResult};

const MAX_SAMPLES: usize = 1000;

#[derive(Debug)]
pub struct RequestMetrics {
    total: AtomicUsize,
    failed: AtomicUsize,
    retried: AtomicUsize,
    /// Attempt latencies in milliseconds (ring buffer, max 1000)
    latencies: Mutex<VecDeque<u64>>,
}

impl Default for RequestMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestMetrics {
    pub fn new() -> Self {
        Self {
            total: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            retried: AtomicUsize::new(0),
            latencies: Mutex::new(VecDeque::with_capacity(MAX_SAMPLES)),
        }
    }

    fn samples(&self) -> MutexGuard<'_, VecDeque<u64>> {
        match self.latencies.lock() {
            Ok(guard) => guard,
            Err(poison_err) => {
                tracing::warn!(
                    metric = "RequestMetrics::latencies",
                    "Mutex poisoned, recovering data"
                );
                poison_err.into_inner()
            }
        }
    }

    /// Record one completed transmission
    pub fn record_attempt(&self, duration: Duration, success: bool) -> MetricsResult<()> {
        self.total.fetch_add(1, Ordering::SeqCst);
        if !success {
            self.failed.fetch_add(1, Ordering::SeqCst);
        }

        let ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        let mut samples = self.samples();
        samples.push_back(ms);
        if samples.len() > MAX_SAMPLES {
            samples.pop_front();
        }
        Ok(())
    }

    /// Record that a retry was scheduled
    pub fn record_retry(&self) -> MetricsResult<()> {
        self.retried.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    pub fn total_requests(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }

    pub fn failed_requests(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    pub fn retried_requests(&self) -> usize {
        self.retried.load(Ordering::SeqCst)
    }

    /// Fraction of attempts that failed; 0.0 before any attempt
    #[allow(clippy::cast_precision_loss)]
    pub fn failure_rate(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            return 0.0;
        }
        self.failed_requests() as f64 / total as f64
    }

    /// Returns `MetricsError::EmptyData` if no samples recorded.
    pub fn p50_ms(&self) -> MetricsResult<u64> {
        self.percentile(0.50, "P50")
    }

    /// Returns `MetricsError::EmptyData` if no samples recorded.
    pub fn p95_ms(&self) -> MetricsResult<u64> {
        self.percentile(0.95, "P95")
    }

    /// Returns `MetricsError::EmptyData` if no samples recorded.
    pub fn p99_ms(&self) -> MetricsResult<u64> {
        self.percentile(0.99, "P99")
    }

    /// Holds the lock for the whole computation for a consistent snapshot.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    fn percentile(&self, percentile: f64, metric: &'static str) -> MetricsResult<u64> {
        let samples = self.samples();
        if samples.is_empty() {
            return Err(MetricsError::EmptyData { metric });
        }

        let mut sorted: Vec<u64> = samples.iter().copied().collect();
        sorted.sort_unstable();

        let index = ((sorted.len() as f64 * percentile) as usize).min(sorted.len() - 1);
        Ok(sorted[index])
    }
}
