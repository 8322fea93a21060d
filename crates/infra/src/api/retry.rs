//! Bounded linear-backoff retries for transient failures

use std::time::Duration;

use lugn_domain::constants::{BASE_DELAY_MS, MAX_RETRIES, RETRYABLE_STATUS_CODES};
use lugn_domain::ApiConfig;
use reqwest::StatusCode;
use tracing::debug;

use super::classifier::ErrorClassification;
use super::context::RequestContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Retries after the initial attempt
    pub max_retries: u32,
    /// Backoff unit; attempt `k` waits `base_delay * k`
    pub base_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_retries: MAX_RETRIES, base_delay: Duration::from_millis(BASE_DELAY_MS) }
    }
}

impl From<&ApiConfig> for RetryConfig {
    fn from(config: &ApiConfig) -> Self {
        Self { max_retries: config.max_retries, base_delay: config.base_delay() }
    }
}

#[derive(Debug, Clone)]
pub struct RetryScheduler {
    config: RetryConfig,
}

impl RetryScheduler {
    pub const fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn is_retryable_status(status: StatusCode) -> bool {
        RETRYABLE_STATUS_CODES.contains(&status.as_u16())
    }

    /// Retry decision, based on the response status alone
    ///
    /// Failures without a response (transport, setup) are never retried here.
    pub fn should_retry(&self, ctx: &RequestContext, status: Option<StatusCode>) -> bool {
        status.is_some_and(Self::is_retryable_status) && ctx.retry_count < self.config.max_retries
    }

    /// Delay before retry number `attempt` (1-based)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.config.base_delay.saturating_mul(attempt)
    }

    /// Wait and hand back the context for reissue, or `None` to surface the
    /// error.
    pub async fn maybe_retry(
        &self,
        mut ctx: RequestContext,
        classification: ErrorClassification,
        status: Option<StatusCode>,
    ) -> Option<RequestContext> {
        if !self.should_retry(&ctx, status) {
            return None;
        }

        ctx.retry_count += 1;
        let delay = self.delay_for_attempt(ctx.retry_count);
        debug!(
            url = %ctx.url,
            request_id = %ctx.request_id,
            retry = ctx.retry_count,
            max_retries = self.config.max_retries,
            classification = classification.label(),
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "scheduling retry"
        );
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Some(ctx)
    }
}
