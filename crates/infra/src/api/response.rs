//! Inbound response handling and recovery dispatch

use std::sync::Arc;

use lugn_domain::constants::{EVENT_API_ERROR, EVENT_API_RATE_LIMITED, EVENT_API_REQUEST};
use lugn_domain::Locale;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::classifier::{ErrorClassification, ErrorClassifier};
use super::context::{ApiResponse, CallFailure, RequestContext};
use super::errors::ApiError;
use super::messages;
use super::offline::OfflineQueueBridge;
use super::refresh::{RefreshOutcome, TokenRefreshCoordinator};
use super::retry::RetryScheduler;
use super::traits::TelemetrySink;
use crate::observability::metrics::RequestMetrics;

/// What the pipeline does with a completed attempt
#[derive(Debug)]
pub enum Disposition {
    /// Hand the response to the caller
    Deliver(ApiResponse),
    /// Send the (mutated) request again
    Reissue(RequestContext),
    /// Terminate the call with an error
    Surface(ApiError),
}

pub struct ResponseInterceptor {
    classifier: ErrorClassifier,
    refresh: Arc<TokenRefreshCoordinator>,
    retry: RetryScheduler,
    offline: OfflineQueueBridge,
    telemetry: Arc<dyn TelemetrySink>,
    metrics: Arc<RequestMetrics>,
    locale: Locale,
}

impl ResponseInterceptor {
    pub fn new(
        classifier: ErrorClassifier,
        refresh: Arc<TokenRefreshCoordinator>,
        retry: RetryScheduler,
        offline: OfflineQueueBridge,
        telemetry: Arc<dyn TelemetrySink>,
        metrics: Arc<RequestMetrics>,
        locale: Locale,
    ) -> Self {
        Self { classifier, refresh, retry, offline, telemetry, metrics, locale }
    }

    pub async fn handle(
        &self,
        ctx: RequestContext,
        result: Result<ApiResponse, CallFailure>,
    ) -> Disposition {
        match result {
            Ok(response) => self.on_success(&ctx, response).await,
            Err(failure) => self.on_failure(ctx, failure).await,
        }
    }

    async fn on_success(&self, ctx: &RequestContext, response: ApiResponse) -> Disposition {
        let duration_ms = ctx.elapsed_ms();
        self.record_attempt(ctx, true);
        debug!(url = %ctx.url, status = %response.status, duration_ms, "request succeeded");

        self.emit(
            EVENT_API_REQUEST,
            json!({
                "request_id": ctx.request_id.to_string(),
                "url": ctx.url,
                "method": ctx.method.as_str(),
                "status": response.status.as_u16(),
                "duration_ms": duration_ms,
                "response_size": response.size(),
                "content_type": response.content_type(),
                "retry_count": ctx.retry_count,
            }),
        )
        .await;
        Disposition::Deliver(response)
    }

    async fn on_failure(&self, ctx: RequestContext, failure: CallFailure) -> Disposition {
        let classification = self.classifier.classify(&failure, &ctx);
        let status = failure.status();
        self.record_attempt(&ctx, false);

        self.emit(
            EVENT_API_ERROR,
            json!({
                "request_id": ctx.request_id.to_string(),
                "url": ctx.url,
                "method": ctx.method.as_str(),
                "status": status.map(|s| s.as_u16()),
                "duration_ms": ctx.elapsed_ms(),
                "classification": classification.label(),
                "retry_count": ctx.retry_count,
            }),
        )
        .await;

        let original = ApiError::from_failure(&failure, &ctx.url);
        match classification {
            ErrorClassification::Unauthorized => match self.refresh.handle_unauthorized(ctx).await {
                RefreshOutcome::Reissue(next) => Disposition::Reissue(next),
                RefreshOutcome::InFlight | RefreshOutcome::LoggedOut => Disposition::Surface(original),
            },
            ErrorClassification::RateLimited { retry_after_secs } => {
                self.emit(
                    EVENT_API_RATE_LIMITED,
                    json!({
                        "url": ctx.url,
                        "method": ctx.method.as_str(),
                        "retry_after": retry_after_secs,
                    }),
                )
                .await;
                Disposition::Surface(ApiError::RateLimited {
                    endpoint: ctx.url,
                    retry_after_secs,
                    message: messages::rate_limited(self.locale, retry_after_secs),
                })
            }
            ErrorClassification::Timeout | ErrorClassification::NetworkError
                if self.offline.is_offline() =>
            {
                match self.offline.enqueue(&ctx).await {
                    Some(method) => Disposition::Surface(ApiError::QueuedOffline {
                        method,
                        endpoint: ctx.url,
                        message: messages::queued_offline(self.locale).to_string(),
                    }),
                    None => Disposition::Surface(original),
                }
            }
            _ => match self.retry.maybe_retry(ctx, classification, status).await {
                Some(next) => {
                    if let Err(err) = self.metrics.record_retry() {
                        warn!(error = %err, "Failed to record retry metric");
                    }
                    Disposition::Reissue(next)
                }
                None => Disposition::Surface(original),
            },
        }
    }

    fn record_attempt(&self, ctx: &RequestContext, success: bool) {
        if let Err(err) = self.metrics.record_attempt(ctx.elapsed().unwrap_or_default(), success) {
            warn!(error = %err, "Failed to record request metric");
        }
    }

    async fn emit(&self, name: &str, properties: Value) {
        if let Err(err) = self.telemetry.track_event(name, properties).await {
            warn!(event = name, error = %err, "telemetry event dropped");
        }
    }
}
