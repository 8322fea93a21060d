//! Default telemetry sink

use async_trait::async_trait;
use serde_json::Value;

use crate::api::errors::CollaboratorError;
use crate::api::traits::TelemetrySink;

/// Writes telemetry events to the `lugn::telemetry` tracing target
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTelemetrySink;

#[async_trait]
impl TelemetrySink for TracingTelemetrySink {
    async fn track_event(&self, name: &str, properties: Value) -> Result<(), CollaboratorError> {
        tracing::info!(target: "lugn::telemetry", event = name, properties = %properties, "telemetry event");
        Ok(())
    }
}
