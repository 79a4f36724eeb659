//! Prometheus text export.
//!
//! Placement metrics register themselves with the default prometheus
//! registry when `stream-placement` is built with its `metrics` feature.

use crate::TelemetryError;
use prometheus::{Encoder, TextEncoder};

/// Encode every metric in the default registry as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsExport(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsExport(e.to_string()))
}
