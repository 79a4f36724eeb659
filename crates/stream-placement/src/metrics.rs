//! # Placement Metrics
//!
//! Prometheus metrics for stream placement and membership tracking.
//!
//! ## Usage
//!
//! Enable with the `metrics` feature:
//! ```toml
//! stream-placement = { path = "...", features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! - `placement_streams_placed_total` - Counter of successful placements
//! - `placement_failures_total` - Counter of failed placements (by reason)
//! - `placement_membership_events_total` - Counter of applied feed events (by kind)
//! - `placement_membership_events_rejected_total` - Counter of rejected feed events
//! - `placement_registry_reloads_total` - Counter of registry reloads (by outcome)
//! - `placement_operational_nodes` - Gauge of operational nodes in the current view

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{
    register_int_counter, register_int_counter_vec, register_int_gauge, IntCounter, IntCounterVec,
    IntGauge,
};

#[cfg(feature = "metrics")]
lazy_static! {
    /// Total streams placed
    pub static ref STREAMS_PLACED: IntCounter = register_int_counter!(
        "placement_streams_placed_total",
        "Total number of streams placed"
    )
    .expect("Failed to create STREAMS_PLACED metric");

    /// Total failed placements, labeled by reason
    pub static ref PLACEMENT_FAILURES: IntCounterVec = register_int_counter_vec!(
        "placement_failures_total",
        "Total number of failed placement decisions",
        &["reason"]
    )
    .expect("Failed to create PLACEMENT_FAILURES metric");

    /// Total membership events applied, labeled by kind
    pub static ref MEMBERSHIP_EVENTS: IntCounterVec = register_int_counter_vec!(
        "placement_membership_events_total",
        "Total number of registry membership events applied",
        &["kind"]
    )
    .expect("Failed to create MEMBERSHIP_EVENTS metric");

    /// Total membership events rejected as invalid transitions
    pub static ref MEMBERSHIP_EVENTS_REJECTED: IntCounter = register_int_counter!(
        "placement_membership_events_rejected_total",
        "Total number of registry membership events rejected"
    )
    .expect("Failed to create MEMBERSHIP_EVENTS_REJECTED metric");

    /// Total registry reloads, labeled by outcome
    pub static ref REGISTRY_RELOADS: IntCounterVec = register_int_counter_vec!(
        "placement_registry_reloads_total",
        "Total number of membership reloads from the registry",
        &["outcome"]
    )
    .expect("Failed to create REGISTRY_RELOADS metric");

    /// Operational nodes in the current view
    pub static ref OPERATIONAL_NODES: IntGauge = register_int_gauge!(
        "placement_operational_nodes",
        "Number of operational nodes in the membership view"
    )
    .expect("Failed to create OPERATIONAL_NODES metric");
}

// =============================================================================
// METRIC RECORDING FUNCTIONS
// =============================================================================

/// Record a successful placement
#[cfg(feature = "metrics")]
pub fn record_stream_placed() {
    STREAMS_PLACED.inc();
}

/// Record a failed placement with reason
#[cfg(feature = "metrics")]
pub fn record_placement_failure(reason: &str) {
    PLACEMENT_FAILURES.with_label_values(&[reason]).inc();
}

/// Record an applied membership event
#[cfg(feature = "metrics")]
pub fn record_membership_event(kind: &str) {
    MEMBERSHIP_EVENTS.with_label_values(&[kind]).inc();
}

/// Record a rejected membership event
#[cfg(feature = "metrics")]
pub fn record_membership_event_rejected() {
    MEMBERSHIP_EVENTS_REJECTED.inc();
}

/// Record a registry reload
#[cfg(feature = "metrics")]
pub fn record_registry_reload(success: bool) {
    let outcome = if success { "ok" } else { "error" };
    REGISTRY_RELOADS.with_label_values(&[outcome]).inc();
}

/// Update operational node gauge
#[cfg(feature = "metrics")]
pub fn set_operational_nodes(count: usize) {
    OPERATIONAL_NODES.set(count as i64);
}

// =============================================================================
// NO-OP IMPLEMENTATIONS (when metrics feature is disabled)
// =============================================================================

/// Record a successful placement (no-op)
#[cfg(not(feature = "metrics"))]
pub fn record_stream_placed() {}

/// Record a failed placement with reason (no-op)
#[cfg(not(feature = "metrics"))]
pub fn record_placement_failure(_reason: &str) {}

/// Record an applied membership event (no-op)
#[cfg(not(feature = "metrics"))]
pub fn record_membership_event(_kind: &str) {}

/// Record a rejected membership event (no-op)
#[cfg(not(feature = "metrics"))]
pub fn record_membership_event_rejected() {}

/// Record a registry reload (no-op)
#[cfg(not(feature = "metrics"))]
pub fn record_registry_reload(_success: bool) {}

/// Update operational node gauge (no-op)
#[cfg(not(feature = "metrics"))]
pub fn set_operational_nodes(_count: usize) {}
