// judgment-gate-mcp/src/telemetry.rs
// ============================================================================
// Module: Gate Telemetry
// Description: Observability hooks for transports and request dispatch.
// Purpose: Provide metric events and latency buckets without hard deps.
// Dependencies: judgment-gate-config
// ============================================================================

//! ## Overview
//! This module exposes a thin metrics interface for request counters and
//! latency histograms. It is intentionally dependency-light so downstream
//! deployments can plug in Prometheus or OpenTelemetry without redesign.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use judgment_gate_config::ServerTransport;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default latency buckets in milliseconds for request histograms.
pub const RPC_LATENCY_BUCKETS_MS: &[u64] =
    &[1, 2, 5, 10, 25, 50, 100, 250, 500, 1_000, 2_500, 5_000, 10_000, 30_000];

// ============================================================================
// SECTION: Metric Labels
// ============================================================================

/// Request outcome classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcOutcome {
    /// Successful request.
    Ok,
    /// Failed request.
    Error,
    /// Notification; no response was produced.
    Silent,
}

/// Request metric event payload.
#[derive(Debug, Clone)]
pub struct RpcMetricEvent {
    /// Transport used for the request.
    pub transport: ServerTransport,
    /// JSON-RPC method name.
    pub method: String,
    /// Request outcome.
    pub outcome: RpcOutcome,
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Metrics sink for requests and latencies.
pub trait RpcMetrics: Send + Sync {
    /// Records a request counter event.
    fn record_request(&self, event: RpcMetricEvent);
    /// Records a latency observation for the request.
    fn record_latency(&self, event: RpcMetricEvent, latency: Duration);
}

/// No-op metrics sink.
pub struct NoopMetrics;

impl RpcMetrics for NoopMetrics {
    fn record_request(&self, _event: RpcMetricEvent) {}

    fn record_latency(&self, _event: RpcMetricEvent, _latency: Duration) {}
}
