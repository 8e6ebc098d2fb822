// Telemetry sink (SPEC_FULL.md §1.1 ambient stack): structured logging
// hooks for the planner and batcher, built on the teacher's `tracing` stack
// rather than a bespoke metrics type.

use std::time::Duration;

pub trait TelemetrySink: Send + Sync {
    fn record_plan(&self, table: &str, duration: Duration) {
        let _ = (table, duration);
    }
    fn record_batch(&self, rel_key: &str, hit: bool) {
        let _ = (rel_key, hit);
    }
    fn record_order_by_rejected(&self, table: &str, reason: &str) {
        let _ = (table, reason);
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTelemetry;

impl TelemetrySink for NoopTelemetry {}

/// Default sink: emits `tracing` events at `debug`, matching the density the
/// teacher uses for internal bookkeeping rather than user-facing logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingTelemetry;

impl TelemetrySink for TracingTelemetry {
    fn record_plan(&self, table: &str, duration: Duration) {
        tracing::debug!(table, ?duration, "planned query");
    }

    fn record_batch(&self, rel_key: &str, hit: bool) {
        tracing::debug!(rel_key, hit, "relationship batch");
    }

    fn record_order_by_rejected(&self, table: &str, reason: &str) {
        tracing::debug!(table, reason, "order-by rejected by index-prefix policy");
    }
}
