//! Flow telemetry
//!
//! Lock-free counters for the quote/execute pipeline, served on /v1/stats.
//! No wallet addresses or keys are recorded.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Pipeline events worth counting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowEvent {
    QuoteBuilt,
    QuoteFailed,
    ExecutionSucceeded,
    ExecutionFailed,
    SwapReverted,
    FeeLegFailed,
    ManualOrderSubmitted,
    ManualOrderFailed,
}

/// Snapshot for reporting
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowStats {
    pub quotes_built: u64,
    pub quotes_failed: u64,
    pub executions_succeeded: u64,
    pub executions_failed: u64,
    pub swaps_reverted: u64,
    pub fee_legs_failed: u64,
    pub manual_orders_submitted: u64,
    pub manual_orders_failed: u64,
    /// Average execute latency (ms) over all attempts
    pub avg_execution_ms: f64,
    pub period_start: u64,
    pub period_end: u64,
}

#[derive(Debug)]
pub struct FlowTelemetry {
    quotes_built: AtomicU64,
    quotes_failed: AtomicU64,
    executions_succeeded: AtomicU64,
    executions_failed: AtomicU64,
    swaps_reverted: AtomicU64,
    fee_legs_failed: AtomicU64,
    manual_orders_submitted: AtomicU64,
    manual_orders_failed: AtomicU64,
    total_execution_ms: AtomicU64,
    session_start: u64,
}

impl FlowTelemetry {
    pub fn new() -> Self {
        Self {
            quotes_built: AtomicU64::new(0),
            quotes_failed: AtomicU64::new(0),
            executions_succeeded: AtomicU64::new(0),
            executions_failed: AtomicU64::new(0),
            swaps_reverted: AtomicU64::new(0),
            fee_legs_failed: AtomicU64::new(0),
            manual_orders_submitted: AtomicU64::new(0),
            manual_orders_failed: AtomicU64::new(0),
            total_execution_ms: AtomicU64::new(0),
            session_start: current_timestamp(),
        }
    }

    pub fn record(&self, event: FlowEvent) {
        let counter = match event {
            FlowEvent::QuoteBuilt => &self.quotes_built,
            FlowEvent::QuoteFailed => &self.quotes_failed,
            FlowEvent::ExecutionSucceeded => &self.executions_succeeded,
            FlowEvent::ExecutionFailed => &self.executions_failed,
            FlowEvent::SwapReverted => &self.swaps_reverted,
            FlowEvent::FeeLegFailed => &self.fee_legs_failed,
            FlowEvent::ManualOrderSubmitted => &self.manual_orders_submitted,
            FlowEvent::ManualOrderFailed => &self.manual_orders_failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_execution_latency(&self, latency_ms: u64) {
        self.total_execution_ms.fetch_add(latency_ms, Ordering::Relaxed);
    }

    pub fn get_stats(&self) -> FlowStats {
        let succeeded = self.executions_succeeded.load(Ordering::Relaxed);
        let failed = self.executions_failed.load(Ordering::Relaxed);
        let attempts = succeeded + failed;
        let avg_execution_ms = if attempts > 0 {
            self.total_execution_ms.load(Ordering::Relaxed) as f64 / attempts as f64
        } else {
            0.0
        };

        FlowStats {
            quotes_built: self.quotes_built.load(Ordering::Relaxed),
            quotes_failed: self.quotes_failed.load(Ordering::Relaxed),
            executions_succeeded: succeeded,
            executions_failed: failed,
            swaps_reverted: self.swaps_reverted.load(Ordering::Relaxed),
            fee_legs_failed: self.fee_legs_failed.load(Ordering::Relaxed),
            manual_orders_submitted: self.manual_orders_submitted.load(Ordering::Relaxed),
            manual_orders_failed: self.manual_orders_failed.load(Ordering::Relaxed),
            avg_execution_ms,
            period_start: self.session_start,
            period_end: current_timestamp(),
        }
    }
}

impl Default for FlowTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let telemetry = FlowTelemetry::new();
        telemetry.record(FlowEvent::QuoteBuilt);
        telemetry.record(FlowEvent::QuoteBuilt);
        telemetry.record(FlowEvent::ExecutionSucceeded);
        telemetry.record(FlowEvent::ExecutionFailed);
        telemetry.record_execution_latency(100);
        telemetry.record_execution_latency(300);

        let stats = telemetry.get_stats();
        assert_eq!(stats.quotes_built, 2);
        assert_eq!(stats.executions_succeeded, 1);
        assert_eq!(stats.executions_failed, 1);
        assert_eq!(stats.avg_execution_ms, 200.0);
        assert!(stats.period_end >= stats.period_start);
    }

    #[test]
    fn test_empty_stats() {
        let stats = FlowTelemetry::new().get_stats();
        assert_eq!(stats.avg_execution_ms, 0.0);
        assert_eq!(stats.fee_legs_failed, 0);
    }
}
