use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Derived pipeline metrics, recomputed on a fixed cadence
///
/// Consumers only ever see copies of this; the aggregator owns the raw counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineMetrics {
    pub snapshots_processed: u64,
    pub signals_generated: u64,
    pub signals_executed: u64,
    pub signals_rejected: u64,
    pub positions_closed: u64,
    pub errors: u64,
    /// executed / generated
    pub success_rate: Decimal,
    /// errors / (snapshots + errors)
    pub error_rate: Decimal,
    /// Snapshots per minute over the last recompute window
    pub throughput_per_min: Decimal,
    /// Mean processing latency in milliseconds
    pub avg_latency_ms: Decimal,
    pub computed_at: Option<DateTime<Utc>>,
}
