//! Meridian Monitor
//!
//! Alerting and metrics for the pipeline:
//! - **AlertBus**: at most one active alert per `(category, metric)`,
//!   raised on crossing and resolved once on clearing
//! - **MetricsAggregator**: raw counters in, derived rates out on a cadence
//! - **PerformanceMonitor**: error rate, latency, win rate and drawdown checks
//!
//! ```text
//! record_*() ──► MetricsAggregator ──recompute──► PipelineMetrics
//!                                                      │
//! Ledger ──► PerformanceMetrics ──► PerformanceMonitor ┤
//! PortfolioRiskMonitor ────────────────────────────────┤ observe()
//!                                                      ▼
//!                                                  AlertBus
//! ```

pub mod alerts;
pub mod error;
pub mod metrics;
pub mod performance;

pub use alerts::{AlertBus, AlertTransition, ThresholdMode, severity_for, suggested_action};
pub use error::{MonitorError, Result};
pub use metrics::MetricsAggregator;
pub use performance::{PerformanceMonitor, PerformanceThresholds};
