//! Performance checks feeding the alert bus

use meridian_core::{AlertKey, PerformanceMetrics, PipelineMetrics, Timestamp};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::alerts::{AlertBus, AlertTransition, ThresholdMode};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceThresholds {
    /// errors / (snapshots + errors)
    #[serde(default = "default_max_error_rate")]
    pub max_error_rate: Decimal,
    #[serde(default = "default_max_latency_ms")]
    pub max_latency_ms: Decimal,
    #[serde(default = "default_min_win_rate")]
    pub min_win_rate: Decimal,
    /// Closed trades needed before win rate is judged
    #[serde(default = "default_min_trades")]
    pub min_trades_for_win_rate: usize,
    /// Max drawdown of the realized equity curve (fraction)
    #[serde(default = "default_max_drawdown")]
    pub max_drawdown: Decimal,
}

impl Default for PerformanceThresholds {
    fn default() -> Self {
        Self {
            max_error_rate: default_max_error_rate(),
            max_latency_ms: default_max_latency_ms(),
            min_win_rate: default_min_win_rate(),
            min_trades_for_win_rate: default_min_trades(),
            max_drawdown: default_max_drawdown(),
        }
    }
}

fn default_max_error_rate() -> Decimal {
    dec!(0.1)
}

fn default_max_latency_ms() -> Decimal {
    dec!(1000)
}

fn default_min_win_rate() -> Decimal {
    dec!(0.4)
}

fn default_min_trades() -> usize {
    5
}

fn default_max_drawdown() -> Decimal {
    dec!(0.15)
}

pub struct PerformanceMonitor {
    thresholds: PerformanceThresholds,
}

impl PerformanceMonitor {
    pub fn new(thresholds: PerformanceThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &PerformanceThresholds {
        &self.thresholds
    }

    /// Observe every performance metric; returns only raised/resolved transitions
    pub fn check(
        &self,
        bus: &mut AlertBus,
        pipeline: &PipelineMetrics,
        performance: &PerformanceMetrics,
        now: Timestamp,
    ) -> Vec<AlertTransition> {
        let t = &self.thresholds;
        let mut transitions = vec![
            bus.observe(
                AlertKey::performance("error_rate"),
                pipeline.error_rate,
                t.max_error_rate,
                ThresholdMode::Normal,
                now,
            ),
            bus.observe(
                AlertKey::performance("latency"),
                pipeline.avg_latency_ms,
                t.max_latency_ms,
                ThresholdMode::Normal,
                now,
            ),
            bus.observe(
                AlertKey::performance("drawdown"),
                performance.max_drawdown,
                t.max_drawdown,
                ThresholdMode::Normal,
                now,
            ),
        ];

        // Too few trades: treat as healthy so a stale alert clears
        let win_rate = if performance.total_trades >= t.min_trades_for_win_rate {
            performance.win_rate
        } else {
            Decimal::ONE
        };
        transitions.push(bus.observe(
            AlertKey::performance("win_rate"),
            win_rate,
            t.min_win_rate,
            ThresholdMode::Reverse,
            now,
        ));

        transitions.retain(AlertTransition::is_change);
        transitions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use meridian_core::AlertSeverity;

    #[test]
    fn test_error_rate_alert() {
        let monitor = PerformanceMonitor::new(PerformanceThresholds::default());
        let mut bus = AlertBus::default();
        let pipeline = PipelineMetrics {
            error_rate: dec!(0.25),
            ..Default::default()
        };

        let raised = monitor.check(&mut bus, &pipeline, &PerformanceMetrics::default(), Utc::now());
        assert_eq!(raised.len(), 1);
        let AlertTransition::Raised(alert) = &raised[0] else {
            panic!("expected raise");
        };
        assert_eq!(alert.key, AlertKey::performance("error_rate"));
        assert_eq!(alert.severity, AlertSeverity::Critical);

        // Same reading again: nothing new
        assert!(monitor.check(&mut bus, &pipeline, &PerformanceMetrics::default(), Utc::now()).is_empty());
    }

    #[test]
    fn test_win_rate_needs_enough_trades() {
        let monitor = PerformanceMonitor::new(PerformanceThresholds::default());
        let mut bus = AlertBus::default();
        let pipeline = PipelineMetrics::default();

        let few = PerformanceMetrics {
            total_trades: 2,
            win_rate: Decimal::ZERO,
            ..Default::default()
        };
        assert!(monitor.check(&mut bus, &pipeline, &few, Utc::now()).is_empty());

        let many = PerformanceMetrics {
            total_trades: 10,
            win_rate: dec!(0.3),
            ..Default::default()
        };
        let transitions = monitor.check(&mut bus, &pipeline, &many, Utc::now());
        assert!(matches!(&transitions[..], [AlertTransition::Raised(a)] if a.key.metric_id == "win_rate"));
    }
}
