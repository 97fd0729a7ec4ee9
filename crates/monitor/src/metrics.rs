//! Pipeline metrics aggregation
//!
//! Raw counters are fed through `record_*` calls; derived rates are only
//! recomputed on the monitoring cadence via [`MetricsAggregator::recompute`].

use std::time::Duration;

use meridian_core::{PipelineMetrics, Timestamp};
use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Counters {
    snapshots: u64,
    generated: u64,
    executed: u64,
    rejected: u64,
    closed: u64,
    errors: u64,
    latency_total_us: u64,
    latency_samples: u64,
}

pub struct MetricsAggregator {
    counters: Counters,
    /// Start of the current throughput window
    window_start: Timestamp,
    window_snapshots: u64,
    current: PipelineMetrics,
}

impl MetricsAggregator {
    pub fn new(now: Timestamp) -> Self {
        Self {
            counters: Counters::default(),
            window_start: now,
            window_snapshots: 0,
            current: PipelineMetrics::default(),
        }
    }

    /// One snapshot processed end to end in `latency`
    pub fn record_snapshot(&mut self, latency: Duration) {
        self.counters.snapshots += 1;
        let micros = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
        self.counters.latency_total_us = self.counters.latency_total_us.saturating_add(micros);
        self.counters.latency_samples += 1;
    }

    pub fn record_signal_generated(&mut self) {
        self.counters.generated += 1;
    }

    pub fn record_signal_executed(&mut self) {
        self.counters.executed += 1;
    }

    pub fn record_signal_rejected(&mut self) {
        self.counters.rejected += 1;
    }

    pub fn record_position_closed(&mut self) {
        self.counters.closed += 1;
    }

    pub fn record_error(&mut self) {
        self.counters.errors += 1;
    }

    /// Derive rates from the raw counters
    pub fn recompute(&mut self, now: Timestamp) -> &PipelineMetrics {
        let c = self.counters;

        let success_rate = ratio(c.executed, c.generated);
        let error_rate = ratio(c.errors, c.snapshots + c.errors);

        let window_ms = (now - self.window_start).num_milliseconds();
        let throughput_per_min = if window_ms > 0 {
            Decimal::from(c.snapshots - self.window_snapshots) * Decimal::from(60_000)
                / Decimal::from(window_ms)
        } else {
            Decimal::ZERO
        };

        let avg_latency_ms = if c.latency_samples > 0 {
            Decimal::from(c.latency_total_us)
                / Decimal::from(c.latency_samples)
                / Decimal::from(1000)
        } else {
            Decimal::ZERO
        };

        self.current = PipelineMetrics {
            snapshots_processed: c.snapshots,
            signals_generated: c.generated,
            signals_executed: c.executed,
            signals_rejected: c.rejected,
            positions_closed: c.closed,
            errors: c.errors,
            success_rate,
            error_rate,
            throughput_per_min,
            avg_latency_ms,
            computed_at: Some(now),
        };

        self.window_start = now;
        self.window_snapshots = c.snapshots;

        log::debug!(
            "[PIPELINE] Metrics: {} snapshots, {} signals, {} executed, error rate {}",
            c.snapshots,
            c.generated,
            c.executed,
            error_rate.round_dp(4)
        );
        &self.current
    }

    /// Last recomputed metrics
    pub fn metrics(&self) -> PipelineMetrics {
        self.current.clone()
    }

    /// Reset every counter and start a new window
    pub fn roll_day(&mut self, now: Timestamp) {
        self.counters = Counters::default();
        self.window_start = now;
        self.window_snapshots = 0;
        self.current = PipelineMetrics {
            computed_at: Some(now),
            ..Default::default()
        };
    }
}

fn ratio(numerator: u64, denominator: u64) -> Decimal {
    if denominator == 0 {
        return Decimal::ZERO;
    }
    Decimal::from(numerator) / Decimal::from(denominator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    #[test]
    fn test_derived_rates() {
        let start = Utc::now();
        let mut agg = MetricsAggregator::new(start);

        for _ in 0..9 {
            agg.record_snapshot(Duration::from_millis(20));
        }
        agg.record_error();
        for _ in 0..4 {
            agg.record_signal_generated();
        }
        agg.record_signal_executed();
        agg.record_signal_rejected();

        let metrics = agg.recompute(start + chrono::Duration::seconds(30)).clone();
        assert_eq!(metrics.snapshots_processed, 9);
        assert_eq!(metrics.success_rate, dec!(0.25));
        assert_eq!(metrics.error_rate, dec!(0.1));
        assert_eq!(metrics.throughput_per_min, dec!(18));
        assert_eq!(metrics.avg_latency_ms, dec!(20));
    }

    #[test]
    fn test_counters_survive_recompute() {
        let start = Utc::now();
        let mut agg = MetricsAggregator::new(start);
        agg.record_snapshot(Duration::from_millis(10));
        agg.recompute(start + chrono::Duration::minutes(1));

        agg.record_snapshot(Duration::from_millis(30));
        let metrics = agg.recompute(start + chrono::Duration::minutes(2)).clone();
        assert_eq!(metrics.snapshots_processed, 2);
        // One snapshot in the second one-minute window
        assert_eq!(metrics.throughput_per_min, Decimal::ONE);
        assert_eq!(metrics.avg_latency_ms, dec!(20));
    }

    #[test]
    fn test_roll_day_resets() {
        let start = Utc::now();
        let mut agg = MetricsAggregator::new(start);
        agg.record_error();
        agg.record_signal_generated();
        agg.roll_day(start);

        let metrics = agg.recompute(start).clone();
        assert_eq!(metrics.errors, 0);
        assert_eq!(metrics.signals_generated, 0);
        assert_eq!(metrics.throughput_per_min, Decimal::ZERO);
    }
}
