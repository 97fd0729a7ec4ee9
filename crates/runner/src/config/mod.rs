//! Pipeline configuration
//!
//! One JSON document aggregates every component's settings. Missing sections
//! and fields fall back to their defaults.

mod loader;

pub use loader::{ConfigError, load_config, load_config_from_str, load_default_config};

use chrono::Duration;
use meridian_gateway::{FeedConfig, HttpSourceConfig, SimulatedSourceConfig};
use meridian_monitor::PerformanceThresholds;
use meridian_order_manager::LedgerConfig;
use meridian_risk_manager::RiskParameters;
use meridian_strategy::SignalConfig;
use serde::{Deserialize, Serialize};

/// Where polled tickers come from
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceConfig {
    Simulated(SimulatedSourceConfig),
    Http(HttpSourceConfig),
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig::Simulated(SimulatedSourceConfig::default())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub signals: SignalConfig,
    #[serde(default)]
    pub risk: RiskParameters,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub performance: PerformanceThresholds,
    /// Portfolio risk monitoring cadence
    #[serde(default = "default_risk_interval")]
    pub risk_check_interval_ms: u64,
    /// Metrics recompute cadence
    #[serde(default = "default_metrics_interval")]
    pub metrics_interval_ms: u64,
    /// Pause between two queued snapshots, bounding burst rate
    #[serde(default)]
    pub item_delay_ms: u64,
    /// How often `run` wakes up to fire due tasks
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
    /// Fill approved signals immediately instead of waiting for `execute_signal`
    #[serde(default = "default_auto_execute")]
    pub auto_execute: bool,
    #[serde(default = "default_alert_history")]
    pub alert_history_limit: usize,
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
    #[serde(default = "default_vision_timeout")]
    pub vision_timeout_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            feed: FeedConfig::default(),
            source: SourceConfig::default(),
            signals: SignalConfig::default(),
            risk: RiskParameters::default(),
            ledger: LedgerConfig::default(),
            performance: PerformanceThresholds::default(),
            risk_check_interval_ms: default_risk_interval(),
            metrics_interval_ms: default_metrics_interval(),
            item_delay_ms: 0,
            tick_interval_ms: default_tick_interval(),
            auto_execute: default_auto_execute(),
            alert_history_limit: default_alert_history(),
            event_capacity: default_event_capacity(),
            vision_timeout_ms: default_vision_timeout(),
        }
    }
}

impl PipelineConfig {
    pub fn risk_check_interval(&self) -> Duration {
        Duration::milliseconds(self.risk_check_interval_ms as i64)
    }

    pub fn metrics_interval(&self) -> Duration {
        Duration::milliseconds(self.metrics_interval_ms as i64)
    }

    pub fn item_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.item_delay_ms)
    }

    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.tick_interval_ms)
    }

    pub fn vision_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.vision_timeout_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if self.feed.symbols.is_empty() {
            return invalid("feed.symbols must not be empty");
        }
        if self.feed.poll_interval_ms == 0 {
            return invalid("feed.poll_interval_ms must be positive");
        }
        if self.risk_check_interval_ms == 0 || self.metrics_interval_ms == 0 {
            return invalid("monitoring intervals must be positive");
        }
        if self.tick_interval_ms == 0 {
            return invalid("tick_interval_ms must be positive");
        }
        if self.event_capacity == 0 {
            return invalid("event_capacity must be positive");
        }
        if self.ledger.initial_cash <= rust_decimal::Decimal::ZERO {
            return invalid("ledger.initial_cash must be positive");
        }
        if self.ledger.fee_rate < rust_decimal::Decimal::ZERO {
            return invalid("ledger.fee_rate must be non-negative");
        }
        self.signals
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.risk
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(())
    }
}

fn default_risk_interval() -> u64 {
    30_000
}

fn default_metrics_interval() -> u64 {
    60_000
}

fn default_tick_interval() -> u64 {
    250
}

fn default_auto_execute() -> bool {
    true
}

fn default_alert_history() -> usize {
    500
}

fn default_event_capacity() -> usize {
    1024
}

fn default_vision_timeout() -> u64 {
    30_000
}
