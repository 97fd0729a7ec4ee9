//! Meridian Runner - Signal and Execution Pipeline
//!
//! Wires every component into one `TradingPipeline`:
//!
//! - **Config**: one JSON document for feed, signals, risk, ledger and monitoring
//! - **Pipeline**: scheduler-driven polling, per-symbol sequential processing,
//!   risk-gated execution, portfolio and performance monitoring
//! - **Events**: broadcast stream for dashboards
//!
//! ## Architecture
//!
//! ```text
//!                 ┌─────────────────────────────┐
//!                 │   MarketDataSource / venues  │
//!                 └──────────────┬──────────────┘
//!                                │ snapshots
//!                                ▼
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        TradingPipeline                            │
//! │                                                                  │
//! │  SymbolQueue ──► SignalGenerator ──► RiskGate ──► PortfolioLedger │
//! │                                                        │         │
//! │  PortfolioRiskMonitor ◄────────── Portfolio ◄──────────┘         │
//! │  MetricsAggregator / PerformanceMonitor                          │
//! │              │                                                   │
//! │              ▼                                                   │
//! │          AlertBus                                                │
//! └──────────────────────────────┬───────────────────────────────────┘
//!                                │ PipelineEvent
//!                                ▼
//!                           dashboards
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod pipeline;

// Re-export main types
pub use config::{
    ConfigError, PipelineConfig, SourceConfig, load_config, load_config_from_str,
    load_default_config,
};
pub use error::{PipelineError, Result};
pub use events::{PipelineEvent, PipelineEventKind};
pub use pipeline::{TradingPipeline, VenueStatus};
