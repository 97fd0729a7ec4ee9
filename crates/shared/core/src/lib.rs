//! Meridian Core Domain
//!
//! Pure domain types for the Meridian signal and execution pipeline.
//! This crate contains no async, no I/O, and is 100% unit testable.

pub mod entities;
pub mod values;

// Re-export commonly used types at crate root
pub use entities::{
    // Alerting
    Alert,
    AlertCategory,
    AlertId,
    AlertKey,
    AlertSeverity,
    // Market data
    Bollinger,
    // Position lifecycle
    CloseReason,
    // Signals
    Direction,
    EmaPair,
    Indicators,
    InvalidTransition,
    Macd,
    MarketSnapshot,
    // Portfolio
    PerformanceMetrics,
    PipelineMetrics,
    Portfolio,
    PortfolioRisk,
    Position,
    PositionId,
    PositionSide,
    PositionStatus,
    Sentiment,
    Signal,
    SignalId,
    SignalStatus,
    Trade,
    TradeId,
    TradeLeg,
};
pub use values::{Price, Quantity, Symbol, Timestamp};
