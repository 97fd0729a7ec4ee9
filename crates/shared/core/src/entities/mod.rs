mod alert;
mod metrics;
mod portfolio;
mod position;
mod side;
mod signal;
mod snapshot;
mod trade;

pub use alert::{Alert, AlertCategory, AlertId, AlertKey, AlertSeverity};
pub use metrics::PipelineMetrics;
pub use portfolio::{PerformanceMetrics, Portfolio, PortfolioRisk};
pub use position::{CloseReason, Position, PositionId, PositionSide, PositionStatus};
pub use side::Direction;
pub use signal::{InvalidTransition, Signal, SignalId, SignalStatus};
pub use snapshot::{Bollinger, EmaPair, Indicators, Macd, MarketSnapshot, Sentiment};
pub use trade::{Trade, TradeId, TradeLeg};
