//! Meridian Ports
//!
//! Port definitions (traits) for the Meridian pipeline.
//! These define the boundaries between the pipeline and its external collaborators:
//!
//! ```text
//!   Clock ─────────────┐
//!   MarketDataSource ──┼──► TradingPipeline
//!   ChartCapture ──────┤
//!   ChartVisionAnalyzer┘
//! ```
//!
//! Chart capture and vision analysis are advisory: the pipeline runs without them.

mod clock;
mod error;
mod market_data;
mod vision;

pub use clock::Clock;
pub use error::{PortError, PortResult};
pub use market_data::{MarketDataSource, TickerQuote};
pub use vision::{CapturedChart, ChartCapture, ChartVisionAnalyzer, VisionAnalysis};
