//! Meridian Gateway
//!
//! Market data ingestion for the Meridian pipeline. Provides:
//! - `MarketDataSource` implementations (HTTP polling, seeded simulation)
//! - Venue normalizers and a reconnecting WebSocket stream per venue
//! - Incremental indicator and sentiment synthesis
//! - A failure-isolated topic bus for snapshot fan-out
//!
//! ## Architecture
//!
//! ```text
//!  HttpTickerSource / SimulatedSource        WsVenueStream (binance, coinbase, kraken)
//!              │ fetch_ticker                       │ StreamEvent::Tick
//!         ┌────▼─────────────────────────────────────▼────┐
//!         │               MarketDataFeed                  │
//!         │  IndicatorSynthesizer ─► sentiment::synthesize│
//!         └────────────────────┬──────────────────────────┘
//!                              │ MarketSnapshot
//!                         TopicBus (md.{SYMBOL})
//!                              │
//!                          consumers
//! ```

pub mod connection;
pub mod error;
pub mod feed;
pub mod indicators;
pub mod sentiment;
pub mod sources;
pub mod stream;
pub mod transport;
pub mod venues;

// Re-export commonly used types
pub use connection::{ConnectionState, ConnectionTracker, ReconnectDecision, ReconnectPolicy};
pub use error::{FeedError, Result};
pub use feed::{FeedConfig, FeedStopHandle, MarketDataFeed, poll_task_name, poll_task_symbol};
pub use indicators::{IndicatorConfig, IndicatorSynthesizer, Observation};
pub use sources::{HttpSourceConfig, HttpTickerSource, SimulatedSource, SimulatedSourceConfig};
pub use stream::{StreamEvent, StreamSettings, WsVenueStream};
pub use transport::{Callback, Subjects, Subscription, TopicBus};
pub use venues::{VenueId, VenueNormalizer, VenueTick, normalizer_for};
