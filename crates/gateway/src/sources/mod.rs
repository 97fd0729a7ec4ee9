//! `MarketDataSource` implementations

mod http;
mod simulated;

pub use http::{HttpSourceConfig, HttpTickerSource, parse_simple_price};
pub use simulated::{SimulatedSource, SimulatedSourceConfig};
