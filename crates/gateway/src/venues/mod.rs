//! Venue normalizers
//!
//! Each venue speaks its own WebSocket dialect. A `VenueNormalizer` knows how to
//! subscribe, how often to heartbeat, and how to turn one raw frame into a
//! `VenueTick`. Frames that are not tickers (acks, heartbeats, ...) yield `None`.

mod binance;
mod coinbase;
mod kraken;

use std::str::FromStr;
use std::time::Duration;

use meridian_core::{Price, Symbol, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use binance::BinanceNormalizer;
pub use coinbase::CoinbaseNormalizer;
pub use kraken::KrakenNormalizer;

/// Supported streaming venues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VenueId {
    Binance,
    Coinbase,
    Kraken,
}

impl VenueId {
    pub fn as_str(&self) -> &'static str {
        match self {
            VenueId::Binance => "binance",
            VenueId::Coinbase => "coinbase",
            VenueId::Kraken => "kraken",
        }
    }

    /// Public WebSocket endpoint
    pub fn default_ws_url(&self) -> &'static str {
        match self {
            VenueId::Binance => "wss://stream.binance.com:9443/ws",
            VenueId::Coinbase => "wss://ws-feed.exchange.coinbase.com",
            VenueId::Kraken => "wss://ws.kraken.com",
        }
    }
}

impl std::fmt::Display for VenueId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized ticker update from a venue stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueTick {
    pub venue: VenueId,
    /// Internal symbol ("BTC"), not the venue's pair name
    pub symbol: Symbol,
    pub price: Price,
    pub bid: Option<Price>,
    pub ask: Option<Price>,
    pub volume_24h: Decimal,
    pub change_24h_pct: Decimal,
    /// Venue event time, when the frame carries one
    pub timestamp: Option<Timestamp>,
}

/// Venue-specific wire dialect
pub trait VenueNormalizer: Send + Sync {
    fn venue(&self) -> VenueId;

    /// Text frame that subscribes to tickers for `symbols`
    fn subscribe_message(&self, symbols: &[Symbol]) -> String;

    /// How often the client should send a keep-alive
    fn heartbeat_interval(&self) -> Duration;

    /// Application-level keep-alive frame; `None` means a WebSocket ping
    fn ping_message(&self) -> Option<String> {
        None
    }

    /// Parse one decoded frame into a tick
    fn normalize(&self, frame: &Value) -> Option<VenueTick>;
}

/// Normalizer for a venue
pub fn normalizer_for(venue: VenueId) -> Box<dyn VenueNormalizer> {
    match venue {
        VenueId::Binance => Box::new(BinanceNormalizer),
        VenueId::Coinbase => Box::new(CoinbaseNormalizer),
        VenueId::Kraken => Box::new(KrakenNormalizer),
    }
}

/// Read a decimal from either a JSON string or a JSON number
pub(crate) fn decimal_field(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) => Decimal::from_str(s).ok(),
        Value::Number(n) => {
            let text = n.to_string();
            Decimal::from_str(&text)
                .or_else(|_| Decimal::from_scientific(&text))
                .ok()
        }
        _ => None,
    }
}

/// Strip a quote currency suffix/prefix from a venue pair ("BTCUSDT" -> "BTC")
pub(crate) fn base_asset(pair: &str, quotes: &[&str]) -> Symbol {
    let pair = pair.to_uppercase();
    let trimmed = pair.trim_matches(|c| c == '-' || c == '/');
    for quote in quotes {
        if let Some(base) = trimmed.strip_suffix(quote) {
            let base = base.trim_end_matches(['-', '/']);
            if !base.is_empty() {
                return base.to_string();
            }
        }
    }
    trimmed.to_string()
}
