use std::time::Duration;

use meridian_core::{Symbol, values::pct_change};
use serde_json::{Value, json};

use super::{VenueId, VenueNormalizer, VenueTick, decimal_field};

/// Kraken v1 public `ticker` subscription
///
/// Ticker frames are arrays: `[channel_id, {payload}, "ticker", "XBT/USD"]`.
pub struct KrakenNormalizer;

impl KrakenNormalizer {
    fn pair(symbol: &str) -> String {
        match symbol.to_uppercase().as_str() {
            "BTC" => "XBT/USD".to_string(),
            other => format!("{}/USD", other),
        }
    }

    fn symbol(pair: &str) -> Symbol {
        let base = pair.split('/').next().unwrap_or(pair).to_uppercase();
        match base.as_str() {
            "XBT" => "BTC".to_string(),
            _ => base,
        }
    }
}

/// First element of a Kraken `[value, ...]` field
fn first(payload: &Value, key: &str, index: usize) -> Option<rust_decimal::Decimal> {
    decimal_field(payload.get(key)?.get(index)?)
}

impl VenueNormalizer for KrakenNormalizer {
    fn venue(&self) -> VenueId {
        VenueId::Kraken
    }

    fn subscribe_message(&self, symbols: &[Symbol]) -> String {
        let pairs: Vec<String> = symbols.iter().map(|s| Self::pair(s)).collect();
        json!({
            "event": "subscribe",
            "pair": pairs,
            "subscription": {"name": "ticker"}
        })
        .to_string()
    }

    fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(30)
    }

    fn ping_message(&self) -> Option<String> {
        Some(json!({"event": "ping"}).to_string())
    }

    fn normalize(&self, frame: &Value) -> Option<VenueTick> {
        let parts = frame.as_array()?;
        if parts.len() < 4 || parts[2].as_str()? != "ticker" {
            return None;
        }
        let payload = &parts[1];
        let price = first(payload, "c", 0)?;
        let change_24h_pct = first(payload, "o", 1)
            .map(|open| pct_change(open, price))
            .unwrap_or_default();

        Some(VenueTick {
            venue: VenueId::Kraken,
            symbol: Self::symbol(parts[3].as_str()?),
            price,
            bid: first(payload, "b", 0),
            ask: first(payload, "a", 0),
            volume_24h: first(payload, "v", 1).unwrap_or_default(),
            change_24h_pct,
            timestamp: None,
        })
    }
}
