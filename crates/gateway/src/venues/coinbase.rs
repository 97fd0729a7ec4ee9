use std::time::Duration;

use chrono::{DateTime, Utc};
use meridian_core::{Symbol, values::pct_change};
use serde_json::{Value, json};

use super::{VenueId, VenueNormalizer, VenueTick, base_asset, decimal_field};

/// Coinbase Exchange `ticker` channel
pub struct CoinbaseNormalizer;

impl VenueNormalizer for CoinbaseNormalizer {
    fn venue(&self) -> VenueId {
        VenueId::Coinbase
    }

    fn subscribe_message(&self, symbols: &[Symbol]) -> String {
        let products: Vec<String> = symbols
            .iter()
            .map(|s| format!("{}-USD", s.to_uppercase()))
            .collect();
        json!({
            "type": "subscribe",
            "product_ids": products,
            "channels": ["ticker", "heartbeat"]
        })
        .to_string()
    }

    fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(30)
    }

    fn normalize(&self, frame: &Value) -> Option<VenueTick> {
        if frame.get("type")?.as_str()? != "ticker" {
            return None;
        }

        let price = decimal_field(frame.get("price")?)?;
        // The ticker carries the 24h open, not the change
        let change_24h_pct = frame
            .get("open_24h")
            .and_then(decimal_field)
            .map(|open| pct_change(open, price))
            .unwrap_or_default();

        let timestamp = frame
            .get("time")
            .and_then(Value::as_str)
            .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
            .map(|t| t.with_timezone(&Utc));

        Some(VenueTick {
            venue: VenueId::Coinbase,
            symbol: base_asset(frame.get("product_id")?.as_str()?, &["USD", "USDC"]),
            price,
            bid: frame.get("best_bid").and_then(decimal_field),
            ask: frame.get("best_ask").and_then(decimal_field),
            volume_24h: frame
                .get("volume_24h")
                .and_then(decimal_field)
                .unwrap_or_default(),
            change_24h_pct,
            timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_normalize_ticker() {
        let frame = json!({
            "type": "ticker",
            "product_id": "ETH-USD",
            "price": "3090",
            "open_24h": "3000",
            "volume_24h": "8200.5",
            "best_bid": "3089.9",
            "best_ask": "3090.1",
            "time": "2024-03-01T12:00:00.000000Z"
        });

        let tick = CoinbaseNormalizer.normalize(&frame).unwrap();
        assert_eq!(tick.symbol, "ETH");
        assert_eq!(tick.change_24h_pct, dec!(3));
        assert_eq!(tick.ask, Some(dec!(3090.1)));
        assert!(tick.timestamp.is_some());
    }

    #[test]
    fn test_heartbeat_frames_ignored() {
        let frame = json!({"type": "heartbeat", "product_id": "BTC-USD", "sequence": 1});
        assert!(CoinbaseNormalizer.normalize(&frame).is_none());
    }
}
