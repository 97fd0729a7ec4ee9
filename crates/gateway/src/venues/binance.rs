use std::time::Duration;

use chrono::{DateTime, Utc};
use meridian_core::Symbol;
use serde_json::{Value, json};

use super::{VenueId, VenueNormalizer, VenueTick, base_asset, decimal_field};

/// Binance `<symbol>@ticker` stream (24hrTicker events)
pub struct BinanceNormalizer;

impl BinanceNormalizer {
    fn stream_name(symbol: &str) -> String {
        format!("{}usdt@ticker", symbol.to_lowercase())
    }
}

impl VenueNormalizer for BinanceNormalizer {
    fn venue(&self) -> VenueId {
        VenueId::Binance
    }

    fn subscribe_message(&self, symbols: &[Symbol]) -> String {
        let params: Vec<String> = symbols.iter().map(|s| Self::stream_name(s)).collect();
        json!({
            "method": "SUBSCRIBE",
            "params": params,
            "id": 1
        })
        .to_string()
    }

    fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(180)
    }

    fn normalize(&self, frame: &Value) -> Option<VenueTick> {
        // Combined streams wrap the payload in {"stream": ..., "data": ...}
        let data = frame.get("data").unwrap_or(frame);
        if data.get("e")?.as_str()? != "24hrTicker" {
            return None;
        }

        let timestamp = data
            .get("E")
            .and_then(Value::as_i64)
            .and_then(DateTime::<Utc>::from_timestamp_millis);

        Some(VenueTick {
            venue: VenueId::Binance,
            symbol: base_asset(data.get("s")?.as_str()?, &["USDT", "USDC", "USD"]),
            price: decimal_field(data.get("c")?)?,
            bid: data.get("b").and_then(decimal_field),
            ask: data.get("a").and_then(decimal_field),
            volume_24h: decimal_field(data.get("v")?)?,
            change_24h_pct: decimal_field(data.get("P")?)?,
            timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_subscribe_message() {
        let msg = BinanceNormalizer.subscribe_message(&["BTC".into(), "ETH".into()]);
        let value: Value = serde_json::from_str(&msg).unwrap();
        assert_eq!(value["method"], "SUBSCRIBE");
        assert_eq!(value["params"][0], "btcusdt@ticker");
        assert_eq!(value["params"][1], "ethusdt@ticker");
    }

    #[test]
    fn test_normalize_ticker() {
        let frame = json!({
            "e": "24hrTicker",
            "E": 1_700_000_000_000i64,
            "s": "BTCUSDT",
            "P": "-1.250",
            "c": "45000.10",
            "b": "45000.00",
            "a": "45000.20",
            "v": "1523.5"
        });

        let tick = BinanceNormalizer.normalize(&frame).unwrap();
        assert_eq!(tick.symbol, "BTC");
        assert_eq!(tick.price, dec!(45000.10));
        assert_eq!(tick.bid, Some(dec!(45000.00)));
        assert_eq!(tick.change_24h_pct, dec!(-1.250));
        assert!(tick.timestamp.is_some());
    }

    #[test]
    fn test_combined_stream_and_acks() {
        let wrapped = json!({
            "stream": "ethusdt@ticker",
            "data": {"e": "24hrTicker", "s": "ETHUSDT", "P": "2.0", "c": "3000", "v": "10"}
        });
        assert_eq!(BinanceNormalizer.normalize(&wrapped).unwrap().symbol, "ETH");

        let ack = json!({"result": null, "id": 1});
        assert!(BinanceNormalizer.normalize(&ack).is_none());
    }
}
