//! CoinGecko-style `simple/price` polling source

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use meridian_ports::{MarketDataSource, PortError, PortResult, TickerQuote};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::venues::decimal_field;

/// Configuration for the HTTP ticker source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpSourceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Quote currency (`vs_currencies`)
    #[serde(default = "default_quote")]
    pub quote: String,
    /// Symbol -> provider coin id
    #[serde(default = "default_coin_ids")]
    pub coin_ids: HashMap<String, String>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

impl Default for HttpSourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            quote: default_quote(),
            coin_ids: default_coin_ids(),
            request_timeout_ms: default_request_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.coingecko.com/api/v3".to_string()
}

fn default_quote() -> String {
    "usd".to_string()
}

fn default_coin_ids() -> HashMap<String, String> {
    [
        ("BTC", "bitcoin"),
        ("ETH", "ethereum"),
        ("SOL", "solana"),
        ("ADA", "cardano"),
        ("XRP", "ripple"),
        ("DOGE", "dogecoin"),
    ]
    .into_iter()
    .map(|(s, id)| (s.to_string(), id.to_string()))
    .collect()
}

fn default_request_timeout() -> u64 {
    5000
}

/// Polls a `simple/price` endpoint over HTTPS
pub struct HttpTickerSource {
    client: reqwest::Client,
    config: HttpSourceConfig,
}

impl HttpTickerSource {
    pub fn new(config: HttpSourceConfig) -> PortResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| PortError::Transport(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn coin_id(&self, symbol: &str) -> PortResult<&str> {
        self.config
            .coin_ids
            .get(&symbol.to_uppercase())
            .map(String::as_str)
            .ok_or_else(|| PortError::UnknownSymbol(symbol.to_string()))
    }
}

#[async_trait]
impl MarketDataSource for HttpTickerSource {
    async fn fetch_ticker(&self, symbol: &str) -> PortResult<TickerQuote> {
        let coin_id = self.coin_id(symbol)?;
        let url = format!("{}/simple/price", self.config.base_url);
        debug!("[FEED] GET {} ids={}", url, coin_id);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("ids", coin_id),
                ("vs_currencies", self.config.quote.as_str()),
                ("include_24hr_change", "true"),
                ("include_24hr_vol", "true"),
                ("include_last_updated_at", "true"),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PortError::Timeout(Duration::from_millis(self.config.request_timeout_ms))
                } else {
                    PortError::Transport(e.to_string())
                }
            })?
            .error_for_status()
            .map_err(|e| PortError::Transport(e.to_string()))?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| PortError::Parse(e.to_string()))?;

        parse_simple_price(&body, coin_id, &self.config.quote)
    }

    fn name(&self) -> &str {
        "coingecko"
    }
}

/// Parse one coin out of a `simple/price` response body
///
/// `{"bitcoin": {"usd": 45000, "usd_24h_change": 1.2, "usd_24h_vol": 9.1e9, "last_updated_at": 1700000000}}`
///
/// The provider reports volume in the quote currency; it is converted to base units.
pub fn parse_simple_price(body: &Value, coin_id: &str, quote: &str) -> PortResult<TickerQuote> {
    let entry = body
        .get(coin_id)
        .ok_or_else(|| PortError::UnknownSymbol(coin_id.to_string()))?;

    let price = entry
        .get(quote)
        .and_then(decimal_field)
        .ok_or_else(|| PortError::Parse(format!("missing {} price for {}", quote, coin_id)))?;

    let change_24h_pct = entry
        .get(format!("{}_24h_change", quote))
        .and_then(decimal_field)
        .unwrap_or_default();

    let quote_volume = entry
        .get(format!("{}_24h_vol", quote))
        .and_then(decimal_field)
        .unwrap_or_default();
    let volume_24h = if price.is_zero() {
        Decimal::ZERO
    } else {
        quote_volume / price
    };

    let last_updated = entry
        .get("last_updated_at")
        .and_then(Value::as_i64)
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .unwrap_or_else(Utc::now);

    Ok(TickerQuote {
        price,
        change_24h_pct,
        volume_24h,
        last_updated,
    })
}
