use async_trait::async_trait;
use meridian_core::{Price, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::PortResult;

/// Raw ticker reading returned by a market data source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerQuote {
    pub price: Price,
    /// 24h change in percent
    pub change_24h_pct: Decimal,
    /// 24h traded volume (base units)
    pub volume_24h: Decimal,
    pub last_updated: Timestamp,
}

/// Port for pulling the latest ticker of a symbol
///
/// Implementations must be cancel-safe: the feed wraps each call in a timeout
/// and drops the future when it expires.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Fetch the latest ticker for `symbol`
    async fn fetch_ticker(&self, symbol: &str) -> PortResult<TickerQuote>;

    /// Source identifier, stamped on every snapshot built from this source
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PortError;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    struct FixedSource;

    #[async_trait]
    impl MarketDataSource for FixedSource {
        async fn fetch_ticker(&self, symbol: &str) -> PortResult<TickerQuote> {
            if symbol != "BTC" {
                return Err(PortError::UnknownSymbol(symbol.to_string()));
            }
            Ok(TickerQuote {
                price: dec!(45000),
                change_24h_pct: dec!(1.5),
                volume_24h: dec!(1200),
                last_updated: Utc::now(),
            })
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    #[tokio::test]
    async fn test_source_as_trait_object() {
        let source: Box<dyn MarketDataSource> = Box::new(FixedSource);
        let quote = source.fetch_ticker("BTC").await.unwrap();
        assert_eq!(quote.price, dec!(45000));

        let err = source.fetch_ticker("DOGE").await.unwrap_err();
        assert_eq!(err, PortError::UnknownSymbol("DOGE".into()));
    }
}
