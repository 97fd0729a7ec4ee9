use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::values::{Price, Symbol, Timestamp};

/// MACD line, signal line and histogram
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Macd {
    pub macd: Decimal,
    pub signal: Decimal,
    pub histogram: Decimal,
}

impl Macd {
    /// MACD line above its signal line
    pub fn is_bullish(&self) -> bool {
        self.macd > self.signal
    }
}

/// Bollinger bands around a moving middle
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bollinger {
    pub upper: Decimal,
    pub middle: Decimal,
    pub lower: Decimal,
}

/// Fast and slow exponential moving averages
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EmaPair {
    pub ema12: Decimal,
    pub ema26: Decimal,
}

/// Indicator bundle attached to every snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Indicators {
    /// Relative strength index, 0-100
    pub rsi: Decimal,
    pub macd: Macd,
    pub bollinger: Bollinger,
    pub ema: EmaPair,
    /// Current volume relative to its smoothed average
    pub volume_ratio: Decimal,
    /// Smoothed 24h change (percent)
    pub momentum: Decimal,
}

impl Indicators {
    /// Neutral indicator bundle seeded from a single price
    pub fn seeded(price: Price) -> Self {
        Self {
            rsi: dec!(50),
            macd: Macd::default(),
            bollinger: Bollinger {
                upper: price,
                middle: price,
                lower: price,
            },
            ema: EmaPair {
                ema12: price,
                ema26: price,
            },
            volume_ratio: Decimal::ONE,
            momentum: Decimal::ZERO,
        }
    }
}

/// Market sentiment reading
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Sentiment {
    /// -1.0 (bearish) to 1.0 (bullish)
    pub score: Decimal,
    /// 0.0 to 1.0
    pub confidence: Decimal,
    /// Free-form tags ("oversold", "bullish_momentum", ...)
    pub tags: Vec<String>,
}

impl Sentiment {
    pub fn new(score: Decimal, confidence: Decimal, tags: Vec<String>) -> Self {
        Self {
            score: score.clamp(Decimal::NEGATIVE_ONE, Decimal::ONE),
            confidence: confidence.clamp(Decimal::ZERO, Decimal::ONE),
            tags,
        }
    }
}

/// One immutable, timestamped reading of price, indicator and sentiment state
///
/// A snapshot is never mutated; the next tick for the same symbol supersedes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub symbol: Symbol,
    pub price: Price,
    /// 24h change in percent
    pub change_24h: Decimal,
    pub high_24h: Price,
    pub low_24h: Price,
    pub volume_24h: Decimal,
    pub bid: Price,
    pub ask: Price,
    pub spread: Decimal,
    pub indicators: Indicators,
    pub sentiment: Sentiment,
    /// Venue or source that produced the underlying quote
    pub source: String,
    pub timestamp: Timestamp,
}

impl MarketSnapshot {
    /// Neutral snapshot at a single price: zero change, seeded indicators, no sentiment
    pub fn at_price(
        symbol: impl Into<Symbol>,
        price: Price,
        source: impl Into<String>,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            change_24h: Decimal::ZERO,
            high_24h: price,
            low_24h: price,
            volume_24h: Decimal::ZERO,
            bid: price,
            ask: price,
            spread: Decimal::ZERO,
            indicators: Indicators::seeded(price),
            sentiment: Sentiment::default(),
            source: source.into(),
            timestamp,
        }
    }

    /// Builder: Set 24h change (percent)
    pub fn with_change(mut self, change_24h: Decimal) -> Self {
        self.change_24h = change_24h;
        self
    }

    /// Builder: Set 24h volume
    pub fn with_volume(mut self, volume_24h: Decimal) -> Self {
        self.volume_24h = volume_24h;
        self
    }

    /// Builder: Set bid/ask (spread follows)
    pub fn with_quote(mut self, bid: Price, ask: Price) -> Self {
        self.bid = bid;
        self.ask = ask;
        self.spread = ask - bid;
        self
    }

    /// Builder: Replace the indicator bundle
    pub fn with_indicators(mut self, indicators: Indicators) -> Self {
        self.indicators = indicators;
        self
    }

    /// Builder: Replace the sentiment reading
    pub fn with_sentiment(mut self, sentiment: Sentiment) -> Self {
        self.sentiment = sentiment;
        self
    }

    /// Spread as a fraction of price
    pub fn spread_fraction(&self) -> Decimal {
        if self.price.is_zero() {
            return Decimal::ZERO;
        }
        self.spread / self.price
    }

    /// 24h traded value in quote currency
    pub fn volume_value(&self) -> Decimal {
        self.volume_24h * self.price
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn snapshot(symbol: &str, price: Decimal) -> MarketSnapshot {
        MarketSnapshot::at_price(symbol, price, "test", Utc::now())
            .with_volume(dec!(1000))
            .with_quote(price - dec!(0.5), price + dec!(0.5))
    }

    #[test]
    fn test_spread_fraction() {
        let snap = snapshot("BTC", dec!(100));
        assert_eq!(snap.spread_fraction(), dec!(0.01));
        assert_eq!(snap.volume_value(), dec!(100000));
    }

    #[test]
    fn test_sentiment_clamped() {
        let s = Sentiment::new(dec!(1.7), dec!(-0.2), vec![]);
        assert_eq!(s.score, Decimal::ONE);
        assert_eq!(s.confidence, Decimal::ZERO);
    }

    #[test]
    fn test_seeded_indicators() {
        let ind = Indicators::seeded(dec!(250));
        assert_eq!(ind.rsi, dec!(50));
        assert_eq!(ind.bollinger.middle, dec!(250));
        assert!(!ind.macd.is_bullish());
    }
}
