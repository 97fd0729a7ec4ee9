//! Direction score, levels and signal scores

use meridian_core::{Direction, MarketSnapshot, Price};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::conditions::ConditionReport;
use crate::config::SignalConfig;

/// Net score at or beyond which a direction is taken
const DIRECTION_THRESHOLD: i32 = 2;
/// Largest attainable |score|
const MAX_SCORE: i32 = 7;

/// One contribution to the direction score
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Factor {
    pub points: i32,
    pub label: String,
}

/// Direction score with the factors that produced it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectionScore {
    pub score: i32,
    pub factors: Vec<Factor>,
}

impl DirectionScore {
    fn add(&mut self, points: i32, label: impl Into<String>) {
        self.score += points;
        self.factors.push(Factor {
            points,
            label: label.into(),
        });
    }

    pub fn direction(&self) -> Direction {
        if self.score >= DIRECTION_THRESHOLD {
            Direction::Buy
        } else if self.score <= -DIRECTION_THRESHOLD {
            Direction::Sell
        } else {
            Direction::Hold
        }
    }

    /// `|score| / 7`
    pub fn strength(&self) -> Decimal {
        (Decimal::from(self.score.abs()) / Decimal::from(MAX_SCORE)).min(Decimal::ONE)
    }

    pub fn describe(&self) -> String {
        self.factors
            .iter()
            .map(|f| format!("{} ({:+})", f.label, f.points))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

pub fn direction_score(snapshot: &MarketSnapshot, config: &SignalConfig) -> DirectionScore {
    let mut score = DirectionScore::default();
    let ind = &snapshot.indicators;
    let rsi = ind.rsi.round_dp(1);

    if ind.rsi < config.rsi_oversold {
        score.add(2, format!("RSI {} oversold", rsi));
    } else if ind.rsi < dec!(40) {
        score.add(1, format!("RSI {} weak", rsi));
    } else if ind.rsi > config.rsi_overbought {
        score.add(-2, format!("RSI {} overbought", rsi));
    } else if ind.rsi > dec!(60) {
        score.add(-1, format!("RSI {} strong", rsi));
    }

    if ind.macd.macd > ind.macd.signal {
        score.add(1, "MACD above signal");
    } else if ind.macd.macd < ind.macd.signal {
        score.add(-1, "MACD below signal");
    }

    if ind.ema.ema12 > ind.ema.ema26 {
        score.add(1, "EMA12 above EMA26");
    } else if ind.ema.ema12 < ind.ema.ema26 {
        score.add(-1, "EMA12 below EMA26");
    }

    let sentiment = &snapshot.sentiment;
    let weight = if sentiment.confidence > dec!(0.7) { 2 } else { 1 };
    if sentiment.score > config.sentiment_score_threshold {
        score.add(weight, "bullish sentiment");
    } else if sentiment.score < -config.sentiment_score_threshold {
        score.add(-weight, "bearish sentiment");
    }

    if snapshot.change_24h > dec!(2) {
        score.add(1, format!("24h {:+}%", snapshot.change_24h.round_dp(2)));
    } else if snapshot.change_24h < dec!(-2) {
        score.add(-1, format!("24h {}%", snapshot.change_24h.round_dp(2)));
    }

    score
}

/// Stop-loss and take-profit around the snapshot price
pub fn levels(direction: Direction, snapshot: &MarketSnapshot) -> (Price, Price) {
    let price = snapshot.price;
    let bands = &snapshot.indicators.bollinger;
    match direction {
        Direction::Buy => (
            bands.lower.min(price * dec!(0.98)),
            bands.upper.max(price * dec!(1.04)),
        ),
        Direction::Sell => (
            bands.upper.max(price * dec!(1.02)),
            bands.lower.min(price * dec!(0.96)),
        ),
        Direction::Hold => (price * dec!(0.98), price * dec!(1.02)),
    }
}

/// 0.5 + 0.1 per market condition + 0.1 for a strong score + 0.1 x sentiment confidence
pub fn confidence(report: &ConditionReport, score: &DirectionScore, sentiment_confidence: Decimal) -> Decimal {
    let mut confidence = dec!(0.5) + dec!(0.1) * Decimal::from(report.market_met());
    if score.score.abs() >= 4 {
        confidence += dec!(0.1);
    }
    confidence += dec!(0.1) * sentiment_confidence;
    confidence.clamp(dec!(0.1), dec!(0.95))
}

/// Signal-local risk in [0, 1]
pub fn risk_score(snapshot: &MarketSnapshot) -> Decimal {
    let risk = dec!(0.2)
        + snapshot.change_24h.abs() / dec!(20)
        + snapshot.spread_fraction() * dec!(10)
        + dec!(0.2) * (Decimal::ONE - snapshot.sentiment.confidence);
    risk.clamp(Decimal::ZERO, Decimal::ONE)
}
