//! The four independent generation conditions

use chrono::Duration;
use meridian_core::{MarketSnapshot, Timestamp};
use rust_decimal::Decimal;

use crate::config::SignalConfig;

/// Which conditions hold for one snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConditionReport {
    /// |24h change| above the volatility threshold
    pub volatility: bool,
    /// RSI outside its band, or a MACD/signal-line crossover
    pub technical: bool,
    /// Strong and confident sentiment
    pub sentiment: bool,
    /// Enough time has passed since the symbol's last signal
    pub cooldown: bool,
}

impl ConditionReport {
    /// Market conditions met (volatility, technical, sentiment)
    pub fn market_met(&self) -> usize {
        [self.volatility, self.technical, self.sentiment]
            .iter()
            .filter(|c| **c)
            .count()
    }

    /// All conditions met, cooldown included
    pub fn met(&self) -> usize {
        self.market_met() + usize::from(self.cooldown)
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.volatility {
            names.push("volatility");
        }
        if self.technical {
            names.push("technical");
        }
        if self.sentiment {
            names.push("sentiment");
        }
        if self.cooldown {
            names.push("cooldown");
        }
        names
    }
}

/// MACD histogram changed sign between two snapshots
pub fn macd_crossover(previous: Option<&MarketSnapshot>, current: &MarketSnapshot) -> bool {
    let Some(previous) = previous else {
        return false;
    };
    let before = previous.indicators.macd.histogram;
    let now = current.indicators.macd.histogram;
    (before <= Decimal::ZERO && now > Decimal::ZERO) || (before >= Decimal::ZERO && now < Decimal::ZERO)
}

/// Time since the last signal, if there was one
pub fn since_last(last_signal_at: Option<Timestamp>, now: Timestamp) -> Option<Duration> {
    last_signal_at.map(|at| now - at)
}

pub fn evaluate(
    snapshot: &MarketSnapshot,
    previous: Option<&MarketSnapshot>,
    last_signal_at: Option<Timestamp>,
    now: Timestamp,
    config: &SignalConfig,
) -> ConditionReport {
    let rsi = snapshot.indicators.rsi;
    let sentiment = &snapshot.sentiment;

    ConditionReport {
        volatility: snapshot.change_24h.abs() > config.volatility_threshold_pct,
        technical: rsi < config.rsi_oversold
            || rsi > config.rsi_overbought
            || macd_crossover(previous, snapshot),
        sentiment: sentiment.score.abs() > config.sentiment_score_threshold
            && sentiment.confidence > config.sentiment_confidence_threshold,
        cooldown: since_last(last_signal_at, now).is_none_or(|since| since > config.cooldown()),
    }
}
