//! Signal Generator
//!
//! Decides per snapshot whether a symbol gets a new signal:
//! - Cooldown is a hard gate: nothing is emitted inside the window
//! - Otherwise a signal is generated once `min_conditions` of the four hold
//! - The force policy fills long gaps when the market stays quiet
//!
//! Generated signals are always `Pending`; approval belongs to the risk gate.

use std::collections::HashMap;

use chrono::Duration;
use meridian_core::{MarketSnapshot, Signal, Symbol, Timestamp};

use crate::conditions::{self, ConditionReport};
use crate::config::SignalConfig;
use crate::error::Result;
use crate::scoring::{self, DirectionScore};

/// Why a snapshot produced no signal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Inside the cooldown window
    Cooldown { remaining: Duration },
    /// Too few conditions and the force threshold has not elapsed
    InsufficientConditions { met: usize, required: usize },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Cooldown { remaining } => {
                write!(f, "cooldown active ({}s remaining)", remaining.num_seconds())
            }
            SkipReason::InsufficientConditions { met, required } => {
                write!(f, "{}/{} conditions met", met, required)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub enum Decision {
    Generated { signal: Signal, forced: bool },
    Skipped { reason: SkipReason },
}

impl Decision {
    pub fn signal(&self) -> Option<&Signal> {
        match self {
            Decision::Generated { signal, .. } => Some(signal),
            Decision::Skipped { .. } => None,
        }
    }

    pub fn into_signal(self) -> Option<Signal> {
        match self {
            Decision::Generated { signal, .. } => Some(signal),
            Decision::Skipped { .. } => None,
        }
    }
}

/// What the generator remembers about one symbol
#[derive(Debug, Clone, Default)]
pub struct SymbolHistory {
    pub last_signal_at: Option<Timestamp>,
    /// Previous snapshot, for crossover detection
    pub previous: Option<MarketSnapshot>,
    pub generated: u64,
    pub forced: u64,
}

pub struct SignalGenerator {
    config: SignalConfig,
    history: HashMap<Symbol, SymbolHistory>,
}

impl SignalGenerator {
    pub fn new(config: SignalConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            history: HashMap::new(),
        })
    }

    pub fn config(&self) -> &SignalConfig {
        &self.config
    }

    /// Replace the configuration; history is kept
    pub fn set_config(&mut self, config: SignalConfig) -> Result<()> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    pub fn history(&self, symbol: &str) -> Option<&SymbolHistory> {
        self.history.get(symbol)
    }

    pub fn last_signal_at(&self, symbol: &str) -> Option<Timestamp> {
        self.history.get(symbol).and_then(|h| h.last_signal_at)
    }

    /// Evaluate one snapshot for its symbol
    pub fn evaluate(&mut self, snapshot: &MarketSnapshot, now: Timestamp) -> Decision {
        let config = &self.config;
        let history = self.history.entry(snapshot.symbol.clone()).or_default();

        let report = conditions::evaluate(
            snapshot,
            history.previous.as_ref(),
            history.last_signal_at,
            now,
            config,
        );
        history.previous = Some(snapshot.clone());

        let since_last = conditions::since_last(history.last_signal_at, now);
        if !report.cooldown {
            let remaining = since_last
                .map(|since| config.cooldown() - since)
                .unwrap_or_else(Duration::zero);
            log::debug!(
                "[SIGNAL] {} skipped: cooldown ({}s remaining)",
                snapshot.symbol,
                remaining.num_seconds()
            );
            return Decision::Skipped {
                reason: SkipReason::Cooldown { remaining },
            };
        }

        let met = report.met();
        let forced = if met >= config.min_conditions {
            false
        } else if config.force_policy().elapsed(since_last) {
            true
        } else {
            log::debug!(
                "[SIGNAL] {} skipped: {}/{} conditions",
                snapshot.symbol,
                met,
                config.min_conditions
            );
            return Decision::Skipped {
                reason: SkipReason::InsufficientConditions {
                    met,
                    required: config.min_conditions,
                },
            };
        };

        let signal = build_signal(config, snapshot, &report, forced, now);
        history.last_signal_at = Some(now);
        history.generated += 1;
        if forced {
            history.forced += 1;
        }

        log::info!(
            "[SIGNAL] {} {} @ {} (confidence {}, risk {}){}",
            signal.symbol,
            signal.direction,
            signal.entry_price,
            signal.confidence.round_dp(2),
            signal.risk_score.round_dp(2),
            if forced { " [forced]" } else { "" }
        );

        Decision::Generated { signal, forced }
    }

    /// Forget a symbol's history
    pub fn reset(&mut self, symbol: &str) {
        self.history.remove(symbol);
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }
}

fn build_signal(
    config: &SignalConfig,
    snapshot: &MarketSnapshot,
    report: &ConditionReport,
    forced: bool,
    now: Timestamp,
) -> Signal {
    let score = scoring::direction_score(snapshot, config);
    let direction = score.direction();
    let (stop_loss, take_profit) = scoring::levels(direction, snapshot);

    Signal::new(snapshot.symbol.clone(), direction, snapshot.price, now)
        .with_levels(stop_loss, take_profit)
        .with_confidence(scoring::confidence(
            report,
            &score,
            snapshot.sentiment.confidence,
        ))
        .with_risk_score(scoring::risk_score(snapshot))
        .with_strength(score.strength())
        .with_reasoning(reasoning(config, report, &score, forced))
}

fn reasoning(
    config: &SignalConfig,
    report: &ConditionReport,
    score: &DirectionScore,
    forced: bool,
) -> String {
    let mut text = format!(
        "Conditions met ({}/{}): {}. Score {:+}",
        report.met(),
        config.min_conditions,
        report.names().join(", "),
        score.score
    );
    if !score.factors.is_empty() {
        text.push_str(&format!(" from {}", score.describe()));
    }
    text.push('.');
    if forced {
        text.push_str(" Forced: no signal within the force threshold.");
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use meridian_core::{Direction, SignalStatus};
    use rust_decimal_macros::dec;

    fn quiet(now: Timestamp) -> MarketSnapshot {
        MarketSnapshot::at_price("BTC", dec!(45000), "test", now)
    }

    fn strict() -> SignalConfig {
        SignalConfig {
            min_conditions: 2,
            ..Default::default()
        }
    }

    #[test]
    fn test_first_quiet_snapshot_is_forced() {
        let now = Utc::now();
        let mut generator = SignalGenerator::new(strict()).unwrap();

        let decision = generator.evaluate(&quiet(now), now);
        let Decision::Generated { signal, forced } = decision else {
            panic!("expected a forced signal");
        };
        assert!(forced);
        assert_eq!(signal.status, SignalStatus::Pending);
        assert_eq!(signal.direction, Direction::Hold);
        assert!(signal.reasoning.contains("Forced"));
        assert_eq!(generator.history("BTC").unwrap().forced, 1);
    }

    #[test]
    fn test_quiet_market_waits_for_force_threshold() {
        let start = Utc::now();
        let mut generator = SignalGenerator::new(strict()).unwrap();
        assert!(generator.evaluate(&quiet(start), start).signal().is_some());

        // Past cooldown, short of the force threshold
        let later = start + Duration::minutes(10);
        let decision = generator.evaluate(&quiet(later), later);
        assert!(matches!(
            decision,
            Decision::Skipped {
                reason: SkipReason::InsufficientConditions { met: 1, required: 2 }
            }
        ));

        let forced_at = start + Duration::minutes(15);
        assert!(generator.evaluate(&quiet(forced_at), forced_at).signal().is_some());
    }

    #[test]
    fn test_cooldown_blocks_strong_signals() {
        let start = Utc::now();
        let mut generator = SignalGenerator::new(SignalConfig::default()).unwrap();
        let volatile = |t| quiet(t).with_change(dec!(-8));

        assert!(generator.evaluate(&volatile(start), start).signal().is_some());

        let soon = start + Duration::seconds(120);
        match generator.evaluate(&volatile(soon), soon) {
            Decision::Skipped {
                reason: SkipReason::Cooldown { remaining },
            } => assert_eq!(remaining, Duration::seconds(180)),
            other => panic!("expected cooldown skip, got {:?}", other),
        }

        let boundary = start + Duration::seconds(300);
        assert!(matches!(
            generator.evaluate(&volatile(boundary), boundary),
            Decision::Skipped {
                reason: SkipReason::Cooldown { .. }
            }
        ));

        let after = start + Duration::seconds(301);
        assert!(generator.evaluate(&volatile(after), after).signal().is_some());
        assert_eq!(generator.last_signal_at("BTC"), Some(after));
    }

    #[test]
    fn test_force_disabled_never_forces() {
        let now = Utc::now();
        let config = SignalConfig {
            force_after_secs: None,
            ..strict()
        };
        let mut generator = SignalGenerator::new(config).unwrap();
        assert!(generator.evaluate(&quiet(now), now).signal().is_none());
        assert!(generator.last_signal_at("BTC").is_none());
    }

    #[test]
    fn test_symbols_are_independent() {
        let now = Utc::now();
        let mut generator = SignalGenerator::new(SignalConfig::default()).unwrap();
        let eth = MarketSnapshot::at_price("ETH", dec!(3000), "test", now);

        assert!(generator.evaluate(&quiet(now), now).signal().is_some());
        assert!(generator.evaluate(&eth, now).signal().is_some());
        assert!(generator.evaluate(&quiet(now), now).signal().is_none());

        generator.reset("BTC");
        assert!(generator.evaluate(&quiet(now), now).signal().is_some());
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = SignalConfig {
            min_conditions: 0,
            ..Default::default()
        };
        assert!(SignalGenerator::new(config).is_err());
    }
}
