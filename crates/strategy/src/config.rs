//! Signal generator configuration

use chrono::Duration;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SignalError};

/// When to generate a signal even though too few conditions are met
///
/// The cooldown is a hard gate and also counts as a met condition, so any
/// evaluation that gets past the gate already meets one condition. With
/// `min_conditions` of 1 forcing therefore never fires; it only matters when
/// two or more conditions are required.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForcePolicy {
    Disabled,
    /// Force once this long has passed since the symbol's last signal
    After(Duration),
}

impl ForcePolicy {
    /// Whether the force threshold has elapsed (always true without history)
    pub fn elapsed(&self, since_last: Option<Duration>) -> bool {
        match (self, since_last) {
            (ForcePolicy::Disabled, _) => false,
            (ForcePolicy::After(_), None) => true,
            (ForcePolicy::After(threshold), Some(since)) => since >= *threshold,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalConfig {
    /// |24h change| (percent) above which the volatility condition holds
    #[serde(default = "default_volatility_threshold")]
    pub volatility_threshold_pct: Decimal,
    #[serde(default = "default_rsi_oversold")]
    pub rsi_oversold: Decimal,
    #[serde(default = "default_rsi_overbought")]
    pub rsi_overbought: Decimal,
    #[serde(default = "default_sentiment_score")]
    pub sentiment_score_threshold: Decimal,
    #[serde(default = "default_sentiment_confidence")]
    pub sentiment_confidence_threshold: Decimal,
    /// Minimum time between two signals for the same symbol
    #[serde(default = "default_cooldown")]
    pub cooldown_secs: u64,
    /// Force generation after this long without a signal; `null` disables forcing
    #[serde(default = "default_force_after")]
    pub force_after_secs: Option<u64>,
    /// Conditions (of four) that must hold to generate
    #[serde(default = "default_min_conditions")]
    pub min_conditions: usize,
    /// Signals retained per symbol
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            volatility_threshold_pct: default_volatility_threshold(),
            rsi_oversold: default_rsi_oversold(),
            rsi_overbought: default_rsi_overbought(),
            sentiment_score_threshold: default_sentiment_score(),
            sentiment_confidence_threshold: default_sentiment_confidence(),
            cooldown_secs: default_cooldown(),
            force_after_secs: default_force_after(),
            min_conditions: default_min_conditions(),
            history_limit: default_history_limit(),
        }
    }
}

impl SignalConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::seconds(self.cooldown_secs as i64)
    }

    pub fn force_policy(&self) -> ForcePolicy {
        match self.force_after_secs {
            Some(secs) => ForcePolicy::After(Duration::seconds(secs as i64)),
            None => ForcePolicy::Disabled,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(SignalError::InvalidConfig(msg));

        if self.rsi_oversold < Decimal::ZERO
            || self.rsi_overbought > Decimal::ONE_HUNDRED
            || self.rsi_oversold >= self.rsi_overbought
        {
            return invalid(format!(
                "RSI band [{}, {}] must be ordered within 0-100",
                self.rsi_oversold, self.rsi_overbought
            ));
        }
        if self.volatility_threshold_pct < Decimal::ZERO {
            return invalid("volatility threshold must be non-negative".to_string());
        }
        if !(Decimal::ZERO..=Decimal::ONE).contains(&self.sentiment_score_threshold)
            || !(Decimal::ZERO..=Decimal::ONE).contains(&self.sentiment_confidence_threshold)
        {
            return invalid("sentiment thresholds must be within 0-1".to_string());
        }
        if !(1..=4).contains(&self.min_conditions) {
            return invalid(format!(
                "min_conditions must be 1-4, got {}",
                self.min_conditions
            ));
        }
        if let Some(force) = self.force_after_secs {
            if force <= self.cooldown_secs {
                return invalid(format!(
                    "force threshold {}s must exceed cooldown {}s",
                    force, self.cooldown_secs
                ));
            }
        }
        if self.history_limit == 0 {
            return invalid("history_limit must be positive".to_string());
        }
        Ok(())
    }
}

fn default_volatility_threshold() -> Decimal {
    dec!(5)
}

fn default_rsi_oversold() -> Decimal {
    dec!(30)
}

fn default_rsi_overbought() -> Decimal {
    dec!(70)
}

fn default_sentiment_score() -> Decimal {
    dec!(0.3)
}

fn default_sentiment_confidence() -> Decimal {
    dec!(0.6)
}

fn default_cooldown() -> u64 {
    300
}

fn default_force_after() -> Option<u64> {
    Some(900)
}

fn default_min_conditions() -> usize {
    1
}

fn default_history_limit() -> usize {
    100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SignalConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.cooldown(), Duration::minutes(5));
        assert_eq!(config.force_policy(), ForcePolicy::After(Duration::minutes(15)));
    }

    #[test]
    fn test_force_must_exceed_cooldown() {
        let config = SignalConfig {
            cooldown_secs: 600,
            force_after_secs: Some(600),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(SignalError::InvalidConfig(_))));

        let disabled = SignalConfig {
            force_after_secs: None,
            ..config
        };
        assert!(disabled.validate().is_ok());
        assert_eq!(disabled.force_policy(), ForcePolicy::Disabled);
    }

    #[test]
    fn test_rejects_inverted_rsi_band() {
        let config = SignalConfig {
            rsi_oversold: dec!(70),
            rsi_overbought: dec!(30),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_force_elapsed() {
        let policy = ForcePolicy::After(Duration::minutes(15));
        assert!(policy.elapsed(None));
        assert!(!policy.elapsed(Some(Duration::minutes(14))));
        assert!(policy.elapsed(Some(Duration::minutes(15))));
        assert!(!ForcePolicy::Disabled.elapsed(None));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: SignalConfig = serde_json::from_str(r#"{"cooldown_secs": 60}"#).unwrap();
        assert_eq!(config.cooldown_secs, 60);
        assert_eq!(config.min_conditions, 1);
        assert_eq!(config.force_after_secs, Some(900));
    }
}
