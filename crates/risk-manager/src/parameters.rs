//! Risk Parameters
//!
//! Limits used by the pre-trade gate and the portfolio monitor. Percent
//! fields (`*_pct`) are in percent (5 = 5%); ratio fields are fractions.
//! Parameters can be replaced at runtime, always through [`RiskParameters::validate`].

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RiskError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskParameters {
    // Pre-trade limits
    /// Largest single position, percent of total value
    #[serde(default = "default_max_position_size_pct")]
    pub max_position_size_pct: Decimal,
    /// Absolute daily loss (quote currency) that blocks new trades
    #[serde(default = "default_max_daily_loss")]
    pub max_daily_loss: Decimal,
    #[serde(default = "default_max_open_positions")]
    pub max_open_positions: usize,
    /// |24h change| (percent) considered high volatility
    #[serde(default = "default_volatility_threshold_pct")]
    pub volatility_threshold_pct: Decimal,
    /// Largest same-asset-class share of open notional
    #[serde(default = "default_max_correlation")]
    pub max_correlation: Decimal,
    /// Widest acceptable spread, percent of price
    #[serde(default = "default_max_spread_pct")]
    pub max_spread_pct: Decimal,
    /// Largest notional as a fraction of 24h traded value
    #[serde(default = "default_max_volume_participation")]
    pub max_volume_participation: Decimal,
    /// Approve only below this composite score (0-100)
    #[serde(default = "default_approval_threshold")]
    pub approval_threshold: Decimal,

    // Sizing and levels
    /// Capital risked per trade, percent of total value
    #[serde(default = "default_risk_per_trade_pct")]
    pub risk_per_trade_pct: Decimal,
    #[serde(default = "default_stop_loss_pct")]
    pub stop_loss_pct: Decimal,
    #[serde(default = "default_take_profit_pct")]
    pub take_profit_pct: Decimal,

    // Portfolio monitoring
    /// Open notional / total value
    #[serde(default = "default_max_exposure")]
    pub max_exposure: Decimal,
    /// Largest position / total value
    #[serde(default = "default_max_concentration")]
    pub max_concentration: Decimal,
    /// Peak-to-current decline of total value
    #[serde(default = "default_max_drawdown")]
    pub max_drawdown: Decimal,
    #[serde(default = "default_critical_risk_score")]
    pub critical_risk_score: Decimal,
    #[serde(default)]
    pub auto_close_enabled: bool,

    /// Symbol -> asset class; unlisted symbols form their own class
    #[serde(default = "default_asset_classes")]
    pub asset_classes: BTreeMap<String, String>,
}

impl Default for RiskParameters {
    fn default() -> Self {
        Self {
            max_position_size_pct: default_max_position_size_pct(),
            max_daily_loss: default_max_daily_loss(),
            max_open_positions: default_max_open_positions(),
            volatility_threshold_pct: default_volatility_threshold_pct(),
            max_correlation: default_max_correlation(),
            max_spread_pct: default_max_spread_pct(),
            max_volume_participation: default_max_volume_participation(),
            approval_threshold: default_approval_threshold(),
            risk_per_trade_pct: default_risk_per_trade_pct(),
            stop_loss_pct: default_stop_loss_pct(),
            take_profit_pct: default_take_profit_pct(),
            max_exposure: default_max_exposure(),
            max_concentration: default_max_concentration(),
            max_drawdown: default_max_drawdown(),
            critical_risk_score: default_critical_risk_score(),
            auto_close_enabled: false,
            asset_classes: default_asset_classes(),
        }
    }
}

impl RiskParameters {
    pub fn asset_class<'a>(&'a self, symbol: &'a str) -> &'a str {
        self.asset_classes
            .get(symbol)
            .map(String::as_str)
            .unwrap_or(symbol)
    }

    pub fn validate(&self) -> Result<()> {
        let percent = |name: &str, value: Decimal| {
            if value <= Decimal::ZERO || value > Decimal::ONE_HUNDRED {
                Err(RiskError::InvalidParameters(format!(
                    "{} must be in (0, 100], got {}",
                    name, value
                )))
            } else {
                Ok(())
            }
        };
        let fraction = |name: &str, value: Decimal| {
            if value <= Decimal::ZERO || value > Decimal::ONE {
                Err(RiskError::InvalidParameters(format!(
                    "{} must be in (0, 1], got {}",
                    name, value
                )))
            } else {
                Ok(())
            }
        };

        percent("max_position_size_pct", self.max_position_size_pct)?;
        percent("max_spread_pct", self.max_spread_pct)?;
        percent("approval_threshold", self.approval_threshold)?;
        percent("critical_risk_score", self.critical_risk_score)?;
        percent("risk_per_trade_pct", self.risk_per_trade_pct)?;
        percent("stop_loss_pct", self.stop_loss_pct)?;
        percent("take_profit_pct", self.take_profit_pct)?;
        fraction("max_correlation", self.max_correlation)?;
        fraction("max_volume_participation", self.max_volume_participation)?;
        fraction("max_concentration", self.max_concentration)?;
        fraction("max_drawdown", self.max_drawdown)?;

        if self.volatility_threshold_pct <= Decimal::ZERO {
            return Err(RiskError::InvalidParameters(
                "volatility_threshold_pct must be positive".to_string(),
            ));
        }
        if self.max_exposure <= Decimal::ZERO {
            return Err(RiskError::InvalidParameters(
                "max_exposure must be positive".to_string(),
            ));
        }
        if self.max_daily_loss <= Decimal::ZERO {
            return Err(RiskError::InvalidParameters(
                "max_daily_loss must be positive".to_string(),
            ));
        }
        if self.max_open_positions == 0 {
            return Err(RiskError::InvalidParameters(
                "max_open_positions must be at least 1".to_string(),
            ));
        }
        if self.stop_loss_pct >= Decimal::ONE_HUNDRED {
            return Err(RiskError::InvalidParameters(
                "stop_loss_pct must be below 100".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_max_position_size_pct() -> Decimal {
    dec!(25)
}

fn default_max_daily_loss() -> Decimal {
    dec!(2000)
}

fn default_max_open_positions() -> usize {
    5
}

fn default_volatility_threshold_pct() -> Decimal {
    dec!(5)
}

fn default_max_correlation() -> Decimal {
    dec!(0.7)
}

fn default_max_spread_pct() -> Decimal {
    dec!(0.5)
}

fn default_max_volume_participation() -> Decimal {
    dec!(0.01)
}

fn default_approval_threshold() -> Decimal {
    dec!(70)
}

fn default_risk_per_trade_pct() -> Decimal {
    dec!(1)
}

fn default_stop_loss_pct() -> Decimal {
    dec!(5)
}

fn default_take_profit_pct() -> Decimal {
    dec!(10)
}

fn default_max_exposure() -> Decimal {
    dec!(0.8)
}

fn default_max_concentration() -> Decimal {
    dec!(0.3)
}

fn default_max_drawdown() -> Decimal {
    dec!(0.15)
}

fn default_critical_risk_score() -> Decimal {
    dec!(80)
}

fn default_asset_classes() -> BTreeMap<String, String> {
    [
        ("BTC", "store_of_value"),
        ("ETH", "smart_contract"),
        ("SOL", "smart_contract"),
        ("ADA", "smart_contract"),
        ("AVAX", "smart_contract"),
        ("DOGE", "meme"),
    ]
    .into_iter()
    .map(|(symbol, class)| (symbol.to_string(), class.to_string()))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_parameters() {
        let params = RiskParameters::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.asset_class("SOL"), "smart_contract");
        assert_eq!(params.asset_class("XRP"), "XRP");
    }

    #[test]
    fn test_rejects_out_of_range() {
        let params = RiskParameters {
            max_correlation: dec!(1.5),
            ..Default::default()
        };
        let err = params.validate().unwrap_err();
        assert!(err.to_string().contains("max_correlation"));

        let params = RiskParameters {
            max_open_positions: 0,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let params: RiskParameters =
            serde_json::from_str(r#"{"max_daily_loss": "500", "auto_close_enabled": true}"#).unwrap();
        assert_eq!(params.max_daily_loss, dec!(500));
        assert!(params.auto_close_enabled);
        assert_eq!(params.max_open_positions, 5);
    }
}
