use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Starting cash balance
    #[serde(default = "default_initial_cash")]
    pub initial_cash: Decimal,
    /// Fee charged on each fill, as a fraction of traded value
    #[serde(default = "default_fee_rate")]
    pub fee_rate: Decimal,
    /// Closed positions retained for inspection
    #[serde(default = "default_closed_history")]
    pub closed_history_limit: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            initial_cash: default_initial_cash(),
            fee_rate: default_fee_rate(),
            closed_history_limit: default_closed_history(),
        }
    }
}

fn default_initial_cash() -> Decimal {
    dec!(10000)
}

fn default_fee_rate() -> Decimal {
    dec!(0.001)
}

fn default_closed_history() -> usize {
    1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: LedgerConfig = serde_json::from_str(r#"{"initial_cash": "2500"}"#).unwrap();
        assert_eq!(config.initial_cash, dec!(2500));
        assert_eq!(config.fee_rate, dec!(0.001));
        assert_eq!(config.closed_history_limit, 1000);
    }
}
