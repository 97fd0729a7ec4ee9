use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::Position;

/// Point-in-time view of the simulated account
///
/// `total_value == available_cash + Σ positions.market_value` holds for every
/// portfolio produced by the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Portfolio {
    pub id: Uuid,
    pub available_cash: Decimal,
    pub total_value: Decimal,
    /// Realized (net of fees) plus unrealized P&L since inception
    pub total_pnl: Decimal,
    /// Realized P&L (net of fees) since the last daily rollover
    pub daily_pnl: Decimal,
    /// Fraction of total value per symbol; cash under the "CASH" key
    pub allocation: BTreeMap<String, Decimal>,
    pub positions: Vec<Position>,
    pub updated_at: DateTime<Utc>,
}

impl Portfolio {
    pub const CASH_KEY: &'static str = "CASH";

    /// Σ market value of open positions
    pub fn positions_value(&self) -> Decimal {
        self.positions.iter().map(|p| p.market_value()).sum()
    }

    /// Absolute value of the gap between `total_value` and its components
    pub fn invariant_gap(&self) -> Decimal {
        (self.total_value - (self.available_cash + self.positions_value())).abs()
    }

    pub fn open_position_count(&self) -> usize {
        self.positions.len()
    }
}

/// Portfolio-wide risk figures recomputed on the monitoring cadence
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortfolioRisk {
    /// Σ open notional
    pub total_exposure: Decimal,
    /// Open notional / total value
    pub exposure_ratio: Decimal,
    /// Largest single position / total value
    pub concentration: Decimal,
    /// Largest asset-class share of open notional
    pub correlation: Decimal,
    /// Peak-to-current decline of total value (fraction)
    pub drawdown: Decimal,
    pub daily_pnl: Decimal,
    pub open_positions: usize,
    /// Composite 0-100 score
    pub risk_score: Decimal,
}

/// Trade-history performance statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    /// Winners / closed trades (0.0 - 1.0)
    pub win_rate: Decimal,
    pub average_win: Decimal,
    pub average_loss: Decimal,
    /// Gross profit / gross loss
    pub profit_factor: Decimal,
    /// Largest peak-to-trough decline of the realized equity curve (fraction)
    pub max_drawdown: Decimal,
    /// Mean per-trade return over its standard deviation
    pub sharpe_ratio: Decimal,
    pub net_realized_pnl: Decimal,
    pub total_fees: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{PositionSide, PositionStatus};
    use rust_decimal_macros::dec;

    #[test]
    fn test_invariant_gap() {
        let mut pos = Position::new(
            "BTC",
            PositionSide::Long,
            dec!(1),
            dec!(100),
            dec!(90),
            dec!(120),
            None,
            Utc::now(),
        );
        pos.status = PositionStatus::Open;

        let portfolio = Portfolio {
            id: Uuid::new_v4(),
            available_cash: dec!(900),
            total_value: dec!(1000),
            total_pnl: Decimal::ZERO,
            daily_pnl: Decimal::ZERO,
            allocation: BTreeMap::new(),
            positions: vec![pos],
            updated_at: Utc::now(),
        };

        assert_eq!(portfolio.positions_value(), dec!(100));
        assert_eq!(portfolio.invariant_gap(), Decimal::ZERO);
    }
}
