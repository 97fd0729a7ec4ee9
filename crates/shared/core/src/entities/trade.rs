use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{PositionId, PositionSide, SignalId};
use crate::values::{Price, Quantity, Symbol};

/// Unique identifier for a trade
pub type TradeId = Uuid;

/// Which leg of a position a fill belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeLeg {
    Open,
    Close,
}

/// Immutable record of a simulated fill
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub id: TradeId,
    pub position_id: PositionId,
    pub symbol: Symbol,
    /// Side of the position this fill belongs to
    pub side: PositionSide,
    pub leg: TradeLeg,
    pub quantity: Quantity,
    pub price: Price,
    /// Cash value of the fill
    pub value: Decimal,
    pub fees: Decimal,
    /// Realized P&L (closing legs only, gross of fees)
    pub realized_pnl: Option<Decimal>,
    pub signal_id: Option<SignalId>,
    pub timestamp: DateTime<Utc>,
}

impl Trade {
    /// Record an opening fill
    #[allow(clippy::too_many_arguments)]
    pub fn opening(
        position_id: PositionId,
        symbol: impl Into<Symbol>,
        side: PositionSide,
        quantity: Quantity,
        price: Price,
        fees: Decimal,
        signal_id: Option<SignalId>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            position_id,
            symbol: symbol.into(),
            side,
            leg: TradeLeg::Open,
            quantity,
            price,
            value: quantity * price,
            fees,
            realized_pnl: None,
            signal_id,
            timestamp,
        }
    }

    /// Record a closing fill
    #[allow(clippy::too_many_arguments)]
    pub fn closing(
        position_id: PositionId,
        symbol: impl Into<Symbol>,
        side: PositionSide,
        quantity: Quantity,
        price: Price,
        value: Decimal,
        fees: Decimal,
        realized_pnl: Decimal,
        signal_id: Option<SignalId>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            position_id,
            symbol: symbol.into(),
            side,
            leg: TradeLeg::Close,
            quantity,
            price,
            value,
            fees,
            realized_pnl: Some(realized_pnl),
            signal_id,
            timestamp,
        }
    }

    pub fn is_closing(&self) -> bool {
        self.leg == TradeLeg::Close
    }
}
