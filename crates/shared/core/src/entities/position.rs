use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::SignalId;
use crate::values::{Price, Quantity, Symbol};

/// Unique identifier for a position
pub type PositionId = Uuid;

/// Position side - long (bought) or short (sold)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PositionSide {
    /// Long position - bought the asset, profit when price rises
    Long,
    /// Short position - sold borrowed asset, profit when price falls
    Short,
}

impl PositionSide {
    /// Returns the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            PositionSide::Long => PositionSide::Short,
            PositionSide::Short => PositionSide::Long,
        }
    }

    /// Signed PnL of moving from `entry` to `exit` with `quantity`
    pub fn pnl(&self, entry: Price, exit: Price, quantity: Quantity) -> Decimal {
        match self {
            PositionSide::Long => (exit - entry) * quantity,
            PositionSide::Short => (entry - exit) * quantity,
        }
    }
}

/// Position lifecycle. There is no transition back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PositionStatus {
    Pending,
    Open,
    Closed,
}

/// Why a position was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CloseReason {
    StopLoss,
    TakeProfit,
    Manual,
    RiskLimit,
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CloseReason::StopLoss => "Stop Loss",
            CloseReason::TakeProfit => "Take Profit",
            CloseReason::Manual => "Manual",
            CloseReason::RiskLimit => "Risk Limit",
        };
        f.write_str(s)
    }
}

/// A holding resulting from an executed signal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    /// Unique position identifier
    pub id: PositionId,

    /// Symbol being traded
    pub symbol: Symbol,

    /// Position side (long/short)
    pub side: PositionSide,

    /// Position quantity (always positive)
    pub quantity: Quantity,

    /// Entry price
    pub entry_price: Price,

    /// Latest market price (for P&L calculation)
    pub current_price: Price,

    pub stop_loss: Price,
    pub take_profit: Price,

    pub status: PositionStatus,

    /// Realized profit/loss, set on close (gross of fees)
    pub realized_pnl: Decimal,

    /// Fees paid on both legs
    pub fees: Decimal,

    /// Signal this position was opened from
    pub signal_id: Option<SignalId>,

    /// When the position was opened
    pub entry_time: DateTime<Utc>,

    /// Last update time
    pub updated_at: DateTime<Utc>,

    pub exit_price: Option<Price>,
    pub exit_time: Option<DateTime<Utc>>,
    pub close_reason: Option<CloseReason>,
}

impl Position {
    /// Create a new pending position
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        symbol: impl Into<Symbol>,
        side: PositionSide,
        quantity: Quantity,
        entry_price: Price,
        stop_loss: Price,
        take_profit: Price,
        signal_id: Option<SignalId>,
        entry_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            symbol: symbol.into(),
            side,
            quantity,
            entry_price,
            current_price: entry_price,
            stop_loss,
            take_profit,
            status: PositionStatus::Pending,
            realized_pnl: Decimal::ZERO,
            fees: Decimal::ZERO,
            signal_id,
            entry_time,
            updated_at: entry_time,
            exit_price: None,
            exit_time: None,
            close_reason: None,
        }
    }

    /// Notional at entry
    pub fn entry_value(&self) -> Decimal {
        self.quantity * self.entry_price
    }

    /// Unrealized P&L at the current price
    pub fn unrealized_pnl(&self) -> Decimal {
        if self.status == PositionStatus::Closed {
            return Decimal::ZERO;
        }
        self.side
            .pnl(self.entry_price, self.current_price, self.quantity)
    }

    /// Value of the position at `price`
    ///
    /// A long is worth its quantity at market. A short is worth the collateral
    /// posted at entry plus its running P&L.
    pub fn value_at(&self, price: Price) -> Decimal {
        match self.side {
            PositionSide::Long => self.quantity * price,
            PositionSide::Short => {
                self.entry_value() + self.side.pnl(self.entry_price, price, self.quantity)
            }
        }
    }

    /// Value of the position at the current price
    pub fn market_value(&self) -> Decimal {
        self.value_at(self.current_price)
    }

    /// Absolute exposure at the current price
    pub fn notional(&self) -> Decimal {
        self.quantity * self.current_price
    }

    /// Update the mark price
    pub fn update_price(&mut self, price: Price, at: DateTime<Utc>) {
        self.current_price = price;
        self.updated_at = at;
    }

    /// Exit reason triggered at the current price, if any (inclusive comparison)
    pub fn exit_trigger(&self) -> Option<CloseReason> {
        let price = self.current_price;
        match self.side {
            PositionSide::Long => {
                if price <= self.stop_loss {
                    Some(CloseReason::StopLoss)
                } else if price >= self.take_profit {
                    Some(CloseReason::TakeProfit)
                } else {
                    None
                }
            }
            PositionSide::Short => {
                if price >= self.stop_loss {
                    Some(CloseReason::StopLoss)
                } else if price <= self.take_profit {
                    Some(CloseReason::TakeProfit)
                } else {
                    None
                }
            }
        }
    }

    /// Unrealized P&L as a fraction of entry value
    pub fn return_fraction(&self) -> Decimal {
        let entry_value = self.entry_value();
        if entry_value.is_zero() {
            return Decimal::ZERO;
        }
        self.unrealized_pnl() / entry_value
    }

    pub fn is_open(&self) -> bool {
        self.status == PositionStatus::Open
    }
}
