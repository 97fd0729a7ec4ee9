//! Portfolio Ledger
//!
//! Sole owner of cash, positions and trades for the simulated account.
//!
//! ```text
//! open_position ──► PENDING ──(cash debited)──► OPEN ──► CLOSED
//!                                                ▲          ▲
//!                         update_price (SL/TP) ──┘          │
//!                         close_position / close_all ───────┘
//! ```
//!
//! After every mutation `total_value` is recomputed as
//! `cash + Σ open market value` and performance is rebuilt from the trades.

use std::collections::{BTreeMap, VecDeque};

use log::{info, warn};
use meridian_core::{
    CloseReason, InvalidTransition, PerformanceMetrics, Portfolio, Position, PositionId,
    PositionSide, PositionStatus, Price, Quantity, Signal, SignalId, SignalStatus, Timestamp, Trade,
};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::config::LedgerConfig;
use crate::error::{LedgerError, Result};
use crate::performance;

/// Everything needed to open a position
#[derive(Debug, Clone, PartialEq)]
pub struct OpenRequest {
    pub symbol: String,
    pub side: PositionSide,
    pub quantity: Quantity,
    pub price: Price,
    pub stop_loss: Price,
    pub take_profit: Price,
    pub signal_id: Option<SignalId>,
}

pub struct PortfolioLedger {
    id: Uuid,
    config: LedgerConfig,
    cash: Decimal,
    total_value: Decimal,
    /// Open positions in opening order
    positions: Vec<Position>,
    closed: VecDeque<Position>,
    trades: Vec<Trade>,
    /// Net realized PnL since the last daily rollover
    daily_pnl: Decimal,
    performance: PerformanceMetrics,
    updated_at: Timestamp,
}

impl PortfolioLedger {
    pub fn new(config: LedgerConfig, now: Timestamp) -> Self {
        let cash = config.initial_cash;
        info!("[LEDGER] Initialized with cash {}", cash);
        Self {
            id: Uuid::new_v4(),
            config,
            cash,
            total_value: cash,
            positions: Vec::new(),
            closed: VecDeque::new(),
            trades: Vec::new(),
            daily_pnl: Decimal::ZERO,
            performance: PerformanceMetrics::default(),
            updated_at: now,
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn cash(&self) -> Decimal {
        self.cash
    }

    pub fn total_value(&self) -> Decimal {
        self.total_value
    }

    pub fn daily_pnl(&self) -> Decimal {
        self.daily_pnl
    }

    /// Total value relative to the starting balance
    pub fn total_pnl(&self) -> Decimal {
        self.total_value - self.config.initial_cash
    }

    pub fn open_positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn position(&self, id: &PositionId) -> Option<&Position> {
        self.positions.iter().find(|p| p.id == *id)
    }

    pub fn has_position(&self, symbol: &str) -> bool {
        self.positions.iter().any(|p| p.symbol == symbol)
    }

    /// Closed positions, newest first
    pub fn closed_positions(&self) -> Vec<Position> {
        self.closed.iter().rev().cloned().collect()
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn performance(&self) -> &PerformanceMetrics {
        &self.performance
    }

    /// Point-in-time copy of the account
    pub fn portfolio(&self) -> Portfolio {
        let mut allocation = BTreeMap::new();
        if self.total_value > Decimal::ZERO {
            for position in &self.positions {
                *allocation
                    .entry(position.symbol.clone())
                    .or_insert(Decimal::ZERO) += position.market_value() / self.total_value;
            }
            allocation.insert(
                Portfolio::CASH_KEY.to_string(),
                self.cash / self.total_value,
            );
        }

        Portfolio {
            id: self.id,
            available_cash: self.cash,
            total_value: self.total_value,
            total_pnl: self.total_pnl(),
            daily_pnl: self.daily_pnl,
            allocation,
            positions: self.positions.clone(),
            updated_at: self.updated_at,
        }
    }

    /// Open a position, debiting `quantity * price + fees`
    pub fn open_position(&mut self, request: OpenRequest, now: Timestamp) -> Result<Position> {
        if request.quantity <= Decimal::ZERO {
            return Err(LedgerError::InvalidQuantity(request.quantity));
        }
        if request.price <= Decimal::ZERO {
            return Err(LedgerError::InvalidPrice(request.price));
        }

        let mut position = Position::new(
            request.symbol,
            request.side,
            request.quantity,
            request.price,
            request.stop_loss,
            request.take_profit,
            request.signal_id,
            now,
        );

        let value = position.entry_value();
        let fees = value * self.config.fee_rate;
        let required = value + fees;
        if required > self.cash {
            warn!(
                "[LEDGER] Rejected {:?} {} {}: requires {} with {} available",
                position.side, position.quantity, position.symbol, required, self.cash
            );
            return Err(LedgerError::InsufficientFunds {
                required,
                available: self.cash,
            });
        }

        self.cash -= required;
        position.fees = fees;
        position.status = PositionStatus::Open;

        self.trades.push(Trade::opening(
            position.id,
            position.symbol.clone(),
            position.side,
            position.quantity,
            position.entry_price,
            fees,
            position.signal_id,
            now,
        ));
        self.positions.push(position.clone());

        info!(
            "[LEDGER] Opened {:?} {} {} @ {} (fees {}, SL {}, TP {})",
            position.side,
            position.quantity,
            position.symbol,
            position.entry_price,
            fees.round_dp(4),
            position.stop_loss,
            position.take_profit
        );

        self.after_mutation(now);
        Ok(position)
    }

    /// Fill an approved signal
    ///
    /// The signal must be `Active`; the caller records the `Executed` transition.
    pub fn execute_signal(
        &mut self,
        signal: &Signal,
        quantity: Quantity,
        stop_loss: Price,
        take_profit: Price,
        now: Timestamp,
    ) -> Result<Position> {
        if !signal.status.can_transition_to(SignalStatus::Executed) {
            return Err(InvalidTransition {
                id: signal.id,
                from: signal.status,
                to: SignalStatus::Executed,
            }
            .into());
        }
        let side = signal.direction.position_side().ok_or_else(|| {
            LedgerError::NotExecutable(format!("{} signal {}", signal.direction, signal.id))
        })?;

        self.open_position(
            OpenRequest {
                symbol: signal.symbol.clone(),
                side,
                quantity,
                price: signal.entry_price,
                stop_loss,
                take_profit,
                signal_id: Some(signal.id),
            },
            now,
        )
    }

    /// Mark every position in `symbol` and auto-close any that hit SL/TP
    ///
    /// Returns the positions closed by this update.
    pub fn update_price(&mut self, symbol: &str, price: Price, now: Timestamp) -> Vec<Position> {
        let mut triggered = Vec::new();
        for position in self.positions.iter_mut().filter(|p| p.symbol == symbol) {
            position.update_price(price, now);
            if let Some(reason) = position.exit_trigger() {
                triggered.push((position.id, reason));
            }
        }

        let mut closed = Vec::with_capacity(triggered.len());
        for (id, reason) in triggered {
            match self.close_position(&id, price, reason, now) {
                Ok(position) => closed.push(position),
                Err(e) => warn!("[LEDGER] Auto-close of {} failed: {}", id, e),
            }
        }

        self.after_mutation(now);
        closed
    }

    /// Close a position at `price`, crediting its market value less fees
    pub fn close_position(
        &mut self,
        id: &PositionId,
        price: Price,
        reason: CloseReason,
        now: Timestamp,
    ) -> Result<Position> {
        if price <= Decimal::ZERO {
            return Err(LedgerError::InvalidPrice(price));
        }
        let index = self
            .positions
            .iter()
            .position(|p| p.id == *id)
            .ok_or(LedgerError::PositionNotFound(*id))?;
        let mut position = self.positions.remove(index);

        position.update_price(price, now);
        let realized = position.side.pnl(position.entry_price, price, position.quantity);
        let exit_value = position.value_at(price);
        let fees = position.quantity * price * self.config.fee_rate;

        self.cash += exit_value - fees;
        position.fees += fees;
        position.realized_pnl = realized;
        position.status = PositionStatus::Closed;
        position.exit_price = Some(price);
        position.exit_time = Some(now);
        position.close_reason = Some(reason);

        let net = realized - position.fees;
        self.daily_pnl += net;

        self.trades.push(Trade::closing(
            position.id,
            position.symbol.clone(),
            position.side,
            position.quantity,
            price,
            exit_value,
            fees,
            realized,
            position.signal_id,
            now,
        ));

        info!(
            "[LEDGER] Closed {:?} {} {} @ {} ({}): realized {}, net {}",
            position.side,
            position.quantity,
            position.symbol,
            price,
            reason,
            realized.round_dp(2),
            net.round_dp(2)
        );

        self.closed.push_back(position.clone());
        while self.closed.len() > self.config.closed_history_limit {
            self.closed.pop_front();
        }

        self.after_mutation(now);
        Ok(position)
    }

    /// Close every open position at its current price
    pub fn close_all(&mut self, reason: CloseReason, now: Timestamp) -> Vec<Position> {
        let targets: Vec<(PositionId, Price)> = self
            .positions
            .iter()
            .map(|p| (p.id, p.current_price))
            .collect();

        targets
            .into_iter()
            .filter_map(|(id, price)| match self.close_position(&id, price, reason, now) {
                Ok(position) => Some(position),
                Err(e) => {
                    warn!("[LEDGER] Close of {} failed: {}", id, e);
                    None
                }
            })
            .collect()
    }

    /// Start a new trading day
    pub fn roll_day(&mut self, now: Timestamp) {
        info!("[LEDGER] Daily rollover: daily PnL was {}", self.daily_pnl.round_dp(2));
        self.daily_pnl = Decimal::ZERO;
        self.updated_at = now;
    }

    /// `|total_value - (cash + Σ market value)| <= epsilon`
    pub fn verify_invariant(&self, epsilon: Decimal) -> bool {
        let positions_value: Decimal = self.positions.iter().map(Position::market_value).sum();
        (self.total_value - (self.cash + positions_value)).abs() <= epsilon
    }

    fn after_mutation(&mut self, now: Timestamp) {
        self.total_value = self.cash + self.positions.iter().map(Position::market_value).sum::<Decimal>();
        self.performance = performance::compute(&self.trades, self.config.initial_cash);
        self.updated_at = now;
    }
}
