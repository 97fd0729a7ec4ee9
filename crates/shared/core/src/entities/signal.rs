//! Signal - a proposed trade pending risk approval
//!
//! Signals are created by the signal generator with status `Pending`.
//! The risk gate moves them to `Active` (approved) or `Cancelled` (rejected),
//! the ledger moves `Active` signals to `Executed` once filled.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::Direction;
use crate::values::{Price, Quantity, Symbol};

/// Unique identifier for a signal
pub type SignalId = Uuid;

/// Lifecycle of a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalStatus {
    /// Generated, awaiting risk evaluation
    Pending,
    /// Approved by risk, awaiting execution
    Active,
    /// Filled by the ledger
    Executed,
    /// Rejected by risk or cancelled by a consumer
    Cancelled,
}

impl SignalStatus {
    /// Whether `self -> next` is a legal transition
    pub fn can_transition_to(&self, next: SignalStatus) -> bool {
        use SignalStatus::*;
        matches!(
            (self, next),
            (Pending, Active) | (Pending, Cancelled) | (Active, Executed) | (Active, Cancelled)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SignalStatus::Executed | SignalStatus::Cancelled)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid signal transition {from:?} -> {to:?} for {id}")]
pub struct InvalidTransition {
    pub id: SignalId,
    pub from: SignalStatus,
    pub to: SignalStatus,
}

/// Trade proposal produced from a market snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub id: SignalId,
    pub symbol: Symbol,
    pub timestamp: DateTime<Utc>,
    pub direction: Direction,
    pub entry_price: Price,
    pub stop_loss: Price,
    pub take_profit: Price,
    /// Confidence in the signal (0.0 - 1.0)
    pub confidence: Decimal,
    /// Signal-local risk estimate (0.0 - 1.0)
    pub risk_score: Decimal,
    /// Strength of the directional evidence (0.0 - 1.0)
    pub signal_strength: Decimal,
    pub reasoning: String,
    pub status: SignalStatus,
    /// Optional explicit size; when absent the risk gate sizes the trade
    pub quantity: Option<Quantity>,
}

impl Signal {
    /// Create a new pending signal
    pub fn new(
        symbol: impl Into<Symbol>,
        direction: Direction,
        entry_price: Price,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            symbol: symbol.into(),
            timestamp,
            direction,
            entry_price,
            stop_loss: entry_price,
            take_profit: entry_price,
            confidence: Decimal::ONE,
            risk_score: Decimal::ZERO,
            signal_strength: Decimal::ZERO,
            reasoning: String::new(),
            status: SignalStatus::Pending,
            quantity: None,
        }
    }

    /// Builder: Set stop loss and take profit
    pub fn with_levels(mut self, stop_loss: Price, take_profit: Price) -> Self {
        self.stop_loss = stop_loss;
        self.take_profit = take_profit;
        self
    }

    /// Builder: Set confidence (clamped to 0.0 - 1.0)
    pub fn with_confidence(mut self, confidence: Decimal) -> Self {
        self.confidence = confidence.clamp(Decimal::ZERO, Decimal::ONE);
        self
    }

    /// Builder: Set risk score (clamped to 0.0 - 1.0)
    pub fn with_risk_score(mut self, risk_score: Decimal) -> Self {
        self.risk_score = risk_score.clamp(Decimal::ZERO, Decimal::ONE);
        self
    }

    /// Builder: Set signal strength (clamped to 0.0 - 1.0)
    pub fn with_strength(mut self, strength: Decimal) -> Self {
        self.signal_strength = strength.clamp(Decimal::ZERO, Decimal::ONE);
        self
    }

    /// Builder: Set reasoning text
    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = reasoning.into();
        self
    }

    /// Builder: Request an explicit quantity
    pub fn with_quantity(mut self, quantity: Quantity) -> Self {
        self.quantity = Some(quantity);
        self
    }

    /// Move the signal to a new status, enforcing the lifecycle
    pub fn transition(&mut self, to: SignalStatus) -> Result<(), InvalidTransition> {
        if !self.status.can_transition_to(to) {
            return Err(InvalidTransition {
                id: self.id,
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }

    /// Reward/risk ratio implied by the levels
    pub fn reward_risk_ratio(&self) -> Option<Decimal> {
        let risk = (self.entry_price - self.stop_loss).abs();
        if risk.is_zero() {
            return None;
        }
        Some((self.take_profit - self.entry_price).abs() / risk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn buy_signal() -> Signal {
        Signal::new("BTC", Direction::Buy, dec!(45000), Utc::now())
            .with_levels(dec!(44000), dec!(47000))
            .with_confidence(dec!(0.8))
    }

    #[test]
    fn test_signal_creation() {
        let signal = buy_signal();
        assert_eq!(signal.status, SignalStatus::Pending);
        assert_eq!(signal.symbol, "BTC");
        assert_eq!(signal.reward_risk_ratio(), Some(dec!(2)));
    }

    #[test]
    fn test_confidence_clamping() {
        let signal = buy_signal().with_confidence(dec!(1.5));
        assert_eq!(signal.confidence, Decimal::ONE);
    }

    #[test]
    fn test_lifecycle_transitions() {
        let mut signal = buy_signal();
        signal.transition(SignalStatus::Active).unwrap();
        signal.transition(SignalStatus::Executed).unwrap();
        assert!(signal.status.is_terminal());

        let err = signal.transition(SignalStatus::Pending).unwrap_err();
        assert_eq!(err.from, SignalStatus::Executed);
    }

    #[test]
    fn test_pending_cannot_execute_directly() {
        let mut signal = buy_signal();
        assert!(signal.transition(SignalStatus::Executed).is_err());
        assert_eq!(signal.status, SignalStatus::Pending);
    }
}
