//! Ledger errors

use meridian_core::{InvalidTransition, PositionId};
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Insufficient funds: required={required}, available={available}")]
    InsufficientFunds { required: Decimal, available: Decimal },

    #[error("Position not found: {0}")]
    PositionNotFound(PositionId),

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(Decimal),

    #[error("Invalid price: {0}")]
    InvalidPrice(Decimal),

    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),

    #[error("Signal is not executable: {0}")]
    NotExecutable(String),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
