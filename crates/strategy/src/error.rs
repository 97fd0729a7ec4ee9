//! Error types for the strategy crate

use meridian_core::{InvalidTransition, SignalId};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SignalError {
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),

    #[error("Signal not found: {0}")]
    NotFound(SignalId),

    #[error("Invalid signal configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, SignalError>;
