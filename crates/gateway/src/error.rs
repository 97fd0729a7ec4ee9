//! Error types for the gateway crate

use std::time::Duration;

use meridian_ports::PortError;
use thiserror::Error;

/// Market data feed errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Fetch timed out after {0:?}")]
    Timeout(Duration),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("Feed is stopped")]
    Stopped,

    #[error("Venue {0} has exhausted its reconnect attempts")]
    Exhausted(String),
}

impl From<PortError> for FeedError {
    fn from(e: PortError) -> Self {
        match e {
            PortError::Timeout(after) => FeedError::Timeout(after),
            PortError::Parse(msg) => FeedError::Parse(msg),
            PortError::UnknownSymbol(symbol) => FeedError::UnknownSymbol(symbol),
            PortError::Transport(msg) | PortError::Unavailable(msg) => FeedError::Transport(msg),
        }
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(e: serde_json::Error) -> Self {
        FeedError::Parse(e.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for FeedError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        FeedError::Transport(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FeedError>;
