use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by external collaborators
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PortError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Malformed response: {0}")]
    Parse(String),

    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("Collaborator unavailable: {0}")]
    Unavailable(String),
}

pub type PortResult<T> = std::result::Result<T, PortError>;
