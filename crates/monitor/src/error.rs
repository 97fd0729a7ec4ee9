use meridian_core::AlertId;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MonitorError {
    #[error("Alert not found: {0}")]
    AlertNotFound(AlertId),
}

pub type Result<T> = std::result::Result<T, MonitorError>;
