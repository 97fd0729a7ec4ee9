//! Pipeline errors

use meridian_core::SignalId;
use meridian_gateway::{FeedError, VenueId};
use meridian_monitor::MonitorError;
use meridian_order_manager::LedgerError;
use meridian_risk_manager::RiskError;
use meridian_strategy::SignalError;
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),

    #[error("Signal error: {0}")]
    Signal(#[from] SignalError),

    #[error("Risk error: {0}")]
    Risk(#[from] RiskError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Alert error: {0}")]
    Monitor(#[from] MonitorError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Signal {id} rejected at execution: {reasons}")]
    Rejected { id: SignalId, reasons: String },

    #[error("Venue {0} is not configured")]
    UnknownVenue(VenueId),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
