//! Meridian Risk Manager
//!
//! Two layers of risk control:
//!
//! - **RiskGate**: pre-trade scoring of every pending signal. Sizes the
//!   trade, applies hard limits and soft checks, and recomputes levels on
//!   approval.
//! - **PortfolioRiskMonitor**: periodic portfolio-wide figures with keyed
//!   alerts and optional auto-close nomination.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Risk Manager                          │
//! │                                                             │
//! │  Signal + Snapshot ──► RiskGate ──────► RiskAssessment      │
//! │                          ▲                                  │
//! │  RiskParameters ─────────┤                                  │
//! │                          ▼                                  │
//! │  Portfolio ─────► PortfolioRiskMonitor ──► risk:* alerts    │
//! │                                        └─► auto-close id    │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod gate;
pub mod monitor;
pub mod parameters;

// Re-export main types
pub use error::{Result, RiskError};
pub use gate::{RiskAssessment, RiskGate};
pub use monitor::{PortfolioRiskMonitor, RiskCheck, highest_risk_position};
pub use parameters::RiskParameters;
