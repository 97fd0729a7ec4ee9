//! Meridian Order Manager
//!
//! The portfolio ledger is the single owner of the simulated account:
//! - **Fills**: approved signals open positions at their entry price, debiting
//!   value plus fees
//! - **Marking**: every price update revalues open positions and closes those
//!   whose stop loss or take profit was crossed
//! - **Accounting**: cash, total value, daily PnL and the full trade history
//! - **Performance**: win rate, profit factor, drawdown and Sharpe rebuilt
//!   from trades after each mutation
//!
//! ## Architecture
//!
//! ```text
//! RiskAssessment ──► execute_signal ──► ┌──────────────────────────────┐
//!                                       │        PortfolioLedger        │
//!                                       │  cash ◄──► positions ──► trades
//! MarketSnapshot ──► update_price ────► │     │          │             │
//!                                       │     ▼          ▼             │
//!                                       │  total_value   performance   │
//!                                       └──────────────┬───────────────┘
//!                                                      ▼
//!                                                  Portfolio
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use meridian_order_manager::{LedgerConfig, PortfolioLedger};
//!
//! let mut ledger = PortfolioLedger::new(LedgerConfig::default(), now);
//! let position = ledger.execute_signal(&signal, qty, stop_loss, take_profit, now)?;
//! let closed = ledger.update_price("BTC", dec!(42900), now);
//! ```

pub mod config;
pub mod error;
pub mod ledger;
pub mod performance;

// Re-export main types
pub use config::LedgerConfig;
pub use error::{LedgerError, Result};
pub use ledger::{OpenRequest, PortfolioLedger};
