//! Meridian Strategy
//!
//! Turns market snapshots into pending trade signals:
//! - Four independent conditions (volatility, technical, sentiment, cooldown)
//! - Cooldown gate plus an explicit force policy for quiet markets
//! - Direction scoring with Bollinger/percent levels
//! - A signal book enforcing the status lifecycle
//! - Per-symbol FIFO so each symbol is processed strictly in order
//!
//! ## Architecture
//!
//! ```text
//! MarketSnapshot ──► SymbolQueue (per symbol) ──► SignalGenerator
//!                                                      │ Decision
//!                                                      ▼
//!                                  VisionCorroborator (optional, ±confidence)
//!                                                      │
//!                                                      ▼
//!                                       SignalBook (PENDING ──► risk gate)
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use meridian_strategy::{Decision, SignalConfig, SignalGenerator};
//!
//! let mut generator = SignalGenerator::new(SignalConfig::default())?;
//! if let Decision::Generated { signal, forced } = generator.evaluate(&snapshot, now) {
//!     book.insert(signal);
//! }
//! ```

pub mod book;
pub mod conditions;
pub mod config;
pub mod error;
pub mod generator;
pub mod queue;
pub mod scoring;
pub mod vision;

// Re-export main types
pub use book::SignalBook;
pub use conditions::ConditionReport;
pub use config::{ForcePolicy, SignalConfig};
pub use error::{Result, SignalError};
pub use generator::{Decision, SignalGenerator, SkipReason, SymbolHistory};
pub use queue::SymbolQueue;
pub use scoring::DirectionScore;
pub use vision::{Corroboration, VisionCorroborator, corroborate};
