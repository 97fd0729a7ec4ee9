//! Meridian Clock Infrastructure
//!
//! Time sources and the task scheduler that drives the pipeline:
//!
//! ```text
//! Clock (port)
//!   ├── SystemClock   wall-clock time for live runs
//!   └── ManualClock   advanced explicitly by tests
//!
//! Scheduler
//!   ├── poll:<SYMBOL>   repeating, one per subscribed symbol
//!   ├── risk-monitor    repeating
//!   ├── metrics         repeating
//!   └── daily-rollover  one-shot, re-armed by its owner
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use meridian_clock::{Clock, ManualClock, Scheduler};
//! use chrono::Duration;
//!
//! let clock = ManualClock::starting_now();
//! let mut scheduler = Scheduler::new();
//! scheduler.schedule_repeating("metrics", Duration::seconds(60), clock.now());
//!
//! clock.advance(Duration::seconds(60));
//! for task in scheduler.due(clock.now()) {
//!     // dispatch by name
//! }
//! ```

mod manual;
mod scheduler;
mod system;

pub use manual::ManualClock;
pub use scheduler::{CancellationToken, Scheduler, TaskKind};
pub use system::SystemClock;

// Re-export the Clock trait for convenience
pub use meridian_ports::Clock;
