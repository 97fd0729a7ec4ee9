//! In-process message transport
//!
//! Snapshots are fanned out to consumers through a `TopicBus`, one topic per
//! symbol (see `Subjects`).

pub mod bus;
pub mod config;

pub use bus::{Callback, Delivery, Subscription, TopicBus};
pub use config::Subjects;
