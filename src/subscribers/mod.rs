//! # Event subscribers for the controller runtime.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out and
//! built-in subscribers for runtime events broadcast through the
//! [`Bus`](crate::events::Bus).
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   worker ── publish(Event) ──► Bus ──► listener ──► SubscriberSet
//!                                                        │
//!                                          ┌─────────────┼──────────────┐
//!                                          ▼             ▼              ▼
//!                                       EventLog     LogWriter       custom
//!                                    (always on)  (feature logging)
//! ```

mod event_log;
mod set;
mod subscriber;

#[cfg(feature = "logging")]
mod log;

pub use event_log::{EventLog, LogLine};
pub use set::SubscriberSet;
pub use subscriber::Subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
