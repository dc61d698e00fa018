//! Stock alert notification.
//!
//! ## Contents
//! - [`NotifyChannel`] seam to an external delivery service
//! - [`Notification`] one alert addressed to one channel's recipients
//! - [`AlertRouter`] per-channel workers with bounded retry
//! - [`LogChannel`] log-only stand-in channel
//!
//! Threshold evaluation itself lives in the [`InventoryStore`](crate::InventoryStore);
//! the router only delivers what the store raised.

mod channel;
mod router;

pub use channel::{LogChannel, Notification, NotifyChannel};
pub use router::AlertRouter;
