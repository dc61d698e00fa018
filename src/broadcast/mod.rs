//! Status broadcast.
//!
//! ## Contents
//! - [`StatusSnapshot`] immutable machine + inventory summary (JSON wire payload)
//! - [`Transport`] publish-only capability keyed by topic
//! - [`MemoryTransport`] in-process broker with retained messages
//! - [`Broadcaster`] latest-wins publisher with retry

mod broadcaster;
mod snapshot;
mod transport;

pub use broadcaster::Broadcaster;
pub use snapshot::StatusSnapshot;
pub use transport::{MemoryTransport, Transport};
