//! Retry policies for best-effort I/O.
//!
//! ## Contents
//! - [`RetryPolicy`] how many attempts and how long between them (first / factor / max + jitter)
//! - [`JitterPolicy`] randomization strategy to avoid synchronized retries
//!
//! ## Quick wiring
//! ```text
//! Config { publish_retry, alert_retry }
//!      ├─► Broadcaster     publish_retry: unbounded, superseded by newer snapshots
//!      └─► AlertRouter     alert_retry:   bounded, then AlertDropped
//! ```

mod jitter;
mod retry;

pub use jitter::JitterPolicy;
pub use retry::RetryPolicy;
