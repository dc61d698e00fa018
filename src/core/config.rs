//! # Controller configuration.
//!
//! [`Config`] holds the runtime knobs of a [`Vmc`](crate::Vmc): deadline timers,
//! queue and bus sizes, the broadcast topic and the retry policies of the two
//! best-effort I/O paths. Product data is not configuration; it comes from the
//! [`Catalog`](crate::Catalog).
//!
//! ## Floors
//! - capacities of `0` are raised to `1` by the helper accessors
//! - a zero timer duration fires on the next tick (it does not disable the timer)
//!
//! ## Shutdown budget
//! A shutdown issued mid-dispense waits for the sensor outcome, or for the watchdog.
//! `grace` should therefore exceed `dispense_watchdog`; the builder warns when it does
//! not, since such a shutdown can then end in `GraceExceeded`.

use std::time::Duration;

use crate::policies::RetryPolicy;

/// Runtime configuration of the controller.
///
/// ## Field semantics
/// - `payment_timeout`: window between `select` and `payment_confirmed`
/// - `dispense_watchdog`: maximum time in Dispensing without a sensor outcome
/// - `grace`: maximum wait for the machine to reach Off during shutdown
/// - `bus_capacity`: runtime event bus ring buffer size
/// - `queue_capacity`: ordered input queue depth (callers wait when full)
/// - `event_log_capacity`: lines kept by the built-in [`EventLog`](crate::EventLog)
/// - `topic`: broadcast topic for status snapshots
/// - `publish_retry` / `alert_retry`: retry policies for the broadcaster and alert channels
///
/// All fields are public; prefer the helper accessors where a floor applies.
#[derive(Clone, Debug)]
pub struct Config {
    /// Payment window armed on `select`.
    pub payment_timeout: Duration,

    /// Dispense watchdog armed on entry to Dispensing.
    ///
    /// When it fires the transaction is failed and the machine enters Fault.
    pub dispense_watchdog: Duration,

    /// Maximum time to wait for Off after a shutdown request.
    ///
    /// Should exceed `dispense_watchdog`.
    pub grace: Duration,

    /// Capacity of the runtime event bus.
    ///
    /// Subscribers lagging behind by more than this many events skip the oldest ones.
    pub bus_capacity: usize,

    /// Depth of the ordered input queue between the gateway and the worker.
    pub queue_capacity: usize,

    /// Number of rendered lines kept by the recent-events log.
    pub event_log_capacity: usize,

    /// Topic status snapshots are published on.
    pub topic: String,

    /// Retry policy for snapshot publishing.
    pub publish_retry: RetryPolicy,

    /// Retry policy for alert delivery, per channel.
    pub alert_retry: RetryPolicy,
}

impl Config {
    /// Bus capacity, at least 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Input queue capacity, at least 1.
    #[inline]
    pub fn queue_capacity_clamped(&self) -> usize {
        self.queue_capacity.max(1)
    }

    /// Event log capacity, at least 1.
    #[inline]
    pub fn event_log_capacity_clamped(&self) -> usize {
        self.event_log_capacity.max(1)
    }

    /// Whether a shutdown issued mid-dispense can always reach Off within `grace`.
    #[inline]
    pub fn grace_covers_watchdog(&self) -> bool {
        self.grace > self.dispense_watchdog
    }
}

impl Default for Config {
    /// Defaults:
    /// - `payment_timeout = 30s`
    /// - `dispense_watchdog = 15s`
    /// - `grace = 20s`
    /// - `bus_capacity = 1024`
    /// - `queue_capacity = 256`
    /// - `event_log_capacity = 200`
    /// - `topic = "vmc/status"`
    /// - `publish_retry = RetryPolicy::publish()` (unbounded, 200ms..10s, equal jitter)
    /// - `alert_retry = RetryPolicy::default()` (3 attempts, 500ms..5s)
    fn default() -> Self {
        Self {
            payment_timeout: Duration::from_secs(30),
            dispense_watchdog: Duration::from_secs(15),
            grace: Duration::from_secs(20),
            bus_capacity: 1024,
            queue_capacity: 256,
            event_log_capacity: 200,
            topic: "vmc/status".to_string(),
            publish_retry: RetryPolicy::publish(),
            alert_retry: RetryPolicy::default(),
        }
    }
}
