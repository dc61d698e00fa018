//! # Runtime events emitted by the controller worker and its collaborators.
//!
//! The [`EventKind`] enum classifies events across four categories:
//! - **Machine events**: state changes, inventory changes, archived transactions, faults
//! - **Command events**: deferred administrative commands and their later outcome
//! - **Delivery events**: alert notification and snapshot publish results
//! - **Runtime events**: subscriber isolation and shutdown progress
//!
//! The [`Event`] struct carries optional metadata (states, product, transaction id,
//! channel, attempt, reason) set depending on the kind.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Events for one committed step are published in the order the step generated them.
//!
//! ## Example
//! ```rust
//! use vmc::{Event, EventKind, MachineState};
//!
//! let ev = Event::new(EventKind::StateChanged)
//!     .with_from(MachineState::Idle)
//!     .with_state(MachineState::Selecting)
//!     .with_tx(7);
//!
//! assert_eq!(ev.kind, EventKind::StateChanged);
//! assert_eq!(ev.state, Some(MachineState::Selecting));
//! assert_eq!(ev.tx, Some(7));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::inventory::AlertKind;
use crate::machine::{MachineState, Transaction};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Machine events ===
    /// Machine moved along an edge of the transition graph.
    ///
    /// Sets:
    /// - `from`: previous state
    /// - `state`: new state
    /// - `tx`: active transaction, if any
    StateChanged,

    /// A tracked product count changed (commit or restock).
    ///
    /// Sets:
    /// - `product`: product id
    /// - `count`: new count
    InventoryChanged,

    /// A transaction reached a terminal status and was archived.
    ///
    /// Sets:
    /// - `tx`, `product`: transaction id and product
    /// - `transaction`: the full closed record
    TransactionClosed,

    /// Machine entered Fault, or recorded a fault while shutting down.
    ///
    /// Sets:
    /// - `reason`: fault code
    /// - `tx`: transaction active at the time
    FaultRaised,

    /// `fault_cleared` acknowledged the standing fault.
    FaultAcknowledged,

    /// Internal consistency failure; the machine was forced to Fault.
    ///
    /// Sets:
    /// - `reason`: what was inconsistent
    InvariantViolated,

    // === Command events ===
    /// Administrative command queued until the in-flight dispense resolves.
    ///
    /// Sets:
    /// - `input`: command name
    /// - `state`: state at arrival
    CommandDeferred,

    /// Deferred command applied.
    ///
    /// Sets:
    /// - `input`: command name
    /// - `state`: state after applying
    CommandApplied,

    /// Deferred command refused when its turn came.
    ///
    /// Sets:
    /// - `input`: command name
    /// - `reason`: rejection message
    CommandRejected,

    // === Alert events ===
    /// Stock alert raised.
    ///
    /// Sets:
    /// - `product`, `alert`, `count`
    AlertRaised,

    /// Standing alerts cleared by a restock above threshold.
    ///
    /// Sets:
    /// - `product`
    AlertCleared,

    /// Notification delivered on a channel.
    ///
    /// Sets:
    /// - `channel`, `product`, `alert`, `attempt`
    AlertDelivered,

    /// Delivery failed; another attempt is scheduled.
    ///
    /// Sets:
    /// - `channel`, `product`, `attempt`, `delay_ms`, `reason`
    AlertRetryScheduled,

    /// Delivery abandoned after the retry budget or a permanent error.
    ///
    /// Sets:
    /// - `channel`, `product`, `attempt`, `reason`
    AlertDropped,

    // === Broadcast events ===
    /// Snapshot published on the transport.
    ///
    /// Sets:
    /// - `snapshot`: snapshot sequence
    /// - `attempt`: attempts it took
    SnapshotPublished,

    /// Publish failed; the latest snapshot is retained for retry.
    ///
    /// Sets:
    /// - `snapshot`, `attempt`, `delay_ms`, `reason`
    PublishFailed,

    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `channel`: subscriber name
    /// - `reason`: panic message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `channel`: subscriber name
    /// - `reason`: "full" or "closed"
    SubscriberOverflow,

    // === Shutdown events ===
    /// Shutdown requested (OS signal or explicit call).
    ShutdownRequested,

    /// Machine reached Off within the grace period.
    AllStoppedWithin,

    /// Grace period exceeded before the machine reached Off.
    ///
    /// Sets:
    /// - `state`: state observed when the grace ran out
    GraceExceeded,
}

impl EventKind {
    /// Returns a short stable label (kebab-case) for log lines.
    pub fn as_label(&self) -> &'static str {
        match self {
            EventKind::StateChanged => "state-changed",
            EventKind::InventoryChanged => "inventory-changed",
            EventKind::TransactionClosed => "transaction-closed",
            EventKind::FaultRaised => "fault-raised",
            EventKind::FaultAcknowledged => "fault-acknowledged",
            EventKind::InvariantViolated => "invariant-violated",
            EventKind::CommandDeferred => "command-deferred",
            EventKind::CommandApplied => "command-applied",
            EventKind::CommandRejected => "command-rejected",
            EventKind::AlertRaised => "alert-raised",
            EventKind::AlertCleared => "alert-cleared",
            EventKind::AlertDelivered => "alert-delivered",
            EventKind::AlertRetryScheduled => "alert-retry",
            EventKind::AlertDropped => "alert-dropped",
            EventKind::SnapshotPublished => "snapshot-published",
            EventKind::PublishFailed => "publish-failed",
            EventKind::SubscriberPanicked => "subscriber-panicked",
            EventKind::SubscriberOverflow => "subscriber-overflow",
            EventKind::ShutdownRequested => "shutdown-requested",
            EventKind::AllStoppedWithin => "all-stopped-within-grace",
            EventKind::GraceExceeded => "grace-exceeded",
        }
    }
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: DateTime<Utc>,
    /// Event classification.
    pub kind: EventKind,

    /// Previous machine state.
    pub from: Option<MachineState>,
    /// Current (or observed) machine state.
    pub state: Option<MachineState>,
    /// Transaction id.
    pub tx: Option<u64>,
    /// Product id.
    pub product: Option<Arc<str>>,
    /// Remaining count for a tracked product.
    pub count: Option<u32>,
    /// Alert kind.
    pub alert: Option<AlertKind>,
    /// Input or command name.
    pub input: Option<&'static str>,
    /// Notification channel or subscriber name.
    pub channel: Option<Arc<str>>,
    /// Snapshot sequence number.
    pub snapshot: Option<u64>,
    /// Attempt count (starting from 1).
    pub attempt: Option<u32>,
    /// Delay before the next attempt in milliseconds.
    pub delay_ms: Option<u32>,
    /// Human-readable reason (fault codes, errors, overflow details).
    pub reason: Option<Arc<str>>,
    /// Closed transaction record.
    pub transaction: Option<Arc<Transaction>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: Utc::now(),
            kind,
            from: None,
            state: None,
            tx: None,
            product: None,
            count: None,
            alert: None,
            input: None,
            channel: None,
            snapshot: None,
            attempt: None,
            delay_ms: None,
            reason: None,
            transaction: None,
        }
    }

    /// Attaches the previous state.
    #[inline]
    pub fn with_from(mut self, state: MachineState) -> Self {
        self.from = Some(state);
        self
    }

    /// Attaches the current state.
    #[inline]
    pub fn with_state(mut self, state: MachineState) -> Self {
        self.state = Some(state);
        self
    }

    /// Attaches a transaction id.
    #[inline]
    pub fn with_tx(mut self, tx: u64) -> Self {
        self.tx = Some(tx);
        self
    }

    /// Attaches a product id.
    #[inline]
    pub fn with_product(mut self, product: impl Into<Arc<str>>) -> Self {
        self.product = Some(product.into());
        self
    }

    /// Attaches a remaining count.
    #[inline]
    pub fn with_count(mut self, count: Option<u32>) -> Self {
        self.count = count;
        self
    }

    /// Attaches an alert kind.
    #[inline]
    pub fn with_alert(mut self, kind: AlertKind) -> Self {
        self.alert = Some(kind);
        self
    }

    /// Attaches an input name.
    #[inline]
    pub fn with_input(mut self, input: &'static str) -> Self {
        self.input = Some(input);
        self
    }

    /// Attaches a channel or subscriber name.
    #[inline]
    pub fn with_channel(mut self, channel: impl Into<Arc<str>>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    /// Attaches a snapshot sequence number.
    #[inline]
    pub fn with_snapshot(mut self, seq: u64) -> Self {
        self.snapshot = Some(seq);
        self
    }

    /// Attaches an attempt count.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a retry delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a closed transaction record.
    #[inline]
    pub fn with_transaction(mut self, tx: Transaction) -> Self {
        self.tx = Some(tx.id);
        self.product = Some(Arc::from(tx.selected_product_id.as_str()));
        self.transaction = Some(Arc::new(tx));
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_channel(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_channel(subscriber)
            .with_reason(info)
    }

    /// Renders the event as one compact log line.
    ///
    /// ```text
    /// [state-changed] idle -> selecting tx=1
    /// [alert-raised] product=soda kind=out_of_stock count=0
    /// [alert-dropped] channel=sms product=soda attempt=3 reason="delivery failed: timeout"
    /// ```
    pub fn render(&self) -> String {
        use std::fmt::Write as _;

        let mut line = format!("[{}]", self.kind.as_label());
        if let Some(from) = self.from {
            let _ = write!(line, " {from} ->");
        }
        if let Some(state) = self.state {
            let _ = write!(line, " {state}");
        }
        if let Some(input) = self.input {
            let _ = write!(line, " command={input}");
        }
        if let Some(tx) = self.tx {
            let _ = write!(line, " tx={tx}");
        }
        if let Some(channel) = &self.channel {
            let _ = write!(line, " channel={channel}");
        }
        if let Some(product) = &self.product {
            let _ = write!(line, " product={product}");
        }
        if let Some(alert) = self.alert {
            let _ = write!(line, " kind={alert}");
        }
        if let Some(count) = self.count {
            let _ = write!(line, " count={count}");
        }
        if let Some(tx) = &self.transaction {
            let _ = write!(
                line,
                " status={:?} amount={} change_due={} refund_due={}",
                tx.status, tx.amount_tendered, tx.change_due, tx.refund_due
            );
        }
        if let Some(seq) = self.snapshot {
            let _ = write!(line, " snapshot={seq}");
        }
        if let Some(attempt) = self.attempt {
            let _ = write!(line, " attempt={attempt}");
        }
        if let Some(ms) = self.delay_ms {
            let _ = write!(line, " delay={ms}ms");
        }
        if let Some(reason) = &self.reason {
            let _ = write!(line, " reason={reason:?}");
        }
        line
    }
}
