//! # Bounded recent-events log.
//!
//! [`EventLog`] keeps the last `capacity` rendered event lines (state changes, faults,
//! alerts, archived transactions, command outcomes) for the admin layer's "last N
//! events" view. It is always installed by the runtime.
//!
//! ```text
//! Bus ──► SubscriberSet ──► EventLog::on_event ──► VecDeque<LogLine> (oldest evicted)
//!                                                        │
//!                          Vmc::recent_events(n) ◄───────┘
//! ```

use std::collections::VecDeque;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// One rendered event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LogLine {
    /// Event sequence number.
    pub seq: u64,
    /// Event timestamp.
    pub at: DateTime<Utc>,
    /// Rendered line (see [`Event::render`]).
    pub line: String,
}

/// Keeps the most recent event lines.
pub struct EventLog {
    lines: RwLock<VecDeque<LogLine>>,
    capacity: usize,
}

impl EventLog {
    /// Creates a log keeping at most `capacity` lines (clamped to at least 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            lines: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Returns up to `n` most recent lines, oldest first.
    pub fn recent(&self, n: usize) -> Vec<LogLine> {
        let g = self.lines.read().unwrap_or_else(PoisonError::into_inner);
        let skip = g.len().saturating_sub(n);
        g.iter().skip(skip).cloned().collect()
    }

    /// Number of retained lines.
    pub fn len(&self) -> usize {
        self.lines
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if nothing was recorded yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends an event, evicting the oldest line when full.
    pub fn record(&self, ev: &Event) {
        let line = LogLine {
            seq: ev.seq,
            at: ev.at,
            line: ev.render(),
        };
        let mut g = self.lines.write().unwrap_or_else(PoisonError::into_inner);
        if g.len() == self.capacity {
            g.pop_front();
        }
        g.push_back(line);
    }
}

#[async_trait]
impl Subscribe for EventLog {
    async fn on_event(&self, ev: &Event) {
        // Successful publishes happen on every step and would crowd out the rest.
        if !matches!(ev.kind, EventKind::SnapshotPublished) {
            self.record(ev);
        }
    }

    fn name(&self) -> &'static str {
        "event-log"
    }

    fn queue_capacity(&self) -> usize {
        self.capacity.max(64)
    }
}
