//! # LogWriter: event printer over `tracing`
//!
//! A minimal subscriber that emits every incoming [`Event`] as one `tracing` record,
//! at a level chosen by kind. Use it in demos and on test benches.
//!
//! ## Example output
//! ```text
//! INFO  vmc::events: [state-changed] idle -> selecting tx=1
//! INFO  vmc::events: [transaction-closed] tx=1 product=soda status=Completed amount=150 change_due=0 refund_due=false
//! WARN  vmc::events: [alert-raised] product=soda kind=out_of_stock count=0
//! ERROR vmc::events: [alert-dropped] channel=sms product=soda attempt=3 reason="delivery failed: timeout"
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let line = e.render();
        match e.kind {
            EventKind::InvariantViolated
            | EventKind::AlertDropped
            | EventKind::GraceExceeded
            | EventKind::SubscriberPanicked => {
                tracing::error!(target: "vmc::events", seq = e.seq, "{line}");
            }
            EventKind::FaultRaised
            | EventKind::AlertRaised
            | EventKind::AlertRetryScheduled
            | EventKind::PublishFailed
            | EventKind::CommandRejected
            | EventKind::SubscriberOverflow => {
                tracing::warn!(target: "vmc::events", seq = e.seq, "{line}");
            }
            EventKind::SnapshotPublished => {
                tracing::debug!(target: "vmc::events", seq = e.seq, "{line}");
            }
            _ => {
                tracing::info!(target: "vmc::events", seq = e.seq, "{line}");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
