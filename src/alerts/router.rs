//! # Alert router: best-effort, per-channel notification delivery.
//!
//! ## Architecture
//! ```text
//! dispatch(alert)                  (called from the controller worker, never blocks)
//!     │
//!     ├──► [queue email] ──► worker ──► deliver ─┬─ Ok ─────────────► AlertDelivered
//!     │                                           ├─ Failed, budget ─► sleep ─► retry
//!     │                                           └─ otherwise ──────► AlertDropped + error!
//!     └──► [queue sms]   ──► worker ──► ...
//! ```
//!
//! ## Rules
//! - Channels are independent: a failing or slow channel never delays another.
//! - Per-channel FIFO: alerts are delivered in the order they were raised, one at a time,
//!   so ordering per product holds on every channel.
//! - Retries are bounded by [`RetryPolicy::max_attempts`]; after that the alert is dropped
//!   and the drop is surfaced as an `AlertDropped` event and an error log line.
//! - A full channel queue drops the new alert for that channel only.
//! - Panics inside a channel are caught and treated as a permanent failure.

use std::collections::HashMap;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::alerts::channel::{Notification, NotifyChannel};
use crate::catalog::{ChannelKind, MachineInfo, Recipient};
use crate::error::DeliveryError;
use crate::events::{Bus, Event, EventKind};
use crate::inventory::Alert;
use crate::policies::RetryPolicy;

struct ChannelQueue {
    name: &'static str,
    sender: mpsc::Sender<Alert>,
}

/// Fans stock alerts out to the configured notification channels.
pub struct AlertRouter {
    queues: Vec<ChannelQueue>,
    workers: Vec<JoinHandle<()>>,
    bus: Bus,
}

impl AlertRouter {
    /// Spawns one delivery worker per channel.
    ///
    /// Recipients are resolved once, at startup, from the catalogue contacts.
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn new(
        channels: Vec<Arc<dyn NotifyChannel>>,
        machine: MachineInfo,
        recipients: HashMap<ChannelKind, Vec<Recipient>>,
        retry: RetryPolicy,
        bus: Bus,
        token: CancellationToken,
    ) -> Self {
        let mut queues = Vec::with_capacity(channels.len());
        let mut workers = Vec::with_capacity(channels.len());

        for channel in channels {
            let (tx, rx) = mpsc::channel::<Alert>(channel.queue_capacity().max(1));
            let worker = ChannelWorker {
                recipients: recipients.get(&channel.kind()).cloned().unwrap_or_default(),
                machine: machine.clone(),
                channel: Arc::clone(&channel),
                retry,
                bus: bus.clone(),
                token: token.child_token(),
            };
            queues.push(ChannelQueue {
                name: channel.name(),
                sender: tx,
            });
            workers.push(tokio::spawn(worker.run(rx)));
        }

        Self {
            queues,
            workers,
            bus,
        }
    }

    /// Number of configured channels.
    pub fn len(&self) -> usize {
        self.queues.len()
    }

    /// Returns `true` if no channel is configured.
    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }

    /// Hands an alert to every channel without waiting for delivery.
    pub fn dispatch(&self, alert: &Alert) {
        for q in &self.queues {
            let reason = match q.sender.try_send(alert.clone()) {
                Ok(()) => continue,
                Err(mpsc::error::TrySendError::Full(_)) => "channel queue full",
                Err(mpsc::error::TrySendError::Closed(_)) => "channel worker stopped",
            };
            error!(channel = q.name, product = %alert.product_id, kind = %alert.kind, reason, "alert dropped");
            self.bus.publish(
                Event::new(EventKind::AlertDropped)
                    .with_channel(q.name)
                    .with_product(alert.product_id.as_str())
                    .with_alert(alert.kind)
                    .with_reason(reason),
            );
        }
    }

    /// Stops accepting alerts and waits until every queued alert was delivered or dropped.
    ///
    /// Cancelling the token passed to [`AlertRouter::new`] first cuts retry sleeps short.
    pub async fn shutdown(self) {
        drop(self.queues);
        for h in self.workers {
            let _ = h.await;
        }
    }
}

struct ChannelWorker {
    channel: Arc<dyn NotifyChannel>,
    machine: MachineInfo,
    recipients: Vec<Recipient>,
    retry: RetryPolicy,
    bus: Bus,
    token: CancellationToken,
}

impl ChannelWorker {
    async fn run(self, mut rx: mpsc::Receiver<Alert>) {
        while let Some(alert) = rx.recv().await {
            self.deliver(alert).await;
        }
        debug!(channel = self.channel.name(), "alert channel worker stopped");
    }

    async fn deliver(&self, alert: Alert) {
        let name = self.channel.name();
        if self.recipients.is_empty() {
            warn!(channel = name, product = %alert.product_id, "no recipients for channel");
            self.dropped(&alert, 0, "no recipients");
            return;
        }

        let notification = Notification {
            alert,
            machine: self.machine.clone(),
            recipients: self.recipients.clone(),
        };
        let alert = &notification.alert;

        let mut attempt: u32 = 1;
        loop {
            let fut = self.channel.deliver(&notification);
            let res = match std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                Ok(res) => res,
                Err(_) => Err(DeliveryError::Rejected("channel panicked".into())),
            };

            let err = match res {
                Ok(()) => {
                    debug!(channel = name, product = %alert.product_id, attempt, "alert delivered");
                    self.bus.publish(
                        Event::new(EventKind::AlertDelivered)
                            .with_channel(name)
                            .with_product(alert.product_id.as_str())
                            .with_alert(alert.kind)
                            .with_attempt(attempt),
                    );
                    return;
                }
                Err(e) => e,
            };

            if !err.is_retryable() || !self.retry.allows(attempt + 1) {
                self.dropped(alert, attempt, &err.to_string());
                return;
            }

            let delay = self.retry.delay_for(attempt);
            warn!(channel = name, product = %alert.product_id, attempt, ?delay, error = %err, "alert delivery failed; retrying");
            self.bus.publish(
                Event::new(EventKind::AlertRetryScheduled)
                    .with_channel(name)
                    .with_product(alert.product_id.as_str())
                    .with_alert(alert.kind)
                    .with_attempt(attempt)
                    .with_delay(delay)
                    .with_reason(err.to_string()),
            );
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = self.token.cancelled() => {
                    self.dropped(alert, attempt, "runtime stopping");
                    return;
                }
            }
            attempt += 1;
        }
    }

    fn dropped(&self, alert: &Alert, attempt: u32, reason: &str) {
        let name = self.channel.name();
        error!(channel = name, product = %alert.product_id, kind = %alert.kind, attempt, reason, "alert dropped");
        let mut ev = Event::new(EventKind::AlertDropped)
            .with_channel(name)
            .with_product(alert.product_id.as_str())
            .with_alert(alert.kind)
            .with_reason(reason);
        if attempt > 0 {
            ev = ev.with_attempt(attempt);
        }
        self.bus.publish(ev);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::Utc;

    use super::*;
    use crate::inventory::AlertKind;
    use crate::policies::JitterPolicy;

    /// Fails the first `failures` attempts, then records deliveries.
    struct Flaky {
        kind: ChannelKind,
        failures: Mutex<u32>,
        delivered: Mutex<Vec<String>>,
    }

    impl Flaky {
        fn new(kind: ChannelKind, failures: u32) -> Arc<Self> {
            Arc::new(Self {
                kind,
                failures: Mutex::new(failures),
                delivered: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl NotifyChannel for Flaky {
        fn kind(&self) -> ChannelKind {
            self.kind
        }

        async fn deliver(&self, n: &Notification) -> Result<(), DeliveryError> {
            {
                let mut left = self.failures.lock().unwrap();
                if *left > 0 {
                    *left -= 1;
                    return Err(DeliveryError::Failed("gateway timeout".into()));
                }
            }
            self.delivered
                .lock()
                .unwrap()
                .push(n.alert.product_id.clone());
            Ok(())
        }
    }

    fn alert(product: &str) -> Alert {
        Alert {
            product_id: product.into(),
            kind: AlertKind::LowStock,
            raised_at: Utc::now(),
            count: 1,
            threshold: 2,
        }
    }

    fn recipients() -> HashMap<ChannelKind, Vec<Recipient>> {
        [ChannelKind::Email, ChannelKind::Sms]
            .into_iter()
            .map(|kind| {
                (
                    kind,
                    vec![Recipient {
                        name: "Owner".into(),
                        channel: kind,
                        address: "owner".into(),
                    }],
                )
            })
            .collect()
    }

    fn retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: Some(3),
            first: Duration::from_millis(100),
            max: Duration::from_secs(1),
            factor: 2.0,
            jitter: JitterPolicy::None,
        }
    }

    async fn next_kind(rx: &mut tokio::sync::broadcast::Receiver<Event>, kind: EventKind) -> Event {
        loop {
            let ev = rx.recv().await.unwrap();
            if ev.kind == kind {
                return ev;
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_then_deliver_in_order() {
        let bus = Bus::new(64);
        let mut rx = bus.subscribe();
        let email = Flaky::new(ChannelKind::Email, 2);
        let router = AlertRouter::new(
            vec![email.clone()],
            MachineInfo::default(),
            recipients(),
            retry(),
            bus.clone(),
            CancellationToken::new(),
        );

        router.dispatch(&alert("chips"));
        router.dispatch(&alert("soda"));

        let ev = next_kind(&mut rx, EventKind::AlertDelivered).await;
        assert_eq!(ev.attempt, Some(3));
        assert_eq!(ev.product.as_deref(), Some("chips"));

        router.shutdown().await;
        assert_eq!(*email.delivered.lock().unwrap(), vec!["chips", "soda"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_channel_drops_without_blocking_others() {
        let bus = Bus::new(64);
        let mut rx = bus.subscribe();
        let sms = Flaky::new(ChannelKind::Sms, u32::MAX);
        let email = Flaky::new(ChannelKind::Email, 0);
        let router = AlertRouter::new(
            vec![sms.clone(), email.clone()],
            MachineInfo::default(),
            recipients(),
            retry(),
            bus.clone(),
            CancellationToken::new(),
        );

        router.dispatch(&alert("chips"));

        let dropped = next_kind(&mut rx, EventKind::AlertDropped).await;
        assert_eq!(dropped.channel.as_deref(), Some("sms"));
        assert_eq!(dropped.attempt, Some(3));

        router.shutdown().await;
        assert_eq!(*email.delivered.lock().unwrap(), vec!["chips"]);
        assert!(sms.delivered.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_recipients_is_surfaced() {
        let bus = Bus::new(64);
        let mut rx = bus.subscribe();
        let router = AlertRouter::new(
            vec![Flaky::new(ChannelKind::Sms, 0)],
            MachineInfo::default(),
            HashMap::new(),
            retry(),
            bus.clone(),
            CancellationToken::new(),
        );
        router.dispatch(&alert("chips"));
        let ev = next_kind(&mut rx, EventKind::AlertDropped).await;
        assert_eq!(ev.reason.as_deref(), Some("no recipients"));
        router.shutdown().await;
    }
}
