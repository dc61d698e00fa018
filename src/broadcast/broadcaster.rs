//! # Status broadcaster: latest-wins publishing with retry.
//!
//! ## Architecture
//! ```text
//! controller worker ── send_replace(snapshot) ──► watch (holds ONLY the latest)
//!                                                    │
//!                                                    ▼
//!                                     broadcaster task ──► Transport::publish(topic, json)
//!                                          │   ▲
//!                          Unavailable ────┘   └── sleep(backoff) | newer snapshot
//! ```
//!
//! ## Rules
//! - Publishing is decoupled from the state machine: a transition commits whether or not
//!   the publish succeeds, and the worker never waits on the transport.
//! - Only the most recent snapshot is buffered. While a retry is pending, a newer
//!   snapshot replaces the one being retried and is published immediately; the older
//!   one is never sent.
//! - Encoding failures are not retried.
//! - Snapshots reach the transport in capture order (older ones may be skipped, never reordered).

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::broadcast::snapshot::StatusSnapshot;
use crate::broadcast::transport::Transport;
use crate::error::TransportError;
use crate::events::{Bus, Event, EventKind};
use crate::policies::RetryPolicy;

/// Handle to the running broadcaster task.
pub struct Broadcaster {
    handle: JoinHandle<()>,
}

impl Broadcaster {
    /// Spawns the broadcaster.
    ///
    /// The task publishes the receiver's current value first, then every change. It
    /// stops when the token is cancelled or the snapshot sender is dropped (after a
    /// final attempt on an unseen snapshot).
    #[must_use]
    pub fn spawn(
        transport: Arc<dyn Transport>,
        topic: impl Into<String>,
        retry: RetryPolicy,
        snapshots: watch::Receiver<Arc<StatusSnapshot>>,
        bus: Bus,
        token: CancellationToken,
    ) -> Self {
        let task = PublishLoop {
            transport,
            topic: topic.into(),
            retry,
            snapshots,
            bus,
            token,
        };
        Self {
            handle: tokio::spawn(task.run()),
        }
    }

    /// Waits for the task to finish.
    pub async fn join(self) {
        let _ = self.handle.await;
    }
}

struct PublishLoop {
    transport: Arc<dyn Transport>,
    topic: String,
    retry: RetryPolicy,
    snapshots: watch::Receiver<Arc<StatusSnapshot>>,
    bus: Bus,
    token: CancellationToken,
}

impl PublishLoop {
    async fn run(mut self) {
        self.snapshots.mark_changed();
        loop {
            tokio::select! {
                biased;
                changed = self.snapshots.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = self.token.cancelled() => break,
            }
            let latest = Arc::clone(&self.snapshots.borrow_and_update());
            if !self.publish_latest(latest).await {
                break;
            }
        }
        debug!(topic = %self.topic, "broadcaster stopped");
    }

    /// Publishes `snapshot`, retrying until it succeeds, is superseded, or the
    /// retry budget runs out. Returns `false` when the loop must stop.
    async fn publish_latest(&mut self, mut snapshot: Arc<StatusSnapshot>) -> bool {
        let mut attempt: u32 = 1;
        loop {
            let err = match self.try_publish(&snapshot).await {
                Ok(()) => {
                    debug!(topic = %self.topic, snapshot = snapshot.seq, attempt, "snapshot published");
                    self.bus.publish(
                        Event::new(EventKind::SnapshotPublished)
                            .with_snapshot(snapshot.seq)
                            .with_state(snapshot.machine_state)
                            .with_attempt(attempt),
                    );
                    return true;
                }
                Err(e) => e,
            };

            let retrying = err.is_retryable() && self.retry.allows(attempt + 1);
            let delay = self.retry.delay_for(attempt);
            let mut ev = Event::new(EventKind::PublishFailed)
                .with_snapshot(snapshot.seq)
                .with_attempt(attempt)
                .with_reason(err.to_string());
            if retrying {
                ev = ev.with_delay(delay);
                warn!(topic = %self.topic, snapshot = snapshot.seq, attempt, ?delay, error = %err, "publish failed; retaining latest snapshot");
            } else {
                error!(topic = %self.topic, snapshot = snapshot.seq, attempt, error = %err, "publish abandoned");
            }
            self.bus.publish(ev);
            if !retrying {
                return true;
            }

            tokio::select! {
                biased;
                _ = self.token.cancelled() => return false,
                changed = self.snapshots.changed() => {
                    if changed.is_err() {
                        return false;
                    }
                    snapshot = Arc::clone(&self.snapshots.borrow_and_update());
                    attempt = 1;
                }
                _ = tokio::time::sleep(delay) => attempt += 1,
            }
        }
    }

    async fn try_publish(&self, snapshot: &StatusSnapshot) -> Result<(), TransportError> {
        let payload = snapshot.to_json()?;
        self.transport.publish(&self.topic, &payload).await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;

    use super::*;
    use crate::broadcast::transport::MemoryTransport;
    use crate::catalog::MachineInfo;
    use crate::inventory::InventoryStore;
    use crate::machine::Machine;
    use crate::policies::JitterPolicy;

    fn snapshot(seq: u64) -> Arc<StatusSnapshot> {
        let m = Machine::new(InventoryStore::default());
        Arc::new(StatusSnapshot::capture(seq, &MachineInfo::default(), &m, Utc::now()))
    }

    fn seqs(broker: &MemoryTransport) -> Vec<u64> {
        broker
            .history("vmc/status")
            .iter()
            .map(|p| {
                let v: serde_json::Value = serde_json::from_slice(p).unwrap();
                v["seq"].as_u64().unwrap()
            })
            .collect()
    }

    fn retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: None,
            first: Duration::from_millis(200),
            max: Duration::from_secs(2),
            factor: 2.0,
            jitter: JitterPolicy::None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_newer_snapshot_supersedes_failed_one() {
        let broker = Arc::new(MemoryTransport::new());
        let (tx, rx) = watch::channel(snapshot(0));
        let token = CancellationToken::new();
        let b = Broadcaster::spawn(
            broker.clone(),
            "vmc/status",
            retry(),
            rx,
            Bus::new(64),
            token.clone(),
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(seqs(&broker), vec![0]);

        broker.set_online(false);
        tx.send_replace(snapshot(1));
        tokio::time::sleep(Duration::from_millis(50)).await;

        broker.set_online(true);
        tx.send_replace(snapshot(2));
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(seqs(&broker), vec![0, 2]);
        let rx = broker.subscribe("vmc/status");
        let retained: serde_json::Value =
            serde_json::from_slice(rx.borrow().as_deref().unwrap()).unwrap();
        assert_eq!(retained["seq"], 2);

        token.cancel();
        b.join().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_publishes_after_reconnect() {
        let broker = Arc::new(MemoryTransport::new());
        broker.set_online(false);
        let bus = Bus::new(64);
        let mut events = bus.subscribe();
        let (_tx, rx) = watch::channel(snapshot(7));
        let token = CancellationToken::new();
        let b = Broadcaster::spawn(broker.clone(), "vmc/status", retry(), rx, bus, token.clone());

        let ev = events.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::PublishFailed);
        assert_eq!(ev.delay_ms, Some(200));

        broker.set_online(true);
        loop {
            let ev = events.recv().await.unwrap();
            if ev.kind == EventKind::SnapshotPublished {
                assert_eq!(ev.snapshot, Some(7));
                assert_eq!(ev.attempt, Some(2));
                break;
            }
        }
        assert_eq!(seqs(&broker), vec![7]);

        token.cancel();
        b.join().await;
    }

    #[tokio::test]
    async fn test_stops_after_sender_dropped() {
        let broker = Arc::new(MemoryTransport::new());
        let (tx, rx) = watch::channel(snapshot(0));
        let b = Broadcaster::spawn(
            broker.clone(),
            "vmc/status",
            retry(),
            rx,
            Bus::new(8),
            CancellationToken::new(),
        );
        tx.send_replace(snapshot(1));
        drop(tx);
        b.join().await;
        assert_eq!(seqs(&broker).last(), Some(&1));
    }
}
