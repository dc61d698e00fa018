//! # Broadcast transport.
//!
//! [`Transport`] is a publish-only capability keyed by topic; the controller never
//! consumes messages from it. [`MemoryTransport`] is an in-process broker with
//! retained messages: a subscriber always starts from the last message published on
//! a topic, never from a backlog. It can be switched offline to simulate an outage.
//! The most recent accepted payloads per topic are kept in a bounded history ring
//! ([`MemoryTransport::DEFAULT_HISTORY`] by default, `0` disables it).

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::watch;

use crate::error::TransportError;

/// Publish-only broadcast capability.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Publishes `payload` on `topic`.
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), TransportError>;
}

type Retained = Option<Arc<[u8]>>;

struct Topic {
    tx: watch::Sender<Retained>,
    history: VecDeque<Arc<[u8]>>,
}

impl Topic {
    fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            tx,
            history: VecDeque::new(),
        }
    }

    fn record(&mut self, message: &Arc<[u8]>, capacity: usize) {
        if capacity == 0 {
            return;
        }
        while self.history.len() >= capacity {
            self.history.pop_front();
        }
        self.history.push_back(Arc::clone(message));
    }
}

/// In-process broker with retained last message per topic.
pub struct MemoryTransport {
    online: AtomicBool,
    history_capacity: usize,
    topics: Mutex<HashMap<String, Topic>>,
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTransport {
    /// Payloads kept per topic by [`MemoryTransport::new`].
    pub const DEFAULT_HISTORY: usize = 64;

    /// Creates an online broker with no topics.
    #[must_use]
    pub fn new() -> Self {
        Self::with_history(Self::DEFAULT_HISTORY)
    }

    /// Creates an online broker keeping at most `capacity` payloads per topic.
    #[must_use]
    pub fn with_history(capacity: usize) -> Self {
        Self {
            online: AtomicBool::new(true),
            history_capacity: capacity,
            topics: Mutex::new(HashMap::new()),
        }
    }

    /// Simulates broker reachability.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Whether publishes currently succeed.
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Subscribes to `topic`. The receiver's current value is the retained message.
    pub fn subscribe(&self, topic: &str) -> watch::Receiver<Retained> {
        let mut topics = self.topics.lock().unwrap_or_else(PoisonError::into_inner);
        topics
            .entry(topic.to_owned())
            .or_insert_with(Topic::new)
            .tx
            .subscribe()
    }

    /// Last message published on `topic`.
    pub fn retained(&self, topic: &str) -> Retained {
        let topics = self.topics.lock().unwrap_or_else(PoisonError::into_inner);
        topics.get(topic).and_then(|t| t.tx.borrow().clone())
    }

    /// The most recent messages accepted on `topic`, oldest first.
    pub fn history(&self, topic: &str) -> Vec<Arc<[u8]>> {
        let topics = self.topics.lock().unwrap_or_else(PoisonError::into_inner);
        topics
            .get(topic)
            .map(|t| t.history.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), TransportError> {
        if !self.is_online() {
            return Err(TransportError::Unavailable("broker unreachable".into()));
        }
        let message: Arc<[u8]> = Arc::from(payload);
        let mut topics = self.topics.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = topics.entry(topic.to_owned()).or_insert_with(Topic::new);
        entry.record(&message, self.history_capacity);
        entry.tx.send_replace(Some(message));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_late_subscriber_gets_retained_only() {
        let broker = MemoryTransport::new();
        broker.publish("t", b"one").await.unwrap();
        broker.publish("t", b"two").await.unwrap();

        let rx = broker.subscribe("t");
        assert_eq!(rx.borrow().as_deref(), Some(&b"two"[..]));
        assert_eq!(broker.history("t").len(), 2);
    }

    #[tokio::test]
    async fn test_history_is_bounded() {
        let broker = MemoryTransport::with_history(2);
        for payload in [b"one", b"two", b"six"] {
            broker.publish("t", payload).await.unwrap();
        }
        let kept: Vec<_> = broker.history("t").iter().map(|p| p.to_vec()).collect();
        assert_eq!(kept, vec![b"two".to_vec(), b"six".to_vec()]);
        assert_eq!(broker.retained("t").as_deref(), Some(&b"six"[..]));
    }

    #[tokio::test]
    async fn test_zero_history_keeps_retained_only() {
        let broker = MemoryTransport::with_history(0);
        broker.publish("t", b"one").await.unwrap();
        assert!(broker.history("t").is_empty());
        assert_eq!(broker.retained("t").as_deref(), Some(&b"one"[..]));
    }

    #[tokio::test]
    async fn test_offline_rejects_and_keeps_retained() {
        let broker = MemoryTransport::new();
        broker.publish("t", b"one").await.unwrap();
        broker.set_online(false);
        let err = broker.publish("t", b"two").await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(broker.retained("t").as_deref(), Some(&b"one"[..]));
    }
}
