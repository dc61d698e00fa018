//! # Notification channels.
//!
//! [`NotifyChannel`] is the seam to an external delivery service (SMTP relay, SMS
//! gateway). The runtime never calls it from the state machine's path: each channel
//! is driven by its own worker inside the [`AlertRouter`](crate::AlertRouter).
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use vmc::{ChannelKind, DeliveryError, Notification, NotifyChannel};
//!
//! struct SmsGateway;
//!
//! #[async_trait]
//! impl NotifyChannel for SmsGateway {
//!     fn kind(&self) -> ChannelKind { ChannelKind::Sms }
//!
//!     async fn deliver(&self, n: &Notification) -> Result<(), DeliveryError> {
//!         for r in &n.recipients {
//!             let _ = (&r.address, n.body());
//!         }
//!         Ok(())
//!     }
//! }
//! ```

use async_trait::async_trait;
use serde::Serialize;

use crate::catalog::{ChannelKind, MachineInfo, Recipient};
use crate::error::DeliveryError;
use crate::inventory::Alert;

/// One alert addressed to the recipients of one channel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Notification {
    /// The raised alert.
    pub alert: Alert,
    /// Machine that raised it.
    pub machine: MachineInfo,
    /// Recipients on this channel.
    pub recipients: Vec<Recipient>,
}

impl Notification {
    /// Short subject line.
    pub fn subject(&self) -> String {
        let machine = if self.machine.name.is_empty() {
            self.machine.serial_number.as_str()
        } else {
            self.machine.name.as_str()
        };
        format!("[{machine}] {}: {}", self.alert.kind, self.alert.product_id)
    }

    /// Message body.
    pub fn body(&self) -> String {
        let mut body = self.alert.describe();
        if !self.machine.location.is_empty() {
            body.push_str(&format!(" at {}", self.machine.location));
        }
        body.push_str(&format!(" ({})", self.alert.raised_at.to_rfc3339()));
        body
    }
}

/// Delivery endpoint for one channel kind.
#[async_trait]
pub trait NotifyChannel: Send + Sync + 'static {
    /// Channel kind; selects the recipients addressed to it.
    fn kind(&self) -> ChannelKind;

    /// Channel name used in logs and events. Defaults to the kind label.
    fn name(&self) -> &'static str {
        self.kind().as_str()
    }

    /// Delivers one notification.
    ///
    /// Return [`DeliveryError::Failed`] for transient errors (retried) and
    /// [`DeliveryError::Rejected`] for permanent ones (dropped immediately).
    async fn deliver(&self, notification: &Notification) -> Result<(), DeliveryError>;

    /// Alerts buffered for this channel before new ones are dropped. Default: 64.
    fn queue_capacity(&self) -> usize {
        64
    }
}

/// Channel that writes notifications to the log instead of sending them.
pub struct LogChannel {
    kind: ChannelKind,
}

impl LogChannel {
    /// Creates a log-only channel standing in for `kind`.
    #[must_use]
    pub fn new(kind: ChannelKind) -> Self {
        Self { kind }
    }
}

#[async_trait]
impl NotifyChannel for LogChannel {
    fn kind(&self) -> ChannelKind {
        self.kind
    }

    async fn deliver(&self, n: &Notification) -> Result<(), DeliveryError> {
        for r in &n.recipients {
            tracing::info!(
                channel = %self.kind,
                to = %r.address,
                subject = %n.subject(),
                "{}",
                n.body()
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::inventory::AlertKind;

    #[test]
    fn test_subject_and_body() {
        let n = Notification {
            alert: Alert {
                product_id: "chips".into(),
                kind: AlertKind::LowStock,
                raised_at: Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap(),
                count: 2,
                threshold: 2,
            },
            machine: MachineInfo {
                name: "Lobby".into(),
                serial_number: "VM-1".into(),
                location: "Building A".into(),
            },
            recipients: Vec::new(),
        };
        assert_eq!(n.subject(), "[Lobby] low_stock: chips");
        assert_eq!(
            n.body(),
            "chips is low on stock: 2 left (threshold 2) at Building A (2026-01-02T03:04:05+00:00)"
        );
    }
}
