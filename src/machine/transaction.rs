//! # Purchase transactions.
//!
//! A [`Transaction`] lives from `select` until a terminal [`TxStatus`]; at that point
//! it is archived (emitted as a `TransactionClosed` event) and dropped by the machine.
//!
//! ## Money owed back
//! - payment above the price leaves `change_due = amount_tendered - unit_price`
//! - a transaction that ends without a dispense after payment owes the whole tender:
//!   `refund_due` is set and `change_due = amount_tendered`

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Transaction lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TxStatus {
    /// Product selected, awaiting payment.
    Pending,
    /// Payment authorised, stock about to be reserved.
    PaymentConfirmed,
    /// Actuator commanded.
    Dispensing,
    /// Dispense confirmed and committed.
    Completed,
    /// Timed out, aborted, or dispense failed.
    Failed,
    /// Payment captured but returned without a dispense attempt.
    Refunded,
}

impl TxStatus {
    /// Terminal statuses end the transaction.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TxStatus::Completed | TxStatus::Failed | TxStatus::Refunded
        )
    }
}

/// One purchase attempt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Transaction {
    /// Machine-local, monotonically increasing id.
    pub id: u64,
    /// Product selected.
    pub selected_product_id: String,
    /// Product price in cents at selection time.
    pub unit_price: u64,
    /// Authorised amount in cents (0 until payment).
    pub amount_tendered: u64,
    /// Cents to return to the customer.
    pub change_due: u64,
    /// Lifecycle status.
    pub status: TxStatus,
    /// Payment was captured and must be returned.
    pub refund_due: bool,
    /// When the selection was made.
    pub opened_at: DateTime<Utc>,
    /// When a terminal status was reached.
    pub closed_at: Option<DateTime<Utc>>,
}

impl Transaction {
    pub(crate) fn open(id: u64, product_id: &str, unit_price: u64, now: DateTime<Utc>) -> Self {
        Self {
            id,
            selected_product_id: product_id.to_owned(),
            unit_price,
            amount_tendered: 0,
            change_due: 0,
            status: TxStatus::Pending,
            refund_due: false,
            opened_at: now,
            closed_at: None,
        }
    }

    /// Payment has been captured and not yet settled.
    pub fn payment_captured(&self) -> bool {
        matches!(self.status, TxStatus::PaymentConfirmed | TxStatus::Dispensing)
    }

    /// Records an accepted payment of `amount` cents.
    pub(crate) fn pay(&mut self, amount: u64, status: TxStatus) {
        self.amount_tendered = amount;
        self.change_due = amount.saturating_sub(self.unit_price);
        self.status = status;
    }

    /// Moves to a terminal status and stamps the close time.
    pub(crate) fn close(mut self, status: TxStatus, now: DateTime<Utc>) -> Self {
        debug_assert!(status.is_terminal());
        if status != TxStatus::Completed && self.payment_captured() {
            self.refund_due = true;
            self.change_due = self.amount_tendered;
        }
        self.status = status;
        self.closed_at = Some(now);
        self
    }
}
