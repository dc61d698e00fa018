//! Error types used by the controller runtime, the state machine and its collaborators.
//!
//! This module defines:
//!
//! - [`Rejection`] — structured reason an input was refused by the machine (returned to callers);
//! - [`RuntimeError`] — failures of the runtime itself (shutdown grace, closed queue);
//! - [`CatalogError`] — malformed bootstrap configuration, rejected at load time;
//! - [`TransportError`] / [`DeliveryError`] — broadcast and notification I/O failures;
//! - [`ActuatorError`] — the physical layer refused a dispense command.
//!
//! All types provide `as_label` (stable snake_case label for logs) and `as_message`.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::machine::MachineState;

/// Classification of rejections, mirroring the controller's error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionKind {
    /// Input is not legal in the current state.
    InvalidTransition,
    /// Selection or reservation against a depleted tracked product.
    OutOfStock,
    /// Internal consistency failure; the machine is forced to Fault.
    InvariantViolation,
    /// The controller cannot currently accept inputs.
    Unavailable,
}

/// # Why the machine refused an input.
///
/// Rejections never change state (except [`Rejection::InvariantViolation`],
/// which is reported after the machine was forced to Fault).
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "error", rename_all = "snake_case")]
pub enum Rejection {
    /// Input is not legal in the current state.
    #[error("{input} not allowed in state {state}: {reason}")]
    InvalidTransition {
        /// State the machine was in.
        state: MachineState,
        /// Name of the refused input.
        input: &'static str,
        /// Short explanation.
        reason: &'static str,
    },

    /// Tracked product has no stock left.
    #[error("product '{product_id}' is out of stock")]
    OutOfStock {
        /// Product that was requested.
        product_id: String,
    },

    /// Product id is not in the catalogue.
    #[error("product '{product_id}' is not in the catalogue")]
    UnknownProduct {
        /// Product that was requested.
        product_id: String,
    },

    /// The machine is in maintenance and refuses new selections.
    #[error("machine is in maintenance mode")]
    MaintenanceMode,

    /// Authorised amount does not cover the unit price.
    #[error("payment of {tendered} does not cover price {required}")]
    InsufficientPayment {
        /// Unit price in cents.
        required: u64,
        /// Authorised amount in cents.
        tendered: u64,
    },

    /// Internal inconsistency detected; machine forced to Fault.
    #[error("invariant violated: {detail}")]
    InvariantViolation {
        /// What was inconsistent.
        detail: String,
    },

    /// Controller input queue is closed (runtime stopped).
    #[error("controller unavailable")]
    Unavailable,
}

impl Rejection {
    /// Shorthand for [`Rejection::InvalidTransition`].
    pub(crate) fn invalid(state: MachineState, input: &'static str, reason: &'static str) -> Self {
        Rejection::InvalidTransition {
            state,
            input,
            reason,
        }
    }

    /// Maps this rejection onto the taxonomy.
    ///
    /// Unknown products and insufficient payment are invalid inputs for the
    /// current transaction; maintenance mode refuses the transition itself.
    pub fn kind(&self) -> RejectionKind {
        match self {
            Rejection::InvalidTransition { .. }
            | Rejection::UnknownProduct { .. }
            | Rejection::MaintenanceMode
            | Rejection::InsufficientPayment { .. } => RejectionKind::InvalidTransition,
            Rejection::OutOfStock { .. } => RejectionKind::OutOfStock,
            Rejection::InvariantViolation { .. } => RejectionKind::InvariantViolation,
            Rejection::Unavailable => RejectionKind::Unavailable,
        }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use vmc::Rejection;
    ///
    /// let rej = Rejection::MaintenanceMode;
    /// assert_eq!(rej.as_label(), "maintenance_mode");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            Rejection::InvalidTransition { .. } => "invalid_transition",
            Rejection::OutOfStock { .. } => "out_of_stock",
            Rejection::UnknownProduct { .. } => "unknown_product",
            Rejection::MaintenanceMode => "maintenance_mode",
            Rejection::InsufficientPayment { .. } => "insufficient_payment",
            Rejection::InvariantViolation { .. } => "invariant_violation",
            Rejection::Unavailable => "unavailable",
        }
    }

    /// Returns a human-readable message with details.
    pub fn as_message(&self) -> String {
        self.to_string()
    }

    /// Only invariant violations are fatal to the current transaction.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Rejection::InvariantViolation { .. })
    }
}

/// # Errors produced by the controller runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Machine did not reach Off within the grace period.
    #[error("shutdown timeout {grace:?} exceeded; machine still {state}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// State observed when the grace period ran out.
        state: MachineState,
    },

    /// OS signal handlers could not be installed.
    #[error("signal registration failed: {0}")]
    Signal(#[from] std::io::Error),
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
            RuntimeError::Signal(_) => "runtime_signal",
        }
    }

    /// Returns a human-readable message with details.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::GraceExceeded { grace, state } => {
                format!("grace exceeded after {grace:?}; state={state}")
            }
            RuntimeError::Signal(e) => format!("signal: {e}"),
        }
    }
}

/// # Malformed bootstrap configuration.
///
/// Every variant names the offending entry so the operator can fix the document.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Document is not valid JSON or does not match the expected shape.
    #[error("catalog parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Document could not be read.
    #[error("catalog read error: {0}")]
    Io(#[from] std::io::Error),

    /// Product id is empty.
    #[error("product #{index} has an empty id")]
    EmptyId {
        /// Position in the product list.
        index: usize,
    },

    /// Product id appears twice.
    #[error("duplicate product id '{id}'")]
    DuplicateId {
        /// The repeated id.
        id: String,
    },

    /// Price is negative, not finite, or too large.
    #[error("product '{id}' has invalid price {price}")]
    InvalidPrice {
        /// Product id.
        id: String,
        /// Price as written in the document.
        price: f64,
    },

    /// Tracked product without a usable count.
    #[error("tracked product '{id}' needs a non-negative inventory_count")]
    InvalidCount {
        /// Product id.
        id: String,
    },

    /// Negative restock threshold.
    #[error("product '{id}' has negative restock_threshold {threshold}")]
    InvalidThreshold {
        /// Product id.
        id: String,
        /// Threshold as written in the document.
        threshold: i64,
    },

    /// Contact prefers a channel it has no address for.
    #[error("contact '{name}' prefers {channel} but has no address for it")]
    MissingAddress {
        /// Contact name.
        name: String,
        /// Channel label.
        channel: &'static str,
    },
}

impl CatalogError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            CatalogError::Parse(_) => "catalog_parse",
            CatalogError::Io(_) => "catalog_io",
            CatalogError::EmptyId { .. } => "catalog_empty_id",
            CatalogError::DuplicateId { .. } => "catalog_duplicate_id",
            CatalogError::InvalidPrice { .. } => "catalog_invalid_price",
            CatalogError::InvalidCount { .. } => "catalog_invalid_count",
            CatalogError::InvalidThreshold { .. } => "catalog_invalid_threshold",
            CatalogError::MissingAddress { .. } => "catalog_missing_address",
        }
    }
}

/// # Broadcast transport failures.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Broker is unreachable.
    #[error("transport unavailable: {0}")]
    Unavailable(String),

    /// Snapshot could not be encoded.
    #[error("snapshot encoding failed: {0}")]
    Encode(String),
}

impl TransportError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            TransportError::Unavailable(_) => "transport_unavailable",
            TransportError::Encode(_) => "transport_encode",
        }
    }

    /// Encoding failures will not succeed on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TransportError::Unavailable(_))
    }
}

/// # Notification delivery failures.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// Channel endpoint could not be reached; may succeed later.
    #[error("delivery failed: {0}")]
    Failed(String),

    /// Endpoint refused the message permanently.
    #[error("delivery rejected: {0}")]
    Rejected(String),
}

impl DeliveryError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            DeliveryError::Failed(_) => "delivery_failed",
            DeliveryError::Rejected(_) => "delivery_rejected",
        }
    }

    /// Indicates whether another attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DeliveryError::Failed(_))
    }
}

/// The physical layer refused the dispense command.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("actuator: {0}")]
pub struct ActuatorError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_kinds() {
        assert_eq!(
            Rejection::OutOfStock {
                product_id: "soda".into()
            }
            .kind(),
            RejectionKind::OutOfStock
        );
        assert_eq!(
            Rejection::MaintenanceMode.kind(),
            RejectionKind::InvalidTransition
        );
        assert!(
            Rejection::InvariantViolation {
                detail: "x".into()
            }
            .is_fatal()
        );
        assert!(!Rejection::MaintenanceMode.is_fatal());
    }

    #[test]
    fn test_rejection_serializes_with_error_tag() {
        let rej = Rejection::invalid(MachineState::Idle, "maintenance_exit", "not in maintenance");
        let json = serde_json::to_value(&rej).unwrap();
        assert_eq!(json["error"], "invalid_transition");
        assert_eq!(json["reason"], "not in maintenance");
        assert_eq!(json["state"], "idle");
        assert_eq!(json["input"], "maintenance_exit");
    }

    #[test]
    fn test_retryable_errors() {
        assert!(TransportError::Unavailable("down".into()).is_retryable());
        assert!(!TransportError::Encode("bad".into()).is_retryable());
        assert!(DeliveryError::Failed("timeout".into()).is_retryable());
        assert!(!DeliveryError::Rejected("bounced".into()).is_retryable());
    }
}
