//! # Inbound payloads and the structured result returned to callers.
//!
//! ```json
//! {"command": "restock", "product_id": "soda", "amount": 12}
//! {"command": "maintenance_exit"}
//! {"event": "select", "product_id": "soda"}
//! {"event": "dispense_error", "code": "jam"}
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Rejection;
use crate::machine::{Input, MachineState, Outcome};

/// Administrative commands issued by the admin layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    /// Reinitialise the machine.
    Restart,
    /// Leave Fault after acknowledgement.
    Reset,
    /// Stop the machine.
    Shutdown,
    /// Enter maintenance.
    MaintenanceEnter,
    /// Leave maintenance.
    MaintenanceExit,
    /// Add stock.
    Restock {
        /// Product id.
        product_id: String,
        /// Units added.
        amount: u32,
    },
}

impl From<Command> for Input {
    fn from(c: Command) -> Self {
        match c {
            Command::Restart => Input::Restart,
            Command::Reset => Input::Reset,
            Command::Shutdown => Input::Shutdown,
            Command::MaintenanceEnter => Input::MaintenanceEnter,
            Command::MaintenanceExit => Input::MaintenanceExit,
            Command::Restock { product_id, amount } => Input::Restock { product_id, amount },
        }
    }
}

/// Physical events emitted by the sensor and payment layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Signal {
    /// Customer selected a product.
    Select {
        /// Product id.
        product_id: String,
    },
    /// Payment authorised.
    PaymentConfirmed {
        /// Authorised amount in cents.
        amount: u64,
    },
    /// Delivery confirmed by the dispense sensor.
    DispenseConfirmed,
    /// Jam or sensor fault.
    DispenseError {
        /// Sensor fault code.
        code: String,
    },
    /// The fault condition was cleared on site.
    FaultCleared,
}

impl From<Signal> for Input {
    fn from(s: Signal) -> Self {
        match s {
            Signal::Select { product_id } => Input::Select { product_id },
            Signal::PaymentConfirmed { amount } => Input::PaymentConfirmed { amount },
            Signal::DispenseConfirmed => Input::DispenseConfirmed,
            Signal::DispenseError { code } => Input::DispenseError { code },
            Signal::FaultCleared => Input::FaultCleared,
        }
    }
}

/// Either kind of inbound payload.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    /// `{"command": ...}`
    Command(Command),
    /// `{"event": ...}`
    Signal(Signal),
}

impl From<Payload> for Input {
    fn from(p: Payload) -> Self {
        match p {
            Payload::Command(c) => c.into(),
            Payload::Signal(s) => s.into(),
        }
    }
}

/// Structured acceptance or rejection, returned synchronously to the caller.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CommandResult {
    /// Applied. `changed` is false for accepted no-ops (e.g. `restock` of 0).
    Accepted {
        /// State after applying.
        state: MachineState,
        /// Whether anything observable changed.
        changed: bool,
    },
    /// Queued until the in-flight dispense resolves.
    Deferred {
        /// State at arrival.
        state: MachineState,
    },
    /// Applied, but the machine was forced to Fault.
    Faulted {
        /// State after applying.
        state: MachineState,
        /// What went wrong.
        rejection: Rejection,
    },
    /// Refused; nothing changed.
    Rejected {
        /// Why.
        rejection: Rejection,
    },
}

impl CommandResult {
    pub(crate) fn from_outcome(outcome: Outcome, changed: bool, state: MachineState) -> Self {
        match outcome {
            Outcome::Applied => CommandResult::Accepted { state, changed },
            Outcome::Deferred => CommandResult::Deferred { state },
            Outcome::Faulted(rejection) => CommandResult::Faulted { state, rejection },
        }
    }

    /// Applied now (changed or not).
    pub fn is_accepted(&self) -> bool {
        matches!(self, CommandResult::Accepted { .. })
    }

    /// Rejection carried by a `Rejected` or `Faulted` result.
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            CommandResult::Rejected { rejection } | CommandResult::Faulted { rejection, .. } => {
                Some(rejection)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_payloads() {
        let p: Payload =
            serde_json::from_str(r#"{"command":"restock","product_id":"soda","amount":3}"#)
                .unwrap();
        assert_eq!(
            Input::from(p),
            Input::Restock {
                product_id: "soda".into(),
                amount: 3
            }
        );

        let p: Payload = serde_json::from_str(r#"{"event":"dispense_error","code":"jam"}"#).unwrap();
        assert_eq!(Input::from(p), Input::DispenseError { code: "jam".into() });

        assert!(serde_json::from_str::<Payload>(r#"{"command":"self_destruct"}"#).is_err());
        assert!(serde_json::from_str::<Payload>(r#"{"command":"restock","amount":-1}"#).is_err());
    }

    #[test]
    fn test_result_wire_shape() {
        let r = CommandResult::Rejected {
            rejection: Rejection::MaintenanceMode,
        };
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["result"], "rejected");
        assert_eq!(v["rejection"]["error"], "maintenance_mode");

        let v = serde_json::to_value(CommandResult::Accepted {
            state: MachineState::Idle,
            changed: false,
        })
        .unwrap();
        assert_eq!(v["result"], "accepted");
        assert_eq!(v["changed"], false);
    }
}
