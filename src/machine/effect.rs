//! # Effects produced by one state-machine step.
//!
//! [`Machine::apply`](crate::machine::Machine::apply) performs no I/O. Everything the
//! outside world must do in response to a committed step is returned as a list of
//! [`Effect`]s, in the order they were generated, which the controller worker
//! interprets (timers, actuator, bus events, alert dispatch, snapshot).

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Rejection;
use crate::inventory::{Alert, AlertKind};
use crate::machine::input::Input;
use crate::machine::state::MachineState;
use crate::machine::transaction::Transaction;

/// Most recent fault.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FaultRecord {
    /// Fault code (`jam`, `watchdog`, `out_of_stock`, `invariant_violation`, ...).
    pub code: String,
    /// Transaction that was active when the fault occurred.
    pub tx: Option<u64>,
    /// When the fault occurred.
    pub raised_at: DateTime<Utc>,
    /// Whether `fault_cleared` has been received.
    pub acknowledged: bool,
}

/// One externally visible consequence of a step.
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    /// Machine moved along an edge of the transition graph.
    Transition {
        /// Previous state.
        from: MachineState,
        /// New state.
        to: MachineState,
    },
    /// Start the payment window for `tx`.
    ArmPaymentTimer {
        /// Transaction id.
        tx: u64,
    },
    /// Start the dispense watchdog for `tx`.
    ArmWatchdog {
        /// Transaction id.
        tx: u64,
    },
    /// Cancel every armed deadline timer.
    CancelTimers,
    /// Command the physical layer to dispense.
    Actuate {
        /// Transaction id.
        tx: u64,
        /// Product to dispense.
        product_id: String,
    },
    /// A tracked count changed.
    InventoryChanged {
        /// Product id.
        product_id: String,
        /// New count.
        count: Option<u32>,
    },
    /// New stock alert.
    AlertRaised(Alert),
    /// Standing alerts cleared by a restock above threshold.
    AlertCleared {
        /// Product id.
        product_id: String,
        /// Cleared kinds.
        kinds: Vec<AlertKind>,
    },
    /// Transaction reached a terminal status.
    TransactionClosed(Transaction),
    /// Machine entered Fault (or recorded a fault while shutting down).
    FaultRaised(FaultRecord),
    /// `fault_cleared` was received.
    FaultAcknowledged,
    /// Internal consistency failure.
    InvariantViolated {
        /// What was inconsistent.
        detail: String,
    },
    /// A previously deferred command was applied or refused.
    DeferredResolved {
        /// The queued input.
        input: Input,
        /// Why it was refused, if it was.
        rejection: Option<Rejection>,
    },
}

/// How the machine disposed of an input.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    /// Applied now (possibly without any change).
    Applied,
    /// Queued until the in-flight dispense resolves.
    Deferred,
    /// Applied, but the machine was forced to Fault.
    Faulted(Rejection),
}

/// Result of applying one input.
#[derive(Clone, Debug, PartialEq)]
pub struct Step {
    /// Effects in generation order.
    pub effects: Vec<Effect>,
    /// Disposition of the input.
    pub outcome: Outcome,
}

impl Default for Step {
    fn default() -> Self {
        Self {
            effects: Vec::new(),
            outcome: Outcome::Applied,
        }
    }
}

impl Step {
    pub(crate) fn deferred() -> Self {
        Self {
            effects: Vec::new(),
            outcome: Outcome::Deferred,
        }
    }

    pub(crate) fn push(&mut self, effect: Effect) {
        self.effects.push(effect);
    }

    /// Whether the step changed anything observable.
    pub fn changed(&self) -> bool {
        !self.effects.is_empty()
    }

    /// State changes, in order.
    pub fn transitions(&self) -> impl Iterator<Item = (MachineState, MachineState)> + '_ {
        self.effects.iter().filter_map(|e| match e {
            Effect::Transition { from, to } => Some((*from, *to)),
            _ => None,
        })
    }
}
