//! # Inputs to the state machine and their admission table.
//!
//! [`Input`] unifies physical sensor signals, administrative commands and internal
//! timer expiries. [`admission`] decides from the machine state alone whether an input
//! can be applied now, must wait for the in-flight dispense to finish, or is refused.
//! The command gateway uses the same table as a precheck; the state machine re-runs it
//! authoritatively inside the serialized worker.
//!
//! ## Deferred inputs
//! `restart`, `reset` and `maintenance_enter` arriving while Dispensing are queued
//! (FIFO) and applied once the transaction reaches a terminal status. `shutdown` is
//! never deferred.

use serde::Serialize;

use crate::error::Rejection;
use crate::machine::state::MachineState;

/// Everything the state machine reacts to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "input", rename_all = "snake_case")]
pub enum Input {
    // === Physical events ===
    /// Customer selected a product.
    Select {
        /// Catalogue id.
        product_id: String,
    },
    /// Payment layer authorised an amount (cents).
    PaymentConfirmed {
        /// Authorised amount in cents.
        amount: u64,
    },
    /// Dispense sensor confirmed delivery.
    DispenseConfirmed,
    /// Jam or sensor fault during dispense.
    DispenseError {
        /// Fault code reported by the sensor layer.
        code: String,
    },
    /// External signal: the fault condition has been cleared.
    FaultCleared,

    // === Administrative commands ===
    /// Reinitialise (Off → Idle, or a full cycle from a live state).
    Restart,
    /// Leave Fault after acknowledgement.
    Reset,
    /// Stop the machine.
    Shutdown,
    /// Enter maintenance.
    MaintenanceEnter,
    /// Leave maintenance.
    MaintenanceExit,
    /// Add stock to a product.
    Restock {
        /// Catalogue id.
        product_id: String,
        /// Units added.
        amount: u32,
    },

    // === Internal timers ===
    /// Payment window for transaction `tx` elapsed.
    PaymentTimeout {
        /// Transaction the timer was armed for.
        tx: u64,
    },
    /// Dispense watchdog for transaction `tx` elapsed.
    DispenseTimeout {
        /// Transaction the timer was armed for.
        tx: u64,
    },
}

impl Input {
    /// Returns the input label used in logs and rejections.
    pub fn name(&self) -> &'static str {
        match self {
            Input::Select { .. } => "select",
            Input::PaymentConfirmed { .. } => "payment_confirmed",
            Input::DispenseConfirmed => "dispense_confirmed",
            Input::DispenseError { .. } => "dispense_error",
            Input::FaultCleared => "fault_cleared",
            Input::Restart => "restart",
            Input::Reset => "reset",
            Input::Shutdown => "shutdown",
            Input::MaintenanceEnter => "maintenance_enter",
            Input::MaintenanceExit => "maintenance_exit",
            Input::Restock { .. } => "restock",
            Input::PaymentTimeout { .. } => "payment_timeout",
            Input::DispenseTimeout { .. } => "dispense_timeout",
        }
    }

    /// Administrative commands (as opposed to physical events and timers).
    pub fn is_command(&self) -> bool {
        matches!(
            self,
            Input::Restart
                | Input::Reset
                | Input::Shutdown
                | Input::MaintenanceEnter
                | Input::MaintenanceExit
                | Input::Restock { .. }
        )
    }

    /// Product the input concerns, if any.
    pub fn product_id(&self) -> Option<&str> {
        match self {
            Input::Select { product_id } | Input::Restock { product_id, .. } => Some(product_id),
            _ => None,
        }
    }
}

/// Decision of the admission table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    /// Apply now.
    Apply,
    /// Queue until the in-flight dispense resolves.
    Defer,
}

/// Decides, from the state alone, what happens to `input`.
pub fn admission(state: MachineState, input: &Input) -> Result<Admission, Rejection> {
    use Admission::*;
    use MachineState::*;

    let name = input.name();
    let refuse = |reason: &'static str| Err(Rejection::invalid(state, name, reason));

    match input {
        Input::Select { .. } => match state {
            Idle => Ok(Apply),
            Maintenance => Err(Rejection::MaintenanceMode),
            Selecting | Dispensing => refuse("a transaction is already active"),
            Fault => refuse("machine is faulted"),
            ShuttingDown => refuse("shutdown in progress"),
            Off => refuse("machine is off"),
        },
        Input::PaymentConfirmed { .. } => match state {
            Selecting => Ok(Apply),
            _ => refuse("no transaction awaiting payment"),
        },
        Input::DispenseConfirmed | Input::DispenseError { .. } => match state {
            Dispensing | ShuttingDown => Ok(Apply),
            _ => refuse("no dispense in progress"),
        },
        Input::FaultCleared => match state {
            Fault => Ok(Apply),
            _ => refuse("no fault to clear"),
        },
        Input::Reset => match state {
            Fault => Ok(Apply),
            Dispensing => Ok(Defer),
            _ => refuse("no fault to reset"),
        },
        Input::MaintenanceEnter => match state {
            Idle | Selecting | Fault => Ok(Apply),
            Dispensing => Ok(Defer),
            Maintenance => refuse("already in maintenance"),
            ShuttingDown => refuse("shutdown in progress"),
            Off => refuse("machine is off"),
        },
        Input::MaintenanceExit => match state {
            Maintenance => Ok(Apply),
            _ => refuse("not in maintenance"),
        },
        Input::Shutdown => match state {
            ShuttingDown => refuse("shutdown in progress"),
            Off => refuse("machine is off"),
            _ => Ok(Apply),
        },
        Input::Restart => match state {
            Dispensing => Ok(Defer),
            ShuttingDown => refuse("shutdown in progress"),
            _ => Ok(Apply),
        },
        Input::Restock { .. } => match state {
            ShuttingDown => refuse("shutdown in progress"),
            Off => refuse("machine is off"),
            _ => Ok(Apply),
        },
        Input::PaymentTimeout { .. } | Input::DispenseTimeout { .. } => Ok(Apply),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_only_from_idle() {
        let sel = Input::Select {
            product_id: "soda".into(),
        };
        for s in MachineState::ALL {
            let res = admission(s, &sel);
            match s {
                MachineState::Idle => assert_eq!(res, Ok(Admission::Apply)),
                MachineState::Maintenance => assert_eq!(res, Err(Rejection::MaintenanceMode)),
                _ => assert!(matches!(res, Err(Rejection::InvalidTransition { .. }))),
            }
        }
    }

    #[test]
    fn test_admin_commands_defer_while_dispensing() {
        for input in [Input::Restart, Input::Reset, Input::MaintenanceEnter] {
            assert_eq!(
                admission(MachineState::Dispensing, &input),
                Ok(Admission::Defer),
                "{}",
                input.name()
            );
        }
        assert_eq!(
            admission(MachineState::Dispensing, &Input::Shutdown),
            Ok(Admission::Apply)
        );
    }

    #[test]
    fn test_maintenance_exit_outside_maintenance_rejected() {
        let res = admission(MachineState::Idle, &Input::MaintenanceExit);
        assert!(matches!(
            res,
            Err(Rejection::InvalidTransition {
                state: MachineState::Idle,
                input: "maintenance_exit",
                ..
            })
        ));
    }

    #[test]
    fn test_off_accepts_only_restart_and_timers() {
        for input in [
            Input::Shutdown,
            Input::Reset,
            Input::MaintenanceEnter,
            Input::MaintenanceExit,
            Input::FaultCleared,
            Input::DispenseConfirmed,
            Input::Restock {
                product_id: "soda".into(),
                amount: 1,
            },
        ] {
            assert!(admission(MachineState::Off, &input).is_err(), "{}", input.name());
        }
        assert_eq!(
            admission(MachineState::Off, &Input::Restart),
            Ok(Admission::Apply)
        );
    }
}
