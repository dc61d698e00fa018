//! # Machine states and the closed transition graph.
//!
//! ```text
//!                 select               payment_confirmed
//!        ┌──────► Idle ───────► Selecting ───────────► Dispensing
//!        │         ▲ ▲            │  │  │                 │  │
//!        │         │ └─ timeout ──┘  │  │ reserve fails   │  │ dispense_error / watchdog
//!        │         │                 │  └──────► Fault ◄──┘  │ / invariant violation
//!        │         └──── dispense_confirmed ───────────────────┘
//!        │         ▲                             │  ▲
//!        │         └── reset (acknowledged) ─────┘  │
//!        │
//!        │   maintenance_enter: Idle | Selecting | Fault ──► Maintenance ──► Idle (maintenance_exit)
//!        │   shutdown: every live state ──► ShuttingDown ──► Off
//!        └── restart: Off ──► Idle
//! ```
//!
//! [`MachineState::can_transition_to`] is the single source of truth for edges;
//! the state machine refuses any hop not listed there.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Operating state of the vending machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MachineState {
    /// Ready for a selection.
    Idle,
    /// A product is selected; waiting for payment.
    Selecting,
    /// Payment captured; the actuator is dispensing.
    Dispensing,
    /// Dispense failed or internal inconsistency; needs acknowledgement and reset.
    Fault,
    /// Administrative maintenance; selections refused.
    Maintenance,
    /// Shutdown requested; completing any in-flight dispense.
    ShuttingDown,
    /// Stopped. Only `restart` is accepted.
    Off,
}

impl MachineState {
    /// Every state, in declaration order.
    pub const ALL: [MachineState; 7] = [
        MachineState::Idle,
        MachineState::Selecting,
        MachineState::Dispensing,
        MachineState::Fault,
        MachineState::Maintenance,
        MachineState::ShuttingDown,
        MachineState::Off,
    ];

    /// Returns the state label used in logs and snapshots.
    pub fn as_str(&self) -> &'static str {
        match self {
            MachineState::Idle => "idle",
            MachineState::Selecting => "selecting",
            MachineState::Dispensing => "dispensing",
            MachineState::Fault => "fault",
            MachineState::Maintenance => "maintenance",
            MachineState::ShuttingDown => "shutting_down",
            MachineState::Off => "off",
        }
    }

    /// `Off` is the only terminal state.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, MachineState::Off)
    }

    /// Whether `self → next` is an edge of the transition graph.
    pub fn can_transition_to(&self, next: MachineState) -> bool {
        use MachineState::*;
        matches!(
            (self, next),
            (Idle, Selecting | Maintenance | ShuttingDown)
                | (Selecting, Dispensing | Idle | Fault | Maintenance | ShuttingDown)
                | (Dispensing, Idle | Fault | ShuttingDown)
                | (Fault, Idle | Maintenance | ShuttingDown)
                | (Maintenance, Idle | ShuttingDown)
                | (ShuttingDown, Off)
                | (Off, Idle)
        )
    }
}

impl fmt::Display for MachineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
