//! State machine governing machine lifecycle and purchase transactions.
//!
//! ## Contents
//! - [`MachineState`] the seven operating states and the closed edge table
//! - [`Transaction`], [`TxStatus`] one purchase attempt
//! - [`Input`], [`admission`] everything the machine reacts to and when it may
//! - [`Machine`] the pure state machine; [`Step`], [`Effect`], [`Outcome`] its output

mod effect;
mod fsm;
mod input;
mod state;
mod transaction;

pub use effect::{Effect, FaultRecord, Outcome, Step};
pub use fsm::Machine;
pub use input::{Admission, Input, admission};
pub use state::MachineState;
pub use transaction::{Transaction, TxStatus};
