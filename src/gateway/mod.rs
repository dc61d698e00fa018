//! Command gateway: inbound payloads, state precheck, structured results.
//!
//! ## Contents
//! - [`Command`], [`Signal`], [`Payload`] typed inbound payloads (serde-tagged JSON)
//! - [`CommandResult`] structured acceptance/rejection returned to the caller
//! - [`Gateway`] cloneable handle forwarding into the controller's ordered queue

mod handle;
mod payload;

pub use handle::Gateway;
pub use payload::{Command, CommandResult, Payload, Signal};
