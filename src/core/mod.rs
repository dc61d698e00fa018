//! Runtime core: wiring, the serialized worker and lifecycle.
//!
//! The public API of this module is [`Config`], [`VmcBuilder`], [`Vmc`] and the
//! [`Actuator`] seam. Everything else is internal plumbing.
//!
//! ## Wiring
//! ```text
//!  admin layer   sensor layer                      deadline timers
//!       │             │                                  │
//!       └──► Gateway ─┴─(precheck)──► mpsc<Request> ◄────┘
//!                                         │
//!                                         ▼
//!                                      Worker ──► Machine::apply ──► Effects
//!                                         │
//!          ┌───────────────┬──────────────┼────────────────────┬──────────────┐
//!          ▼               ▼              ▼                    ▼              ▼
//!      Actuator   AlertRouter::dispatch   Bus.publish(Event)   Timers   watch<StatusSnapshot>
//!                         │                  │                                │
//!                  per-channel workers    listener ──► SubscriberSet    Broadcaster ──► Transport
//!                  (bounded retry)                      (EventLog, ...)  (latest wins)
//! ```
//!
//! Internal modules:
//! - `worker`: the single ordered loop around the state machine;
//! - `timers`: payment window and dispense watchdog;
//! - `builder`: assembles and spawns every task;
//! - `vmc`: the running handle and graceful shutdown;
//! - `shutdown`: cross-platform termination signals.

mod actuator;
mod builder;
mod config;
mod shutdown;
mod timers;
mod vmc;
mod worker;

pub use actuator::{Actuator, NoopActuator};
pub use builder::VmcBuilder;
pub use config::Config;
pub use shutdown::wait_for_shutdown_signal;
pub use self::vmc::Vmc;

pub(crate) use worker::Request;
