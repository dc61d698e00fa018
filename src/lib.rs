//! # vmc
//!
//! **vmc** is a vending machine controller runtime for Rust.
//!
//! It serializes every physical event and administrative command through a single
//! state machine, meters inventory against restock thresholds, dispatches stock
//! alerts over pluggable notification channels, and publishes a live status snapshot
//! over a publish/subscribe transport.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!  ┌──────────────┐  ┌──────────────┐   ┌──────────────────┐
//!  │ admin layer  │  │ sensor/pay   │   │ payment window / │
//!  │  (commands)  │  │  (signals)   │   │ dispense watchdog│
//!  └──────┬───────┘  └──────┬───────┘   └────────┬─────────┘
//!         ▼                 ▼                    │
//!  ┌───────────────────────────────┐             │
//!  │ Gateway (state precheck,      │             │
//!  │  structured CommandResult)    │             │
//!  └──────────────┬────────────────┘             │
//!                 ▼                              ▼
//! ┌───────────────────────────────────────────────────────────────┐
//! │  ordered input queue (mpsc) ─► Worker ─► Machine::apply       │
//! │  (one input in flight; Machine owns state, transaction,       │
//! │   inventory and the deferred-command queue)                   │
//! └──────┬──────────────────┬─────────────────────┬───────────────┘
//!        ▼                  ▼                     ▼
//!  AlertRouter        Bus (events)         watch<StatusSnapshot>
//!  (worker/channel,   ─► SubscriberSet     ─► Broadcaster ─► Transport
//!   bounded retry)       (EventLog, ...)      (latest wins, retry)
//! ```
//!
//! ### Purchase lifecycle
//! ```text
//! Idle ──select──► Selecting ──payment_confirmed──► Dispensing ──dispense_confirmed──► Idle
//!                      │                                │
//!                      └─ payment timeout ─► Idle       ├─ dispense_error ─► Fault
//!                         (tx Failed)                   └─ watchdog ───────► Fault
//!
//! Fault ──fault_cleared, reset──► Idle      Idle ◄──maintenance_exit── Maintenance
//! any running state ──shutdown──► ShuttingDown ──► Off ──restart──► Idle
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                        |
//! |-------------------|--------------------------------------------------------------|-------------------------------------------|
//! | **State machine** | Closed transition graph, transactions, deferred commands.    | [`Machine`], [`MachineState`], [`Input`]  |
//! | **Inventory**     | Reserve / commit / release, threshold alerts.                | [`InventoryStore`], [`Alert`]             |
//! | **Gateway**       | Typed JSON commands and signals, synchronous verdicts.       | [`Gateway`], [`Command`], [`Signal`]      |
//! | **Alerts**        | Independent channels with bounded retry.                     | [`NotifyChannel`], [`AlertRouter`]        |
//! | **Broadcast**     | Latest-wins snapshot publishing.                             | [`Transport`], [`Broadcaster`]            |
//! | **Subscriber API**| Hook into runtime events (logging, dashboards, audit).       | [`Subscribe`], [`EventLog`]               |
//! | **Errors**        | Structured rejections and typed runtime errors.              | [`Rejection`], [`RuntimeError`]           |
//! | **Configuration** | Runtime knobs and validated bootstrap catalogue.            | [`Config`], [`Catalog`]                   |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use vmc::{Catalog, CommandResult, Config, MachineState, MemoryTransport, VmcBuilder};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let catalog = Catalog::from_json(r#"{
//!         "machine":  { "name": "Lobby", "serial_number": "VM-1", "location": "Hall" },
//!         "products": [ { "id": "soda", "name": "Soda", "price": 1.50, "inventory_count": 2 } ]
//!     }"#)?;
//!
//!     let broker = Arc::new(MemoryTransport::new());
//!     let vmc = VmcBuilder::new(Config::default())
//!         .with_catalog(catalog)
//!         .with_transport(broker.clone())
//!         .build();
//!
//!     let gw = vmc.gateway();
//!     assert!(gw.select("soda").await.is_accepted());
//!     assert!(gw.payment_confirmed(150).await.is_accepted());
//!     let done = gw.dispense_confirmed().await;
//!     assert_eq!(done, CommandResult::Accepted { state: MachineState::Idle, changed: true });
//!     assert_eq!(vmc.snapshot().inventory[0].count, Some(1));
//!
//!     vmc.shutdown().await?;
//!     assert_eq!(vmc.state(), MachineState::Off);
//!     Ok(())
//! }
//! ```
mod alerts;
mod broadcast;
mod catalog;
mod core;
mod error;
mod events;
mod gateway;
mod inventory;
mod machine;
mod policies;
mod subscribers;

// ---- Public re-exports ----

pub use alerts::{AlertRouter, LogChannel, Notification, NotifyChannel};
pub use broadcast::{Broadcaster, MemoryTransport, StatusSnapshot, Transport};
pub use catalog::{Catalog, ChannelKind, Contact, MachineInfo, Product, Recipient};
pub use crate::core::{Actuator, Config, NoopActuator, Vmc, VmcBuilder, wait_for_shutdown_signal};
pub use error::{
    ActuatorError, CatalogError, DeliveryError, Rejection, RejectionKind, RuntimeError,
    TransportError,
};
pub use events::{Bus, Event, EventKind};
pub use gateway::{Command, CommandResult, Gateway, Payload, Signal};
pub use inventory::{Alert, AlertBook, AlertKind, Evaluation, InventoryLine, InventoryStore};
pub use machine::{
    Admission, Effect, FaultRecord, Input, Machine, MachineState, Outcome, Step, Transaction,
    TxStatus, admission,
};
pub use policies::{JitterPolicy, RetryPolicy};
pub use subscribers::{EventLog, LogLine, Subscribe, SubscriberSet};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
