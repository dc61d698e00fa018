//! Inventory and stock alerting.
//!
//! ## Contents
//! - [`InventoryStore`] authoritative per-product stock with reserve/commit/restock
//! - [`Alert`], [`AlertKind`] raised stock conditions
//! - [`AlertBook`] de-duplication of standing alerts
//!
//! The store does no I/O: raised alerts are returned in an [`Evaluation`] and
//! handed to the [`AlertRouter`](crate::AlertRouter) by the controller worker.

mod alert;
mod store;

pub use alert::{Alert, AlertBook, AlertKind};
pub use store::{Evaluation, InventoryLine, InventoryStore};
