//! # Command gateway.
//!
//! [`Gateway`] is the caller-facing handle for the admin layer and the sensor layer.
//! It holds no machine state of its own: administrative commands are prechecked against
//! the state the worker last committed, then every input is forwarded into the
//! controller's ordered queue and the caller waits for the worker's verdict.
//!
//! ```text
//! command ──► precheck(committed state) ── Err ──► Rejected (never queued)
//!               │
//!               └─ ok ─┐
//! signal ──────────────┴──► mpsc (ordered) ──► worker: Machine::apply ──► oneshot ──► CommandResult
//! ```
//!
//! ## Rules
//! - Physical signals are never prechecked: a sensor outcome may legitimately arrive
//!   while the step that made it valid is still interpreting its effects.
//! - The precheck can still be stale by the inputs queued ahead of a command; the
//!   worker's own admission check is authoritative.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tracing::debug;

use crate::broadcast::StatusSnapshot;
use crate::core::Request;
use crate::error::Rejection;
use crate::gateway::payload::{Command, CommandResult, Payload, Signal};
use crate::machine::{Input, MachineState, admission};

/// Cloneable handle that submits inputs to the controller.
#[derive(Clone)]
pub struct Gateway {
    inputs: mpsc::Sender<Request>,
    status: watch::Receiver<Arc<StatusSnapshot>>,
    committed: watch::Receiver<MachineState>,
}

impl Gateway {
    pub(crate) fn new(
        inputs: mpsc::Sender<Request>,
        status: watch::Receiver<Arc<StatusSnapshot>>,
        committed: watch::Receiver<MachineState>,
    ) -> Self {
        Self {
            inputs,
            status,
            committed,
        }
    }

    /// Latest status snapshot (the polling query).
    pub fn status(&self) -> Arc<StatusSnapshot> {
        Arc::clone(&self.status.borrow())
    }

    /// Validates and forwards an administrative command.
    pub async fn command(&self, command: Command) -> CommandResult {
        self.submit(command.into()).await
    }

    /// Validates and forwards a physical event.
    pub async fn signal(&self, signal: Signal) -> CommandResult {
        self.submit(signal.into()).await
    }

    /// Parses a JSON payload (`{"command": ...}` or `{"event": ...}`) and forwards it.
    pub async fn submit_json(&self, payload: &str) -> Result<CommandResult, serde_json::Error> {
        let payload: Payload = serde_json::from_str(payload)?;
        Ok(self.submit(payload.into()).await)
    }

    async fn submit(&self, input: Input) -> CommandResult {
        if input.is_command() {
            let state = *self.committed.borrow();
            if let Err(rejection) = admission(state, &input) {
                debug!(
                    input = input.name(),
                    product = input.product_id(),
                    %state,
                    reason = %rejection,
                    "precheck rejected"
                );
                return CommandResult::Rejected { rejection };
            }
        }

        let (reply, rx) = oneshot::channel();
        let request = Request {
            input,
            reply: Some(reply),
        };
        if self.inputs.send(request).await.is_err() {
            return unavailable();
        }
        rx.await.unwrap_or_else(|_| unavailable())
    }

    /// Customer selected a product.
    pub async fn select(&self, product_id: impl Into<String>) -> CommandResult {
        self.submit(Input::Select {
            product_id: product_id.into(),
        })
        .await
    }

    /// Payment layer authorised `amount` cents.
    pub async fn payment_confirmed(&self, amount: u64) -> CommandResult {
        self.submit(Input::PaymentConfirmed { amount }).await
    }

    /// Dispense sensor confirmed delivery.
    pub async fn dispense_confirmed(&self) -> CommandResult {
        self.submit(Input::DispenseConfirmed).await
    }

    /// Jam or sensor fault during dispense.
    pub async fn dispense_error(&self, code: impl Into<String>) -> CommandResult {
        self.submit(Input::DispenseError { code: code.into() }).await
    }

    /// Fault condition cleared on site.
    pub async fn fault_cleared(&self) -> CommandResult {
        self.submit(Input::FaultCleared).await
    }

    /// `restart` command.
    pub async fn restart(&self) -> CommandResult {
        self.submit(Input::Restart).await
    }

    /// `reset` command.
    pub async fn reset(&self) -> CommandResult {
        self.submit(Input::Reset).await
    }

    /// `shutdown` command.
    pub async fn shutdown(&self) -> CommandResult {
        self.submit(Input::Shutdown).await
    }

    /// `maintenance_enter` command.
    pub async fn maintenance_enter(&self) -> CommandResult {
        self.submit(Input::MaintenanceEnter).await
    }

    /// `maintenance_exit` command.
    pub async fn maintenance_exit(&self) -> CommandResult {
        self.submit(Input::MaintenanceExit).await
    }

    /// `restock(product_id, amount)` command.
    pub async fn restock(&self, product_id: impl Into<String>, amount: u32) -> CommandResult {
        self.submit(Input::Restock {
            product_id: product_id.into(),
            amount,
        })
        .await
    }
}

fn unavailable() -> CommandResult {
    CommandResult::Rejected {
        rejection: Rejection::Unavailable,
    }
}
