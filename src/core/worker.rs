//! # The controller worker: the single serialization point.
//!
//! Every machine-affecting input (sensor signals, payment confirmations, admin
//! commands, timer expiries) reaches the [`Machine`] through one ordered mpsc queue
//! drained by exactly one task. At most one step is in flight at any instant.
//!
//! ```text
//! Gateway / Timers ──► mpsc<Request> ──► Worker::handle
//!                                          ├─► Machine::apply(input, now)
//!                                          ├─► watch::send_replace(MachineState)     (committed state)
//!                                          ├─► interpret effects in order:
//!                                          │     timers · actuator · AlertRouter::dispatch · Bus events
//!                                          ├─► watch::send_replace(StatusSnapshot)   (once per committed step)
//!                                          └─► oneshot reply: CommandResult
//! ```
//!
//! ## Rules
//! - Nothing here waits on notification delivery or snapshot publishing; both
//!   run on their own tasks.
//! - The committed state is published as soon as `apply` returns, before any effect
//!   is awaited, so gateway prechecks never see a state older than the machine's.
//! - The snapshot is captured after every effect of the step has been interpreted, so
//!   the broadcast never shows a state the machine has not committed.
//! - An immediate actuator failure is applied as `dispense_error("actuator: ...")`
//!   within the same step.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::alerts::AlertRouter;
use crate::broadcast::StatusSnapshot;
use crate::catalog::MachineInfo;
use crate::core::actuator::Actuator;
use crate::core::timers::Timers;
use crate::error::Rejection;
use crate::events::{Bus, Event, EventKind};
use crate::gateway::CommandResult;
use crate::machine::{Effect, Input, Machine, MachineState, Outcome};

/// One queued input and, for caller-issued inputs, where to send the verdict.
pub(crate) struct Request {
    pub(crate) input: Input,
    pub(crate) reply: Option<oneshot::Sender<CommandResult>>,
}

pub(crate) struct Worker {
    pub(crate) machine: Machine,
    pub(crate) info: MachineInfo,
    pub(crate) inputs: mpsc::Receiver<Request>,
    pub(crate) timers: Timers,
    pub(crate) actuator: Arc<dyn Actuator>,
    pub(crate) router: AlertRouter,
    pub(crate) status: watch::Sender<Arc<StatusSnapshot>>,
    pub(crate) committed: watch::Sender<MachineState>,
    pub(crate) bus: Bus,
    pub(crate) token: CancellationToken,
}

impl Worker {
    /// Drains the queue until cancelled, then hands the router back for shutdown.
    ///
    /// Inputs still queued at cancellation are answered with `Unavailable`.
    pub(crate) async fn run(mut self) -> AlertRouter {
        let mut seq = self.status.borrow().seq;
        loop {
            let req = tokio::select! {
                biased;
                _ = self.token.cancelled() => break,
                req = self.inputs.recv() => match req {
                    Some(req) => req,
                    None => break,
                },
            };
            let name = req.input.name();
            let (result, commit) = self.process(req.input).await;
            if commit {
                seq += 1;
                self.publish_snapshot(seq);
            }
            if let Some(reply) = req.reply {
                if reply.send(result).is_err() {
                    debug!(input = name, "caller went away before the reply");
                }
            }
        }

        self.timers.cancel_all();
        self.inputs.close();
        while let Ok(req) = self.inputs.try_recv() {
            if let Some(reply) = req.reply {
                let _ = reply.send(CommandResult::Rejected {
                    rejection: Rejection::Unavailable,
                });
            }
        }
        debug!(state = %self.machine.state(), "controller worker stopped");
        self.router
    }

    /// Applies one input. Returns the verdict and whether a snapshot is due.
    async fn process(&mut self, input: Input) -> (CommandResult, bool) {
        let name = input.name();
        let is_command = input.is_command();
        let state = self.machine.state();

        let step = match self.machine.apply(input, Utc::now()) {
            Ok(step) => step,
            Err(rejection) => {
                warn!(input = name, %state, reason = %rejection, "input rejected");
                if is_command {
                    self.bus.publish(
                        Event::new(EventKind::CommandRejected)
                            .with_input(name)
                            .with_state(state)
                            .with_reason(rejection.to_string()),
                    );
                }
                return (CommandResult::Rejected { rejection }, false);
            }
        };

        self.committed.send_replace(self.machine.state());
        let changed = step.changed();
        let outcome = step.outcome;
        match &outcome {
            Outcome::Deferred => {
                info!(input = name, %state, "command deferred until dispense resolves");
                self.bus.publish(
                    Event::new(EventKind::CommandDeferred)
                        .with_input(name)
                        .with_state(state),
                );
            }
            Outcome::Applied if is_command => {
                self.bus.publish(
                    Event::new(EventKind::CommandApplied)
                        .with_input(name)
                        .with_state(state),
                );
            }
            Outcome::Faulted(rejection) => {
                error!(input = name, %state, reason = %rejection, "input forced the machine to fault");
            }
            Outcome::Applied => {}
        }

        let mut effects = step.effects;
        while let Some(code) = self.interpret(effects).await {
            effects = match self.machine.apply(Input::DispenseError { code }, Utc::now()) {
                Ok(next) => {
                    self.committed.send_replace(self.machine.state());
                    next.effects
                }
                Err(rejection) => {
                    error!(reason = %rejection, "actuator failure could not be applied");
                    break;
                }
            };
        }

        let commit = changed || matches!(outcome, Outcome::Deferred);
        let result = CommandResult::from_outcome(outcome, changed, self.machine.state());
        (result, commit)
    }

    /// Interprets effects in generation order.
    ///
    /// Returns the failure code if the actuator refused a dispense command.
    async fn interpret(&mut self, effects: Vec<Effect>) -> Option<String> {
        let closed = effects.iter().find_map(|e| match e {
            Effect::TransactionClosed(t) => Some(t.id),
            _ => None,
        });
        let current_tx = self.machine.active().map(|t| t.id).or(closed);
        let mut actuator_failure = None;

        for effect in effects {
            match effect {
                Effect::Transition { from, to } => {
                    info!(%from, %to, tx = ?current_tx, "state changed");
                    let mut ev = Event::new(EventKind::StateChanged)
                        .with_from(from)
                        .with_state(to);
                    if let Some(tx) = current_tx {
                        ev = ev.with_tx(tx);
                    }
                    self.bus.publish(ev);
                }
                Effect::ArmPaymentTimer { tx } => self.timers.arm_payment(tx),
                Effect::ArmWatchdog { tx } => self.timers.arm_watchdog(tx),
                Effect::CancelTimers => self.timers.cancel_all(),
                Effect::Actuate { tx, product_id } => {
                    if let Err(e) = self.actuator.actuate_dispense(&product_id).await {
                        warn!(tx, product = %product_id, error = %e, "actuator refused dispense");
                        actuator_failure = Some(e.to_string());
                    }
                }
                Effect::InventoryChanged { product_id, count } => {
                    debug!(product = %product_id, ?count, "inventory changed");
                    self.bus.publish(
                        Event::new(EventKind::InventoryChanged)
                            .with_product(product_id.as_str())
                            .with_count(count),
                    );
                }
                Effect::AlertRaised(alert) => {
                    warn!(product = %alert.product_id, kind = %alert.kind, count = alert.count, "stock alert raised");
                    self.bus.publish(
                        Event::new(EventKind::AlertRaised)
                            .with_product(alert.product_id.as_str())
                            .with_alert(alert.kind)
                            .with_count(Some(alert.count)),
                    );
                    self.router.dispatch(&alert);
                }
                Effect::AlertCleared { product_id, kinds } => {
                    for kind in kinds {
                        info!(product = %product_id, %kind, "stock alert cleared");
                        self.bus.publish(
                            Event::new(EventKind::AlertCleared)
                                .with_product(product_id.as_str())
                                .with_alert(kind),
                        );
                    }
                }
                Effect::TransactionClosed(t) => {
                    info!(tx = t.id, product = %t.selected_product_id, status = ?t.status, refund_due = t.refund_due, "transaction closed");
                    self.bus
                        .publish(Event::new(EventKind::TransactionClosed).with_transaction(t));
                }
                Effect::FaultRaised(fault) => {
                    warn!(code = %fault.code, tx = ?fault.tx, state = %self.machine.state(), "fault raised");
                    let mut ev = Event::new(EventKind::FaultRaised)
                        .with_state(self.machine.state())
                        .with_reason(fault.code.as_str());
                    if let Some(tx) = fault.tx {
                        ev = ev.with_tx(tx);
                    }
                    self.bus.publish(ev);
                }
                Effect::FaultAcknowledged => {
                    info!("fault acknowledged");
                    self.bus.publish(Event::new(EventKind::FaultAcknowledged));
                }
                Effect::InvariantViolated { detail } => {
                    error!(%detail, "invariant violated");
                    self.bus
                        .publish(Event::new(EventKind::InvariantViolated).with_reason(detail));
                }
                Effect::DeferredResolved { input, rejection } => match rejection {
                    None => {
                        info!(input = input.name(), "deferred command applied");
                        self.bus.publish(
                            Event::new(EventKind::CommandApplied)
                                .with_input(input.name())
                                .with_state(self.machine.state()),
                        );
                    }
                    Some(rejection) => {
                        warn!(input = input.name(), reason = %rejection, "deferred command rejected");
                        self.bus.publish(
                            Event::new(EventKind::CommandRejected)
                                .with_input(input.name())
                                .with_reason(rejection.to_string()),
                        );
                    }
                },
            }
        }
        actuator_failure
    }

    fn publish_snapshot(&self, seq: u64) {
        let snap = StatusSnapshot::capture(seq, &self.info, &self.machine, Utc::now());
        self.status.send_replace(Arc::new(snap));
    }
}
