//! # The vending state machine.
//!
//! [`Machine`] owns the machine state, the single active [`Transaction`], the
//! [`InventoryStore`] and the deferred-command queue. It is a pure value: it is
//! driven by [`Machine::apply`] from exactly one worker, so at most one input is in
//! flight at any instant and no locking is needed.
//!
//! ## Flow of one input
//! ```text
//! apply(input)
//!   ├─► admission(state, input) ── Err ──► rejection (nothing changed)
//!   │         │
//!   │         ├─ Defer ──► queued FIFO, Outcome::Deferred
//!   │         └─ Apply
//!   ├─► handler: validates first, then mutates and records Effects
//!   └─► drain_deferred: once no dispense is in flight, queued commands run in order
//! ```
//!
//! ## Rules
//! - A handler that returns `Err` has not mutated anything.
//! - Every state change goes through `move_to`, which refuses edges not in
//!   [`MachineState::can_transition_to`].
//! - Timer inputs carry the transaction id they were armed for; a mismatch is a
//!   stale timer and produces an empty step.
//! - An impossible commit forces Fault and is reported as `Outcome::Faulted`.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use tracing::{debug, error, warn};

use crate::error::Rejection;
use crate::inventory::{Evaluation, InventoryStore};
use crate::machine::effect::{Effect, FaultRecord, Outcome, Step};
use crate::machine::input::{Admission, Input, admission};
use crate::machine::state::MachineState;
use crate::machine::transaction::{Transaction, TxStatus};

/// Vending machine state, transaction and inventory.
#[derive(Clone, Debug)]
pub struct Machine {
    state: MachineState,
    active: Option<Transaction>,
    inventory: InventoryStore,
    last_fault: Option<FaultRecord>,
    deferred: VecDeque<Input>,
    next_tx: u64,
}

impl Machine {
    /// Creates an Idle machine over the given inventory.
    pub fn new(inventory: InventoryStore) -> Self {
        Self {
            state: MachineState::Idle,
            active: None,
            inventory,
            last_fault: None,
            deferred: VecDeque::new(),
            next_tx: 1,
        }
    }

    /// Current state.
    pub fn state(&self) -> MachineState {
        self.state
    }

    /// Active transaction, if any.
    pub fn active(&self) -> Option<&Transaction> {
        self.active.as_ref()
    }

    /// Inventory.
    pub fn inventory(&self) -> &InventoryStore {
        &self.inventory
    }

    /// Most recent fault since the last restart.
    pub fn last_fault(&self) -> Option<&FaultRecord> {
        self.last_fault.as_ref()
    }

    /// Commands waiting for the in-flight dispense, in arrival order.
    pub fn deferred(&self) -> impl Iterator<Item = &Input> {
        self.deferred.iter()
    }

    /// Applies one input.
    ///
    /// Returns the effects to interpret, or the reason the input was refused.
    pub fn apply(&mut self, input: Input, now: DateTime<Utc>) -> Result<Step, Rejection> {
        if admission(self.state, &input)? == Admission::Defer {
            debug!(input = input.name(), state = %self.state, "deferred until dispense resolves");
            self.deferred.push_back(input);
            return Ok(Step::deferred());
        }

        let mut step = Step::default();
        self.dispatch(input, now, &mut step)?;
        self.drain_deferred(now, &mut step);
        Ok(step)
    }

    fn dispatch(&mut self, input: Input, now: DateTime<Utc>, step: &mut Step) -> Result<(), Rejection> {
        match input {
            Input::Select { product_id } => self.select(&product_id, now, step),
            Input::PaymentConfirmed { amount } => self.payment_confirmed(amount, now, step),
            Input::DispenseConfirmed => self.dispense_confirmed(now, step),
            Input::DispenseError { code } => {
                let (tx, _) = self.dispensing_tx("dispense_error")?;
                self.fail_dispense(tx, &code, now, step);
                Ok(())
            }
            Input::FaultCleared => {
                if let Some(fault) = self.last_fault.as_mut().filter(|f| !f.acknowledged) {
                    fault.acknowledged = true;
                    step.push(Effect::FaultAcknowledged);
                }
                Ok(())
            }
            Input::Reset => {
                if self.last_fault.as_ref().is_some_and(|f| !f.acknowledged) {
                    return Err(Rejection::invalid(self.state, "reset", "fault not acknowledged"));
                }
                self.move_to(MachineState::Idle, step);
                Ok(())
            }
            Input::MaintenanceEnter => {
                self.close_active(TxStatus::Failed, now, step);
                self.move_to(MachineState::Maintenance, step);
                Ok(())
            }
            Input::MaintenanceExit => {
                self.move_to(MachineState::Idle, step);
                Ok(())
            }
            Input::Shutdown => {
                self.shutdown(now, step);
                Ok(())
            }
            Input::Restart => {
                self.restart(now, step);
                Ok(())
            }
            Input::Restock { product_id, amount } => {
                let eval = self.inventory.restock(&product_id, amount, now)?;
                record_evaluation(&product_id, eval, step);
                Ok(())
            }
            Input::PaymentTimeout { tx } => {
                let live = self.state == MachineState::Selecting
                    && self
                        .active
                        .as_ref()
                        .is_some_and(|t| t.id == tx && t.status == TxStatus::Pending);
                if live {
                    self.close_active(TxStatus::Failed, now, step);
                    self.move_to(MachineState::Idle, step);
                } else {
                    debug!(tx, "stale payment timer");
                }
                Ok(())
            }
            Input::DispenseTimeout { tx } => {
                match self.dispensing_tx("dispense_timeout") {
                    Ok((active, _)) if active == tx => self.fail_dispense(tx, "watchdog", now, step),
                    _ => debug!(tx, "stale dispense watchdog"),
                }
                Ok(())
            }
        }
    }

    fn select(&mut self, product_id: &str, now: DateTime<Utc>, step: &mut Step) -> Result<(), Rejection> {
        self.inventory.check(product_id)?;
        let price = self.inventory.get(product_id).map_or(0, |p| p.unit_price);

        let tx = Transaction::open(self.next_tx, product_id, price, now);
        self.next_tx += 1;
        let id = tx.id;
        self.active = Some(tx);
        self.move_to(MachineState::Selecting, step);
        step.push(Effect::ArmPaymentTimer { tx: id });
        Ok(())
    }

    fn payment_confirmed(&mut self, amount: u64, now: DateTime<Utc>, step: &mut Step) -> Result<(), Rejection> {
        let Some((tx, product_id)) = self
            .active
            .as_ref()
            .map(|t| (t.id, t.selected_product_id.clone()))
        else {
            self.violate("payment confirmed without an active transaction".into(), now, step);
            return Ok(());
        };
        let Some(price) = self.inventory.get(&product_id).map(|p| p.unit_price) else {
            self.violate(format!("selected product '{product_id}' left the catalogue"), now, step);
            return Ok(());
        };
        if amount < price {
            return Err(Rejection::InsufficientPayment {
                required: price,
                tendered: amount,
            });
        }

        if let Err(rejection) = self.inventory.reserve(&product_id) {
            warn!(tx, product = %product_id, "reservation failed after payment");
            self.mark_active(amount, TxStatus::PaymentConfirmed);
            self.close_active(TxStatus::Refunded, now, step);
            self.raise_fault(rejection.as_label(), Some(tx), now, step);
            step.outcome = Outcome::Faulted(rejection);
            return Ok(());
        }

        self.mark_active(amount, TxStatus::Dispensing);
        step.push(Effect::CancelTimers);
        self.move_to(MachineState::Dispensing, step);
        step.push(Effect::ArmWatchdog { tx });
        step.push(Effect::Actuate { tx, product_id });
        Ok(())
    }

    fn dispense_confirmed(&mut self, now: DateTime<Utc>, step: &mut Step) -> Result<(), Rejection> {
        let (_, product_id) = self.dispensing_tx("dispense_confirmed")?;

        match self.inventory.commit(&product_id, now) {
            Ok(eval) => {
                record_evaluation(&product_id, eval, step);
                self.close_active(TxStatus::Completed, now, step);
                self.finish_dispense(step);
            }
            Err(Rejection::InvariantViolation { detail }) => self.violate(detail, now, step),
            Err(other) => self.violate(other.as_message(), now, step),
        }
        Ok(())
    }

    fn shutdown(&mut self, now: DateTime<Utc>, step: &mut Step) {
        for input in self.deferred.drain(..) {
            let rejection = Rejection::invalid(self.state, input.name(), "superseded by shutdown");
            step.push(Effect::DeferredResolved {
                input,
                rejection: Some(rejection),
            });
        }

        if self.state == MachineState::Dispensing {
            // The watchdog stays armed: the dispense must still resolve before Off.
            self.move_to(MachineState::ShuttingDown, step);
            return;
        }
        self.close_active(TxStatus::Failed, now, step);
        self.move_to(MachineState::ShuttingDown, step);
        self.move_to(MachineState::Off, step);
    }

    fn restart(&mut self, now: DateTime<Utc>, step: &mut Step) {
        if self.state != MachineState::Off {
            self.close_active(TxStatus::Failed, now, step);
            self.move_to(MachineState::ShuttingDown, step);
            self.move_to(MachineState::Off, step);
        }
        self.move_to(MachineState::Idle, step);
        self.last_fault = None;
        self.deferred.clear();
    }

    fn drain_deferred(&mut self, now: DateTime<Utc>, step: &mut Step) {
        while self.active.is_none() && self.state != MachineState::Dispensing {
            let Some(input) = self.deferred.pop_front() else {
                break;
            };
            let rejection = match admission(self.state, &input) {
                Ok(Admission::Apply) => {
                    let mut inner = Step::default();
                    match self.dispatch(input.clone(), now, &mut inner) {
                        Ok(()) => {
                            step.effects.extend(inner.effects);
                            None
                        }
                        Err(rejection) => Some(rejection),
                    }
                }
                Ok(Admission::Defer) => {
                    self.deferred.push_front(input);
                    break;
                }
                Err(rejection) => Some(rejection),
            };
            step.push(Effect::DeferredResolved { input, rejection });
        }
    }

    fn dispensing_tx(&self, input: &'static str) -> Result<(u64, String), Rejection> {
        match &self.active {
            Some(tx) if tx.status == TxStatus::Dispensing => Ok((tx.id, tx.selected_product_id.clone())),
            _ => Err(Rejection::invalid(self.state, input, "no dispense in progress")),
        }
    }

    fn mark_active(&mut self, amount: u64, status: TxStatus) {
        if let Some(tx) = self.active.as_mut() {
            tx.pay(amount, status);
        }
    }

    fn fail_dispense(&mut self, tx: u64, code: &str, now: DateTime<Utc>, step: &mut Step) {
        warn!(tx, code, state = %self.state, "dispense failed");
        self.close_active(TxStatus::Failed, now, step);
        self.raise_fault(code, Some(tx), now, step);
    }

    /// Dispensing → Idle, or ShuttingDown → Off once the last dispense resolved.
    fn finish_dispense(&mut self, step: &mut Step) {
        let next = if self.state == MachineState::ShuttingDown {
            MachineState::Off
        } else {
            MachineState::Idle
        };
        self.move_to(next, step);
    }

    fn close_active(&mut self, status: TxStatus, now: DateTime<Utc>, step: &mut Step) {
        let Some(tx) = self.active.take() else {
            return;
        };
        self.inventory.release(&tx.selected_product_id);
        step.push(Effect::CancelTimers);
        step.push(Effect::TransactionClosed(tx.close(status, now)));
    }

    fn raise_fault(&mut self, code: &str, tx: Option<u64>, now: DateTime<Utc>, step: &mut Step) {
        let record = FaultRecord {
            code: code.to_owned(),
            tx,
            raised_at: now,
            acknowledged: false,
        };
        self.last_fault = Some(record.clone());
        if self.state == MachineState::ShuttingDown {
            self.move_to(MachineState::Off, step);
        } else {
            self.move_to(MachineState::Fault, step);
        }
        step.push(Effect::FaultRaised(record));
    }

    fn violate(&mut self, detail: String, now: DateTime<Utc>, step: &mut Step) {
        error!(state = %self.state, %detail, "invariant violated; forcing fault");
        step.push(Effect::InvariantViolated {
            detail: detail.clone(),
        });
        let tx = self.active.as_ref().map(|t| t.id);
        self.close_active(TxStatus::Failed, now, step);
        self.raise_fault("invariant_violation", tx, now, step);
        step.outcome = Outcome::Faulted(Rejection::InvariantViolation { detail });
    }

    fn move_to(&mut self, to: MachineState, step: &mut Step) {
        let from = self.state;
        if !from.can_transition_to(to) {
            error!(%from, %to, "refused illegal transition");
            step.push(Effect::InvariantViolated {
                detail: format!("illegal transition {from} -> {to}"),
            });
            return;
        }
        self.state = to;
        step.push(Effect::Transition { from, to });
    }
}

fn record_evaluation(product_id: &str, eval: Evaluation, step: &mut Step) {
    if eval.changed {
        step.push(Effect::InventoryChanged {
            product_id: product_id.to_owned(),
            count: eval.count,
        });
    }
    for alert in eval.raised {
        step.push(Effect::AlertRaised(alert));
    }
    if !eval.cleared.is_empty() {
        step.push(Effect::AlertCleared {
            product_id: product_id.to_owned(),
            kinds: eval.cleared,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Product;
    use crate::inventory::AlertKind;

    fn machine() -> Machine {
        Machine::new(InventoryStore::new([
            Product::tracked("soda", "Soda", 150, 1, 0),
            Product::tracked("chips", "Chips", 100, 5, 2),
            Product::untracked("water", "Water", 100),
        ]))
    }

    fn apply(m: &mut Machine, input: Input) -> Step {
        m.apply(input, Utc::now()).unwrap()
    }

    fn select(id: &str) -> Input {
        Input::Select {
            product_id: id.into(),
        }
    }

    fn pay(amount: u64) -> Input {
        Input::PaymentConfirmed { amount }
    }

    fn closed(step: &Step) -> Vec<&Transaction> {
        step.effects
            .iter()
            .filter_map(|e| match e {
                Effect::TransactionClosed(tx) => Some(tx),
                _ => None,
            })
            .collect()
    }

    fn dispensing(m: &mut Machine, id: &str) {
        apply(m, select(id));
        apply(m, pay(500));
        assert_eq!(m.state(), MachineState::Dispensing);
    }

    #[test]
    fn test_last_unit_completes_and_raises_out_of_stock() {
        let mut m = machine();
        let s = apply(&mut m, select("soda"));
        assert_eq!(m.state(), MachineState::Selecting);
        assert!(s.effects.contains(&Effect::ArmPaymentTimer { tx: 1 }));

        let s = apply(&mut m, pay(150));
        assert!(s.effects.contains(&Effect::Actuate {
            tx: 1,
            product_id: "soda".into()
        }));
        assert_eq!(m.inventory().reserved(), Some("soda"));

        let s = apply(&mut m, Input::DispenseConfirmed);
        assert_eq!(m.state(), MachineState::Idle);
        assert_eq!(m.inventory().count("soda"), Some(0));
        assert!(s.effects.iter().any(
            |e| matches!(e, Effect::AlertRaised(a) if a.kind == AlertKind::OutOfStock && a.product_id == "soda")
        ));
        let txs = closed(&s);
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].status, TxStatus::Completed);
        assert!(!txs[0].refund_due);
        assert!(m.active().is_none());
    }

    #[test]
    fn test_untracked_product_always_selectable() {
        let mut m = machine();
        for _ in 0..3 {
            dispensing(&mut m, "water");
            let s = apply(&mut m, Input::DispenseConfirmed);
            assert!(!s.effects.iter().any(|e| matches!(e, Effect::InventoryChanged { .. })));
        }
        assert_eq!(m.inventory().count("water"), None);
    }

    #[test]
    fn test_dispense_error_faults_without_decrement() {
        let mut m = machine();
        dispensing(&mut m, "chips");
        let s = apply(
            &mut m,
            Input::DispenseError {
                code: "jam".into(),
            },
        );
        assert_eq!(m.state(), MachineState::Fault);
        assert_eq!(m.inventory().count("chips"), Some(5));
        assert_eq!(m.inventory().reserved(), None);
        let txs = closed(&s);
        assert_eq!(txs[0].status, TxStatus::Failed);
        assert!(txs[0].refund_due);
        assert_eq!(m.last_fault().map(|f| f.code.as_str()), Some("jam"));
    }

    #[test]
    fn test_shutdown_mid_dispense_resolves_before_off() {
        let mut m = machine();
        dispensing(&mut m, "chips");
        let s = apply(&mut m, Input::Shutdown);
        assert_eq!(m.state(), MachineState::ShuttingDown);
        assert!(!s.effects.contains(&Effect::CancelTimers));

        assert!(matches!(
            m.apply(select("water"), Utc::now()),
            Err(Rejection::InvalidTransition { .. })
        ));

        let s = apply(&mut m, Input::DispenseConfirmed);
        assert_eq!(m.state(), MachineState::Off);
        assert_eq!(closed(&s)[0].status, TxStatus::Completed);
        assert_eq!(m.inventory().count("chips"), Some(4));
        let hops: Vec<_> = s.transitions().collect();
        assert_eq!(hops, vec![(MachineState::ShuttingDown, MachineState::Off)]);
    }

    #[test]
    fn test_watchdog_during_shutdown_reaches_off() {
        let mut m = machine();
        dispensing(&mut m, "chips");
        apply(&mut m, Input::Shutdown);
        let s = apply(&mut m, Input::DispenseTimeout { tx: 1 });
        assert_eq!(m.state(), MachineState::Off);
        assert_eq!(closed(&s)[0].status, TxStatus::Failed);
        assert_eq!(m.last_fault().map(|f| f.code.as_str()), Some("watchdog"));
    }

    #[test]
    fn test_select_while_active_rejected() {
        let mut m = machine();
        apply(&mut m, select("chips"));
        let err = m.apply(select("water"), Utc::now()).unwrap_err();
        assert!(matches!(err, Rejection::InvalidTransition { .. }));
        assert_eq!(m.active().map(|t| t.id), Some(1));
    }

    #[test]
    fn test_out_of_stock_and_unknown_rejected_at_selection() {
        let mut m = machine();
        dispensing(&mut m, "soda");
        apply(&mut m, Input::DispenseConfirmed);
        assert!(matches!(
            m.apply(select("soda"), Utc::now()),
            Err(Rejection::OutOfStock { .. })
        ));
        assert!(matches!(
            m.apply(select("nope"), Utc::now()),
            Err(Rejection::UnknownProduct { .. })
        ));
        assert_eq!(m.state(), MachineState::Idle);
    }

    #[test]
    fn test_insufficient_payment_keeps_selecting() {
        let mut m = machine();
        apply(&mut m, select("soda"));
        let err = m.apply(pay(100), Utc::now()).unwrap_err();
        assert_eq!(
            err,
            Rejection::InsufficientPayment {
                required: 150,
                tendered: 100
            }
        );
        assert_eq!(m.state(), MachineState::Selecting);
        apply(&mut m, pay(200));
        assert_eq!(m.active().map(|t| t.amount_tendered), Some(200));
    }

    #[test]
    fn test_overpayment_is_returned_as_change() {
        let mut m = machine();
        dispensing(&mut m, "soda");
        assert_eq!(m.active().map(|t| t.change_due), Some(350));

        let s = apply(&mut m, Input::DispenseConfirmed);
        let txs = closed(&s);
        assert_eq!(txs[0].status, TxStatus::Completed);
        assert_eq!(txs[0].unit_price, 150);
        assert_eq!(txs[0].change_due, 350);
        assert!(!txs[0].refund_due);
    }

    #[test]
    fn test_payment_timeout_and_stale_timer() {
        let mut m = machine();
        apply(&mut m, select("chips"));
        let s = apply(&mut m, Input::PaymentTimeout { tx: 1 });
        assert_eq!(m.state(), MachineState::Idle);
        assert_eq!(closed(&s)[0].status, TxStatus::Failed);
        assert!(!closed(&s)[0].refund_due);

        apply(&mut m, select("chips"));
        let s = apply(&mut m, Input::PaymentTimeout { tx: 1 });
        assert!(!s.changed());
        assert_eq!(m.state(), MachineState::Selecting);
    }

    #[test]
    fn test_watchdog_forces_fault() {
        let mut m = machine();
        dispensing(&mut m, "chips");
        apply(&mut m, Input::DispenseTimeout { tx: 1 });
        assert_eq!(m.state(), MachineState::Fault);
        assert_eq!(m.inventory().count("chips"), Some(5));
    }

    #[test]
    fn test_reset_requires_acknowledgement() {
        let mut m = machine();
        dispensing(&mut m, "chips");
        apply(
            &mut m,
            Input::DispenseError {
                code: "jam".into(),
            },
        );
        assert!(m.apply(Input::Reset, Utc::now()).is_err());
        assert_eq!(m.state(), MachineState::Fault);

        let s = apply(&mut m, Input::FaultCleared);
        assert_eq!(s.effects, vec![Effect::FaultAcknowledged]);
        assert!(!apply(&mut m, Input::FaultCleared).changed());

        apply(&mut m, Input::Reset);
        assert_eq!(m.state(), MachineState::Idle);
    }

    #[test]
    fn test_reservation_failure_refunds_and_faults() {
        let mut m = machine();
        apply(&mut m, select("soda"));
        m.inventory = InventoryStore::new([Product::tracked("soda", "Soda", 150, 0, 0)]);

        let s = apply(&mut m, pay(150));
        assert_eq!(m.state(), MachineState::Fault);
        assert!(matches!(s.outcome, Outcome::Faulted(Rejection::OutOfStock { .. })));
        let tx = closed(&s)[0];
        assert_eq!(tx.status, TxStatus::Refunded);
        assert!(tx.refund_due);
    }

    #[test]
    fn test_commit_below_zero_is_invariant_violation() {
        let mut m = machine();
        dispensing(&mut m, "soda");
        m.inventory = InventoryStore::new([Product::tracked("soda", "Soda", 150, 0, 0)]);

        let s = apply(&mut m, Input::DispenseConfirmed);
        assert_eq!(m.state(), MachineState::Fault);
        assert!(matches!(
            s.outcome,
            Outcome::Faulted(Rejection::InvariantViolation { .. })
        ));
        assert_eq!(m.inventory().count("soda"), Some(0));
    }

    #[test]
    fn test_deferred_commands_apply_after_dispense() {
        let mut m = machine();
        dispensing(&mut m, "chips");
        assert_eq!(apply(&mut m, Input::MaintenanceEnter).outcome, Outcome::Deferred);
        assert_eq!(apply(&mut m, Input::Reset).outcome, Outcome::Deferred);
        assert_eq!(m.deferred().count(), 2);

        let s = apply(&mut m, Input::DispenseConfirmed);
        assert_eq!(m.state(), MachineState::Maintenance);
        let resolved: Vec<_> = s
            .effects
            .iter()
            .filter_map(|e| match e {
                Effect::DeferredResolved { input, rejection } => Some((input.name(), rejection.is_some())),
                _ => None,
            })
            .collect();
        assert_eq!(resolved, vec![("maintenance_enter", false), ("reset", true)]);
        assert_eq!(m.deferred().count(), 0);
    }

    #[test]
    fn test_shutdown_discards_deferred() {
        let mut m = machine();
        dispensing(&mut m, "chips");
        apply(&mut m, Input::Restart);
        let s = apply(&mut m, Input::Shutdown);
        assert!(s.effects.iter().any(|e| matches!(
            e,
            Effect::DeferredResolved {
                input: Input::Restart,
                rejection: Some(_)
            }
        )));
        apply(&mut m, Input::DispenseConfirmed);
        assert_eq!(m.state(), MachineState::Off);
    }

    #[test]
    fn test_restart_cycles_through_off() {
        let mut m = machine();
        apply(&mut m, select("chips"));
        let s = apply(&mut m, Input::Restart);
        let hops: Vec<_> = s.transitions().collect();
        assert_eq!(
            hops,
            vec![
                (MachineState::Selecting, MachineState::ShuttingDown),
                (MachineState::ShuttingDown, MachineState::Off),
                (MachineState::Off, MachineState::Idle),
            ]
        );
        assert_eq!(closed(&s)[0].status, TxStatus::Failed);
        assert!(m.active().is_none());
    }

    #[test]
    fn test_restart_from_off_keeps_inventory() {
        let mut m = machine();
        dispensing(&mut m, "chips");
        apply(&mut m, Input::DispenseConfirmed);
        apply(&mut m, Input::Shutdown);
        assert_eq!(m.state(), MachineState::Off);

        let s = apply(&mut m, Input::Restart);
        assert_eq!(
            s.transitions().collect::<Vec<_>>(),
            vec![(MachineState::Off, MachineState::Idle)]
        );
        assert_eq!(m.inventory().count("chips"), Some(4));
        assert!(m.last_fault().is_none());
    }

    #[test]
    fn test_maintenance_blocks_selection() {
        let mut m = machine();
        apply(&mut m, Input::MaintenanceEnter);
        assert_eq!(
            m.apply(select("water"), Utc::now()),
            Err(Rejection::MaintenanceMode)
        );
        apply(&mut m, Input::MaintenanceExit);
        assert!(matches!(
            m.apply(Input::MaintenanceExit, Utc::now()),
            Err(Rejection::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_restock_clears_alert_and_zero_is_no_change() {
        let mut m = machine();
        dispensing(&mut m, "soda");
        apply(&mut m, Input::DispenseConfirmed);

        let s = apply(
            &mut m,
            Input::Restock {
                product_id: "soda".into(),
                amount: 0,
            },
        );
        assert!(!s.changed());

        let s = apply(
            &mut m,
            Input::Restock {
                product_id: "soda".into(),
                amount: 3,
            },
        );
        assert!(s.effects.contains(&Effect::AlertCleared {
            product_id: "soda".into(),
            kinds: vec![AlertKind::OutOfStock],
        }));
        assert_eq!(m.inventory().count("soda"), Some(3));
    }
}
