//! Properties of the pure state machine under arbitrary input sequences.

use std::collections::HashSet;

use chrono::Utc;
use proptest::prelude::*;
use vmc::{
    AlertKind, Effect, Input, InventoryStore, Machine, MachineState, Product, Rejection, TxStatus,
};

const SODA_START: u32 = 3;

fn machine() -> Machine {
    Machine::new(InventoryStore::new([
        Product::tracked("soda", "Soda", 150, SODA_START, 1),
        Product::untracked("water", "Water", 100),
    ]))
}

fn input() -> impl Strategy<Value = Input> {
    let product = || prop::sample::select(vec!["soda", "water", "chips"]);
    prop_oneof![
        3 => product().prop_map(|p| Input::Select { product_id: p.into() }),
        3 => (0u64..300).prop_map(|amount| Input::PaymentConfirmed { amount }),
        3 => Just(Input::DispenseConfirmed),
        1 => Just(Input::DispenseError { code: "jam".into() }),
        1 => Just(Input::FaultCleared),
        1 => Just(Input::Reset),
        1 => Just(Input::Restart),
        1 => Just(Input::Shutdown),
        1 => Just(Input::MaintenanceEnter),
        1 => Just(Input::MaintenanceExit),
        2 => (product(), 0u32..4).prop_map(|(p, amount)| Input::Restock {
            product_id: p.into(),
            amount,
        }),
        1 => (1u64..8).prop_map(|tx| Input::PaymentTimeout { tx }),
        1 => (1u64..8).prop_map(|tx| Input::DispenseTimeout { tx }),
    ]
}

proptest! {
    #[test]
    fn transitions_stay_on_the_edge_table(inputs in prop::collection::vec(input(), 1..120)) {
        let mut m = machine();
        let now = Utc::now();

        for input in inputs {
            let before = m.state();
            let had_active = m.active().is_some();
            let is_select = matches!(input, Input::Select { .. });

            match m.apply(input, now) {
                Ok(step) => {
                    let mut at = before;
                    for (from, to) in step.transitions() {
                        prop_assert_eq!(from, at);
                        prop_assert!(from.can_transition_to(to), "illegal edge {} -> {}", from, to);
                        at = to;
                    }
                    prop_assert_eq!(at, m.state());
                    prop_assert!(
                        !step.effects.iter().any(|e| matches!(e, Effect::InvariantViolated { .. })),
                        "unexpected invariant violation: {:?}",
                        step.effects
                    );
                }
                Err(rejection) => {
                    prop_assert_eq!(m.state(), before);
                    if is_select && had_active {
                        let is_invalid_transition = matches!(rejection, Rejection::InvalidTransition { .. });
                        prop_assert!(is_invalid_transition);
                    }
                }
            }

            prop_assert!(MachineState::ALL.contains(&m.state()));
            let live = matches!(
                m.state(),
                MachineState::Selecting | MachineState::Dispensing | MachineState::ShuttingDown
            );
            prop_assert!(m.active().is_none() || live);
        }
    }

    #[test]
    fn inventory_matches_dispenses_and_restocks(inputs in prop::collection::vec(input(), 1..120)) {
        let mut m = machine();
        let now = Utc::now();
        let mut completed: u32 = 0;
        let mut restocked: u32 = 0;
        let mut standing: HashSet<AlertKind> = HashSet::new();

        for input in inputs {
            let restock = match &input {
                Input::Restock { product_id, amount } if product_id == "soda" => *amount,
                _ => 0,
            };
            let Ok(step) = m.apply(input, now) else {
                continue;
            };
            restocked += restock;

            for effect in &step.effects {
                match effect {
                    Effect::TransactionClosed(tx)
                        if tx.status == TxStatus::Completed && tx.selected_product_id == "soda" =>
                    {
                        completed += 1;
                    }
                    Effect::AlertRaised(alert) if alert.product_id == "soda" => {
                        prop_assert!(standing.insert(alert.kind), "duplicate {} alert", alert.kind);
                    }
                    Effect::AlertCleared { product_id, kinds } if product_id == "soda" => {
                        for kind in kinds {
                            standing.remove(kind);
                        }
                    }
                    _ => {}
                }
            }

            prop_assert_eq!(m.inventory().count("soda"), Some(SODA_START + restocked - completed));
            prop_assert_eq!(m.inventory().count("water"), None);
        }
    }
}
