//! # Status snapshots.
//!
//! A [`StatusSnapshot`] is an immutable point-in-time summary of the machine and its
//! inventory. It is captured by the controller worker after every committed step and
//! never mutated afterwards; the next step produces a new one.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::catalog::MachineInfo;
use crate::error::TransportError;
use crate::inventory::InventoryLine;
use crate::machine::{FaultRecord, Machine, MachineState, Transaction};

/// Immutable summary of machine and inventory state.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StatusSnapshot {
    /// Monotonic snapshot number (0 is the boot snapshot).
    pub seq: u64,
    /// Machine identity.
    pub machine: MachineInfo,
    /// Current state.
    pub machine_state: MachineState,
    /// Active transaction, if any.
    pub active_transaction: Option<Transaction>,
    /// Per-product stock summary.
    pub inventory: Vec<InventoryLine>,
    /// Most recent fault since the last restart.
    pub last_fault: Option<FaultRecord>,
    /// Commands waiting for the in-flight dispense.
    pub deferred_commands: Vec<&'static str>,
    /// When the snapshot was captured.
    pub timestamp: DateTime<Utc>,
}

impl StatusSnapshot {
    /// Captures the current state of `machine`.
    pub fn capture(seq: u64, info: &MachineInfo, machine: &Machine, now: DateTime<Utc>) -> Self {
        Self {
            seq,
            machine: info.clone(),
            machine_state: machine.state(),
            active_transaction: machine.active().cloned(),
            inventory: machine.inventory().summary(),
            last_fault: machine.last_fault().cloned(),
            deferred_commands: machine.deferred().map(|i| i.name()).collect(),
            timestamp: now,
        }
    }

    /// Encodes the snapshot as the JSON wire payload.
    pub fn to_json(&self) -> Result<Vec<u8>, TransportError> {
        serde_json::to_vec(self).map_err(|e| TransportError::Encode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Product;
    use crate::inventory::InventoryStore;
    use crate::machine::Input;

    #[test]
    fn test_wire_shape() {
        let mut m = Machine::new(InventoryStore::new([Product::tracked("soda", "Soda", 150, 2, 0)]));
        m.apply(
            Input::Select {
                product_id: "soda".into(),
            },
            Utc::now(),
        )
        .unwrap();

        let info = MachineInfo {
            name: "Lobby".into(),
            serial_number: "VM-1".into(),
            location: String::new(),
        };
        let snap = StatusSnapshot::capture(4, &info, &m, Utc::now());
        let json: serde_json::Value = serde_json::from_slice(&snap.to_json().unwrap()).unwrap();

        assert_eq!(json["seq"], 4);
        assert_eq!(json["machine"]["serial_number"], "VM-1");
        assert_eq!(json["machine_state"], "selecting");
        assert_eq!(json["active_transaction"]["status"], "pending");
        assert_eq!(json["active_transaction"]["unit_price"], 150);
        assert_eq!(json["active_transaction"]["change_due"], 0);
        assert_eq!(json["inventory"][0]["count"], 2);
        assert!(json["last_fault"].is_null());
    }
}
