//! # Inventory store: authoritative per-product stock.
//!
//! Owned by the state machine and mutated only from the serialized worker path.
//!
//! ## Operations
//! ```text
//! check(id)            selection-time validation (exists, untracked or count > 0)
//! reserve(id)          dispense-time re-validation; holds the unit for the transaction
//! release(id)          drops the hold (dispense failed, nothing decremented)
//! commit(id)           count -= 1 (tracked only) → threshold evaluation
//! restock(id, amount)  count += amount          → threshold evaluation
//! ```
//!
//! ## Rules
//! - A tracked count is never negative: `commit` at zero is an invariant violation.
//! - Untracked products never block and never alert.
//! - Threshold evaluation: `count <= threshold` raises `OutOfStock` (count == 0) or
//!   `LowStock`, once per standing condition; `count > threshold` clears all standing
//!   alerts for the product.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::catalog::Product;
use crate::error::Rejection;
use crate::inventory::alert::{Alert, AlertBook, AlertKind};

/// Result of a stock mutation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Evaluation {
    /// Whether the count actually changed.
    pub changed: bool,
    /// Count after the mutation (tracked products).
    pub count: Option<u32>,
    /// Alerts raised by this evaluation.
    pub raised: Vec<Alert>,
    /// Alert kinds cleared by this evaluation.
    pub cleared: Vec<AlertKind>,
}

/// One product line of the inventory summary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InventoryLine {
    /// Product id.
    pub product_id: String,
    /// Display name.
    pub name: String,
    /// Price in cents.
    pub unit_price: u64,
    /// Whether the count is metered.
    pub tracked: bool,
    /// Remaining units (tracked only).
    pub count: Option<u32>,
    /// Restock threshold.
    pub threshold: u32,
    /// Standing alerts.
    pub alerts: Vec<AlertKind>,
}

/// In-memory record of stock and standing alerts.
#[derive(Clone, Debug, Default)]
pub struct InventoryStore {
    products: BTreeMap<String, Product>,
    alerts: AlertBook,
    reserved: Option<String>,
}

impl InventoryStore {
    /// Creates a store from the catalogue products.
    pub fn new(products: impl IntoIterator<Item = Product>) -> Self {
        Self {
            products: products.into_iter().map(|p| (p.id.clone(), p)).collect(),
            alerts: AlertBook::default(),
            reserved: None,
        }
    }

    /// Looks up a product.
    pub fn get(&self, id: &str) -> Option<&Product> {
        self.products.get(id)
    }

    /// Current count of a tracked product.
    pub fn count(&self, id: &str) -> Option<u32> {
        self.products.get(id).and_then(|p| p.inventory_count)
    }

    /// Product reserved by the active transaction, if any.
    pub fn reserved(&self) -> Option<&str> {
        self.reserved.as_deref()
    }

    /// Standing alerts.
    pub fn alerts(&self) -> &AlertBook {
        &self.alerts
    }

    /// Selection-time check: the product exists and can be sold.
    pub fn check(&self, id: &str) -> Result<&Product, Rejection> {
        let product = self
            .products
            .get(id)
            .ok_or_else(|| Rejection::UnknownProduct {
                product_id: id.to_owned(),
            })?;
        if product.track_inventory && product.inventory_count.unwrap_or(0) == 0 {
            return Err(Rejection::OutOfStock {
                product_id: id.to_owned(),
            });
        }
        Ok(product)
    }

    /// Re-validates stock when the transaction enters Dispensing and holds one unit.
    pub fn reserve(&mut self, id: &str) -> Result<(), Rejection> {
        self.check(id)?;
        self.reserved = Some(id.to_owned());
        Ok(())
    }

    /// Drops the hold without touching the count.
    pub fn release(&mut self, id: &str) {
        if self.reserved.as_deref() == Some(id) {
            self.reserved = None;
        }
    }

    /// Decrements a tracked product by one and evaluates its threshold.
    ///
    /// Fails with [`Rejection::InvariantViolation`] if the count is already zero
    /// or the product vanished; the caller must force the machine to Fault.
    pub fn commit(&mut self, id: &str, now: DateTime<Utc>) -> Result<Evaluation, Rejection> {
        self.release(id);
        let product = self
            .products
            .get_mut(id)
            .ok_or_else(|| Rejection::InvariantViolation {
                detail: format!("commit for unknown product '{id}'"),
            })?;
        if !product.track_inventory {
            return Ok(Evaluation::default());
        }

        let count = product.inventory_count.unwrap_or(0);
        if count == 0 {
            return Err(Rejection::InvariantViolation {
                detail: format!("commit would drive '{id}' below zero"),
            });
        }
        product.inventory_count = Some(count - 1);

        let mut eval = self.evaluate(id, now);
        eval.changed = true;
        Ok(eval)
    }

    /// Adds `amount` units to a tracked product and evaluates its threshold.
    ///
    /// A zero amount or an untracked product is accepted without change.
    pub fn restock(
        &mut self,
        id: &str,
        amount: u32,
        now: DateTime<Utc>,
    ) -> Result<Evaluation, Rejection> {
        let product = self
            .products
            .get_mut(id)
            .ok_or_else(|| Rejection::UnknownProduct {
                product_id: id.to_owned(),
            })?;
        if !product.track_inventory || amount == 0 {
            return Ok(Evaluation {
                count: product.inventory_count,
                ..Evaluation::default()
            });
        }

        let count = product.inventory_count.unwrap_or(0).saturating_add(amount);
        product.inventory_count = Some(count);

        let mut eval = self.evaluate(id, now);
        eval.changed = true;
        Ok(eval)
    }

    /// Compares a tracked product's count against its threshold.
    fn evaluate(&mut self, id: &str, now: DateTime<Utc>) -> Evaluation {
        let Some(product) = self.products.get(id) else {
            return Evaluation::default();
        };
        let Some(count) = product.inventory_count else {
            return Evaluation::default();
        };
        let threshold = product.restock_threshold;

        let mut eval = Evaluation {
            count: Some(count),
            ..Evaluation::default()
        };
        if count > threshold {
            eval.cleared = self.alerts.clear_product(id);
            return eval;
        }

        let kind = if count == 0 {
            AlertKind::OutOfStock
        } else {
            AlertKind::LowStock
        };
        if self.alerts.insert(id, kind) {
            eval.raised.push(Alert {
                product_id: id.to_owned(),
                kind,
                raised_at: now,
                count,
                threshold,
            });
        }
        eval
    }

    /// Per-product summary in id order.
    pub fn summary(&self) -> Vec<InventoryLine> {
        self.products
            .values()
            .map(|p| InventoryLine {
                product_id: p.id.clone(),
                name: p.name.clone(),
                unit_price: p.unit_price,
                tracked: p.track_inventory,
                count: p.inventory_count,
                threshold: p.restock_threshold,
                alerts: self.alerts.kinds_for(&p.id),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> InventoryStore {
        InventoryStore::new([
            Product::tracked("soda", "Soda", 150, 1, 0),
            Product::tracked("chips", "Chips", 100, 5, 2),
            Product::untracked("water", "Water", 100),
        ])
    }

    #[test]
    fn test_check_rejects_unknown_and_depleted() {
        let mut s = store();
        assert!(s.check("soda").is_ok());
        assert!(matches!(
            s.check("nope"),
            Err(Rejection::UnknownProduct { .. })
        ));
        s.commit("soda", Utc::now()).unwrap();
        assert!(matches!(s.check("soda"), Err(Rejection::OutOfStock { .. })));
    }

    #[test]
    fn test_untracked_never_blocks_or_alerts() {
        let mut s = store();
        for _ in 0..10 {
            s.reserve("water").unwrap();
            let eval = s.commit("water", Utc::now()).unwrap();
            assert!(!eval.changed);
            assert!(eval.raised.is_empty());
        }
        assert_eq!(s.count("water"), None);
    }

    #[test]
    fn test_commit_at_zero_is_invariant_violation() {
        let mut s = store();
        s.commit("soda", Utc::now()).unwrap();
        let err = s.commit("soda", Utc::now()).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(s.count("soda"), Some(0));
    }

    #[test]
    fn test_out_of_stock_alert_on_last_unit() {
        let mut s = store();
        let eval = s.commit("soda", Utc::now()).unwrap();
        assert_eq!(eval.count, Some(0));
        assert_eq!(eval.raised.len(), 1);
        assert_eq!(eval.raised[0].kind, AlertKind::OutOfStock);
    }

    #[test]
    fn test_low_stock_raised_once_until_replenished() {
        let mut s = store();
        let now = Utc::now();
        assert!(s.commit("chips", now).unwrap().raised.is_empty()); // 4
        assert!(s.commit("chips", now).unwrap().raised.is_empty()); // 3
        let e = s.commit("chips", now).unwrap(); // 2
        assert_eq!(e.raised[0].kind, AlertKind::LowStock);
        assert!(s.commit("chips", now).unwrap().raised.is_empty()); // 1, still standing

        // Restock that stays at/below threshold keeps the alert standing.
        let e = s.restock("chips", 1, now).unwrap(); // 2
        assert!(e.raised.is_empty() && e.cleared.is_empty());

        // Above threshold clears; the next crossing raises again.
        let e = s.restock("chips", 3, now).unwrap(); // 5
        assert_eq!(e.cleared, vec![AlertKind::LowStock]);
        for _ in 0..2 {
            s.commit("chips", now).unwrap();
        }
        let e = s.commit("chips", now).unwrap(); // 2
        assert_eq!(e.raised.len(), 1);
    }

    #[test]
    fn test_restock_zero_and_untracked_are_no_change() {
        let mut s = store();
        let e = s.restock("chips", 0, Utc::now()).unwrap();
        assert!(!e.changed);
        assert_eq!(e.count, Some(5));
        let e = s.restock("water", 10, Utc::now()).unwrap();
        assert!(!e.changed);
        assert!(matches!(
            s.restock("nope", 1, Utc::now()),
            Err(Rejection::UnknownProduct { .. })
        ));
    }

    #[test]
    fn test_reserve_and_release() {
        let mut s = store();
        s.reserve("soda").unwrap();
        assert_eq!(s.reserved(), Some("soda"));
        s.release("soda");
        assert_eq!(s.reserved(), None);
        assert_eq!(s.count("soda"), Some(1));
    }

    #[test]
    fn test_summary_lists_alerts() {
        let mut s = store();
        s.commit("soda", Utc::now()).unwrap();
        let lines = s.summary();
        let soda = lines.iter().find(|l| l.product_id == "soda").unwrap();
        assert_eq!(soda.alerts, vec![AlertKind::OutOfStock]);
        assert_eq!(lines.len(), 3);
    }
}
