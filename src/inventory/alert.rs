//! # Stock alerts and their de-duplication.
//!
//! An [`Alert`] is raised at most once per `(product_id, kind)` while the condition
//! stands. [`AlertBook`] remembers the standing ones; an entry is removed only when
//! the product is replenished above its threshold, after which the next crossing
//! raises a fresh alert.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Kind of stock condition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// Count at or below the restock threshold, but not zero.
    LowStock,
    /// Count reached zero.
    OutOfStock,
}

impl AlertKind {
    /// Returns a short stable label.
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::LowStock => "low_stock",
            AlertKind::OutOfStock => "out_of_stock",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raised stock alert.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Alert {
    /// Product concerned.
    pub product_id: String,
    /// Condition.
    pub kind: AlertKind,
    /// When it was raised.
    pub raised_at: DateTime<Utc>,
    /// Count at the time of raising.
    pub count: u32,
    /// Configured threshold.
    pub threshold: u32,
}

impl Alert {
    /// One-line human readable text, used as notification body.
    pub fn describe(&self) -> String {
        match self.kind {
            AlertKind::OutOfStock => format!("{} is out of stock", self.product_id),
            AlertKind::LowStock => format!(
                "{} is low on stock: {} left (threshold {})",
                self.product_id, self.count, self.threshold
            ),
        }
    }
}

/// Standing alerts, keyed by `(product_id, kind)`.
#[derive(Clone, Debug, Default)]
pub struct AlertBook {
    active: BTreeSet<(String, AlertKind)>,
}

impl AlertBook {
    /// Records a standing alert; returns `false` if it was already standing.
    pub fn insert(&mut self, product_id: &str, kind: AlertKind) -> bool {
        self.active.insert((product_id.to_owned(), kind))
    }

    /// Returns true if the alert is standing.
    pub fn is_active(&self, product_id: &str, kind: AlertKind) -> bool {
        self.active.contains(&(product_id.to_owned(), kind))
    }

    /// Clears every standing alert for a product, returning the kinds removed.
    pub fn clear_product(&mut self, product_id: &str) -> Vec<AlertKind> {
        let kinds: Vec<AlertKind> = self
            .active
            .iter()
            .filter(|(p, _)| p == product_id)
            .map(|(_, k)| *k)
            .collect();
        for k in &kinds {
            self.active.remove(&(product_id.to_owned(), *k));
        }
        kinds
    }

    /// Standing kinds for one product (sorted).
    pub fn kinds_for(&self, product_id: &str) -> Vec<AlertKind> {
        self.active
            .iter()
            .filter(|(p, _)| p == product_id)
            .map(|(_, k)| *k)
            .collect()
    }

    /// Number of standing alerts.
    pub fn len(&self) -> usize {
        self.active.len()
    }

    /// True if nothing is standing.
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_is_idempotent() {
        let mut book = AlertBook::default();
        assert!(book.insert("soda", AlertKind::LowStock));
        assert!(!book.insert("soda", AlertKind::LowStock));
        assert!(book.insert("soda", AlertKind::OutOfStock));
        assert_eq!(book.len(), 2);
    }

    #[test]
    fn test_clear_product_only_touches_that_product() {
        let mut book = AlertBook::default();
        book.insert("soda", AlertKind::LowStock);
        book.insert("soda", AlertKind::OutOfStock);
        book.insert("chips", AlertKind::LowStock);

        let cleared = book.clear_product("soda");
        assert_eq!(cleared, vec![AlertKind::LowStock, AlertKind::OutOfStock]);
        assert!(book.is_active("chips", AlertKind::LowStock));
        assert_eq!(book.len(), 1);
    }
}
