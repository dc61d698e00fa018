//! # Product catalogue entries.
//!
//! A [`Product`] is the typed form of one catalogue entry. Prices are kept in integer
//! cents; the JSON document carries decimal currency units which are converted and
//! validated at load time by [`ProductEntry::into_product`].

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

/// Largest accepted unit price (in currency units).
const MAX_PRICE: f64 = 1_000_000.0;

/// One vendable product.
///
/// `inventory_count` is `Some` exactly when `track_inventory` is true.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Product {
    /// Unique catalogue id (also the selection key).
    pub id: String,
    /// Display name.
    pub name: String,
    /// Price in cents.
    pub unit_price: u64,
    /// Whether stock is metered and alertable.
    pub track_inventory: bool,
    /// Remaining units (tracked products only).
    pub inventory_count: Option<u32>,
    /// Alert when the count falls to this value or below.
    pub restock_threshold: u32,
}

impl Product {
    /// Creates a tracked product.
    pub fn tracked(
        id: impl Into<String>,
        name: impl Into<String>,
        unit_price: u64,
        count: u32,
        restock_threshold: u32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            unit_price,
            track_inventory: true,
            inventory_count: Some(count),
            restock_threshold,
        }
    }

    /// Creates an untracked product: never blocks dispense, never alerts.
    pub fn untracked(id: impl Into<String>, name: impl Into<String>, unit_price: u64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            unit_price,
            track_inventory: false,
            inventory_count: None,
            restock_threshold: 0,
        }
    }
}

/// Raw product entry as found in the JSON catalogue.
///
/// `inventory_count = -1` marks an unlimited (untracked) product.
#[derive(Clone, Debug, Deserialize)]
pub(crate) struct ProductEntry {
    id: String,
    #[serde(default)]
    name: Option<String>,
    price: f64,
    #[serde(default)]
    track_inventory: Option<bool>,
    #[serde(default)]
    inventory_count: Option<i64>,
    #[serde(default)]
    restock_threshold: Option<i64>,
}

impl ProductEntry {
    /// Validates the entry and converts it into a [`Product`].
    pub(crate) fn into_product(self, index: usize) -> Result<Product, CatalogError> {
        let id = self.id.trim().to_owned();
        if id.is_empty() {
            return Err(CatalogError::EmptyId { index });
        }

        if !self.price.is_finite() || self.price < 0.0 || self.price > MAX_PRICE {
            return Err(CatalogError::InvalidPrice {
                id,
                price: self.price,
            });
        }
        let unit_price = (self.price * 100.0).round() as u64;

        let threshold = self.restock_threshold.unwrap_or(0);
        if threshold < 0 {
            return Err(CatalogError::InvalidThreshold { id, threshold });
        }
        let restock_threshold = u32::try_from(threshold)
            .map_err(|_| CatalogError::InvalidThreshold { id: id.clone(), threshold })?;

        let unlimited = self.inventory_count == Some(-1);
        let track_inventory = self.track_inventory.unwrap_or(!unlimited);
        let inventory_count = if track_inventory {
            let count = self
                .inventory_count
                .filter(|c| *c >= 0)
                .and_then(|c| u32::try_from(c).ok())
                .ok_or_else(|| CatalogError::InvalidCount { id: id.clone() })?;
            Some(count)
        } else {
            None
        };

        let name = self.name.unwrap_or_else(|| id.clone());
        Ok(Product {
            id,
            name,
            unit_price,
            track_inventory,
            inventory_count,
            restock_threshold,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(json: &str) -> ProductEntry {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_price_converted_to_cents() {
        let p = entry(r#"{"id":"soda","price":1.25,"inventory_count":4}"#)
            .into_product(0)
            .unwrap();
        assert_eq!(p.unit_price, 125);
        assert_eq!(p.name, "soda");
        assert!(p.track_inventory);
        assert_eq!(p.inventory_count, Some(4));
        assert_eq!(p.restock_threshold, 0);
    }

    #[test]
    fn test_minus_one_means_untracked() {
        let p = entry(r#"{"id":"water","price":1.0,"inventory_count":-1}"#)
            .into_product(0)
            .unwrap();
        assert!(!p.track_inventory);
        assert_eq!(p.inventory_count, None);
    }

    #[test]
    fn test_untracked_ignores_count() {
        let p = entry(r#"{"id":"water","price":1.0,"track_inventory":false,"inventory_count":7}"#)
            .into_product(0)
            .unwrap();
        assert_eq!(p.inventory_count, None);
    }

    #[test]
    fn test_tracked_without_count_rejected() {
        let err = entry(r#"{"id":"chips","price":1.0}"#)
            .into_product(2)
            .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidCount { id } if id == "chips"));
    }

    #[test]
    fn test_bad_values_rejected() {
        assert!(matches!(
            entry(r#"{"id":" ","price":1.0,"inventory_count":1}"#).into_product(3),
            Err(CatalogError::EmptyId { index: 3 })
        ));
        assert!(matches!(
            entry(r#"{"id":"a","price":-0.5,"inventory_count":1}"#).into_product(0),
            Err(CatalogError::InvalidPrice { .. })
        ));
        assert!(matches!(
            entry(r#"{"id":"a","price":1.0,"inventory_count":1,"restock_threshold":-2}"#)
                .into_product(0),
            Err(CatalogError::InvalidThreshold { threshold: -2, .. })
        ));
        assert!(matches!(
            entry(r#"{"id":"a","price":1.0,"inventory_count":-3}"#).into_product(0),
            Err(CatalogError::InvalidCount { .. })
        ));
    }
}
