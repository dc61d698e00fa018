//! # Bootstrap catalogue.
//!
//! Typed, validated form of the JSON configuration documents read at startup:
//! machine identity, the product catalogue and alert contacts. Malformed entries are
//! rejected here with a [`CatalogError`] naming the entry; nothing dynamic reaches
//! the controller.
//!
//! ## Document shape
//! ```json
//! {
//!   "machine":  { "name": "Lobby Snacks", "serial_number": "VM-001", "location": "Building A" },
//!   "products": [
//!     { "id": "soda",  "name": "Soda",  "price": 1.50, "inventory_count": 12, "restock_threshold": 3 },
//!     { "id": "water", "name": "Water", "price": 1.00, "inventory_count": -1 }
//!   ],
//!   "contacts": [
//!     { "name": "Owner", "email": "owner@example.com", "preferred": ["email"] }
//!   ]
//! }
//! ```

mod contact;
mod product;

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

pub use contact::{ChannelKind, Contact, Recipient};
pub use product::Product;

use product::ProductEntry;

/// Identity of the physical machine, echoed in every status snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineInfo {
    /// Common name, e.g. "Lobby Snacks".
    #[serde(default)]
    pub name: String,
    /// Serial number (machine id).
    #[serde(default)]
    pub serial_number: String,
    /// Where the machine stands.
    #[serde(default)]
    pub location: String,
}

#[derive(Deserialize)]
struct CatalogDocument {
    #[serde(default)]
    machine: MachineInfo,
    #[serde(default)]
    products: Vec<ProductEntry>,
    #[serde(default)]
    contacts: Vec<Contact>,
}

/// Validated bootstrap input for the controller.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    /// Machine identity.
    pub machine: MachineInfo,
    /// Product catalogue (ids unique).
    pub products: Vec<Product>,
    /// Alert recipients.
    pub contacts: Vec<Contact>,
}

impl Catalog {
    /// Builds a catalogue from already-typed parts, checking id uniqueness and contacts.
    pub fn from_parts(
        machine: MachineInfo,
        products: Vec<Product>,
        contacts: Vec<Contact>,
    ) -> Result<Self, CatalogError> {
        let mut seen = HashSet::with_capacity(products.len());
        for (index, p) in products.iter().enumerate() {
            if p.id.trim().is_empty() {
                return Err(CatalogError::EmptyId { index });
            }
            if p.track_inventory && p.inventory_count.is_none() {
                return Err(CatalogError::InvalidCount { id: p.id.clone() });
            }
            if !seen.insert(p.id.as_str()) {
                return Err(CatalogError::DuplicateId { id: p.id.clone() });
            }
        }
        for c in &contacts {
            c.validate()?;
        }
        Ok(Self {
            machine,
            products,
            contacts,
        })
    }

    /// Parses and validates a JSON catalogue document.
    pub fn from_json(text: &str) -> Result<Self, CatalogError> {
        let doc: CatalogDocument = serde_json::from_str(text)?;
        let products = doc
            .products
            .into_iter()
            .enumerate()
            .map(|(i, e)| e.into_product(i))
            .collect::<Result<Vec<_>, _>>()?;

        let catalog = Self::from_parts(doc.machine, products, doc.contacts)?;
        tracing::debug!(
            serial = %catalog.machine.serial_number,
            products = catalog.products.len(),
            contacts = catalog.contacts.len(),
            "catalog loaded"
        );
        Ok(catalog)
    }

    /// Reads and validates a JSON catalogue file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Resolves every (contact, channel) pair for the given channel kind.
    pub fn recipients_for(&self, kind: ChannelKind) -> Vec<Recipient> {
        self.contacts
            .iter()
            .filter(|c| c.preferred.contains(&kind))
            .filter_map(|c| {
                c.address_for(kind).map(|addr| Recipient {
                    name: c.name.clone(),
                    channel: kind,
                    address: addr.to_owned(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"{
        "machine": { "name": "Lobby", "serial_number": "VM-7", "location": "Building A" },
        "products": [
            { "id": "soda", "name": "Soda", "price": 1.5, "inventory_count": 1, "restock_threshold": 0 },
            { "id": "water", "name": "Water", "price": 1.0, "inventory_count": -1 }
        ],
        "contacts": [
            { "name": "Owner", "email": "owner@example.com", "phone": "+15550100", "preferred": ["email", "sms"] },
            { "name": "Tech", "phone": "+15550111", "preferred": ["sms"] }
        ]
    }"#;

    #[test]
    fn test_full_document_loads() {
        let cat = Catalog::from_json(DOC).unwrap();
        assert_eq!(cat.machine.serial_number, "VM-7");
        assert_eq!(cat.products.len(), 2);
        assert_eq!(cat.products[0].unit_price, 150);
        assert!(!cat.products[1].track_inventory);
        assert_eq!(cat.contacts.len(), 2);
    }

    #[test]
    fn test_recipients_follow_preferences() {
        let cat = Catalog::from_json(DOC).unwrap();
        let email = cat.recipients_for(ChannelKind::Email);
        assert_eq!(email.len(), 1);
        assert_eq!(email[0].address, "owner@example.com");
        let sms = cat.recipients_for(ChannelKind::Sms);
        assert_eq!(sms.len(), 2);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let doc = r#"{"products":[
            {"id":"a","price":1.0,"inventory_count":1},
            {"id":"a","price":2.0,"inventory_count":1}
        ]}"#;
        assert!(matches!(
            Catalog::from_json(doc),
            Err(CatalogError::DuplicateId { id }) if id == "a"
        ));
    }

    #[test]
    fn test_contact_without_address_rejected() {
        let doc = r#"{"contacts":[{"name":"Nobody","preferred":["email"]}]}"#;
        assert!(matches!(
            Catalog::from_json(doc),
            Err(CatalogError::MissingAddress { channel: "email", .. })
        ));
    }

    #[test]
    fn test_malformed_json_rejected() {
        assert!(matches!(
            Catalog::from_json("{\"products\": [}"),
            Err(CatalogError::Parse(_))
        ));
    }
}
