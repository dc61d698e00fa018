//! # Alert recipients.
//!
//! A [`Contact`] lists the channels a person prefers, in order. The alert router
//! addresses every notification to each contact on each preferred channel that the
//! runtime has a [`NotifyChannel`](crate::NotifyChannel) for.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

/// Supported notification channels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    /// SMTP-style email.
    Email,
    /// Text message.
    Sms,
}

impl ChannelKind {
    /// Returns the channel label used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::Email => "email",
            ChannelKind::Sms => "sms",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A person who receives restock and fault notices.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Display name.
    pub name: String,
    /// Email address, if any.
    #[serde(default)]
    pub email: Option<String>,
    /// Phone number for SMS, if any.
    #[serde(default)]
    pub phone: Option<String>,
    /// Channels to use, in preference order.
    #[serde(default)]
    pub preferred: Vec<ChannelKind>,
}

impl Contact {
    /// Returns the address this contact has for `kind`.
    pub fn address_for(&self, kind: ChannelKind) -> Option<&str> {
        match kind {
            ChannelKind::Email => self.email.as_deref(),
            ChannelKind::Sms => self.phone.as_deref(),
        }
    }

    /// Every preferred channel must have an address.
    pub(crate) fn validate(&self) -> Result<(), CatalogError> {
        for kind in &self.preferred {
            let has = self.address_for(*kind).is_some_and(|a| !a.trim().is_empty());
            if !has {
                return Err(CatalogError::MissingAddress {
                    name: self.name.clone(),
                    channel: kind.as_str(),
                });
            }
        }
        Ok(())
    }
}

/// A resolved (channel, address) pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Recipient {
    /// Contact name.
    pub name: String,
    /// Channel the address belongs to.
    pub channel: ChannelKind,
    /// Email address or phone number.
    pub address: String,
}
