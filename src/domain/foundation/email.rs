//! Email address value object.
//!
//! The email address is the single correlation key across payment links,
//! ledger rows, and subscription state. Webhook payloads carry it reliably,
//! so every entity is keyed by the address used at link-issuance time.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::errors::ValidationError;

/// A normalized email address (trimmed, lowercased).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Creates a new EmailAddress, rejecting empty or malformed input.
    ///
    /// Validation is deliberately shallow: the address only has to be a
    /// usable correlation key, not RFC 5321 compliant.
    pub fn new(address: impl Into<String>) -> Result<Self, ValidationError> {
        let address = address.into().trim().to_lowercase();
        if address.is_empty() {
            return Err(ValidationError::empty_field("email"));
        }
        match address.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {
                Ok(Self(address))
            }
            _ => Err(ValidationError::invalid_format(
                "email",
                "expected local@domain",
            )),
        }
    }

    /// Returns the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the value, returning the inner String.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
