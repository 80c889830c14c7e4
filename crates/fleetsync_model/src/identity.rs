//! Identity resolution.
//!
//! Servers store one composite string per client (the panel's `email`
//! field, written as `label|contact`). The identity key splits that
//! string back into its parts and defines equality for reconciliation:
//! exact, case-sensitive string equality on both parts, no normalization.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between the label and contact parts of a raw identity.
const SEPARATOR: char = '|';

/// The stable `(label, contact)` pair that correlates the same logical
/// user across independently-administered servers.
///
/// Ordering is derived so that collections keyed by identity iterate
/// deterministically (label first, then contact).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IdentityKey {
    /// Human-chosen username portion.
    pub label: String,
    /// Contact portion; empty when the raw identity had no separator.
    pub contact: String,
}

impl IdentityKey {
    /// Creates a key from its two parts.
    pub fn new(label: impl Into<String>, contact: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            contact: contact.into(),
        }
    }

    /// Parses a server-native raw identity.
    ///
    /// Splits at the first separator; a raw identity without a separator
    /// yields an empty contact. Parsing never fails.
    pub fn parse(raw: &str) -> Self {
        match raw.split_once(SEPARATOR) {
            Some((label, contact)) => Self::new(label, contact),
            None => Self::new(raw, ""),
        }
    }

    /// Renders the canonical raw form (`label|contact`, or just `label`
    /// when the contact is empty).
    pub fn to_raw(&self) -> String {
        if self.contact.is_empty() {
            self.label.clone()
        } else {
            format!("{}{}{}", self.label, SEPARATOR, self.contact)
        }
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_raw())
    }
}
