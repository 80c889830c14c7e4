//! Durable directory entries.

use crate::identity::IdentityKey;
use crate::record::ClientRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The per-server handles for one identity on one server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerHandle {
    /// Server-specific credential ID.
    pub credential_id: String,
    /// Server-specific subscription handle.
    pub subscription_id: String,
}

impl ServerHandle {
    /// Creates a handle pair.
    pub fn new(credential_id: impl Into<String>, subscription_id: impl Into<String>) -> Self {
        Self {
            credential_id: credential_id.into(),
            subscription_id: subscription_id.into(),
        }
    }

    /// Extracts the handle pair from an observed client record.
    pub fn from_record(record: &ClientRecord) -> Self {
        Self {
            credential_id: record.credential_id.clone(),
            subscription_id: record.subscription_id.clone(),
        }
    }
}

/// The durable record for one logical user.
///
/// Created when an identity is first observed on any server, updated when
/// its per-server presence changes, and deleted once the identity is
/// confirmed absent from every server. The `label`/`contact` fields must
/// reconstruct exactly the identity key used during aggregation; that
/// equality is the contract that makes reconciliation correct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// Human-chosen username portion of the identity.
    pub label: String,
    /// Contact portion of the identity (may be empty).
    #[serde(default)]
    pub contact: String,
    /// Per-server credential handles, keyed by server name.
    pub handles: BTreeMap<String, ServerHandle>,
}

impl DirectoryEntry {
    /// Creates an entry for an identity with the given observed handles.
    pub fn new(key: &IdentityKey, handles: BTreeMap<String, ServerHandle>) -> Self {
        Self {
            label: key.label.clone(),
            contact: key.contact.clone(),
            handles,
        }
    }

    /// Reconstructs the identity key this entry is filed under.
    pub fn identity_key(&self) -> IdentityKey {
        IdentityKey::new(self.label.clone(), self.contact.clone())
    }
}
