//! Client records and per-server views.

use crate::identity::IdentityKey;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A credential entry as known to one server.
///
/// Field names follow the panel wire format: the composite identity is
/// the panel's `email`, the per-server secret is `id`, and the secondary
/// handle is `subId`. Every other field the server attaches (enable,
/// quota, expiry, ...) lands verbatim in [`attributes`](Self::attributes)
/// and is replayed verbatim when the record is replicated.
///
/// Records are never mutated in place; replication constructs a fresh
/// copy via [`replica_for`](Self::replica_for).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientRecord {
    /// Server-native composite identity (`label|contact`).
    #[serde(rename = "email")]
    pub raw_identity: String,
    /// Server-specific opaque secret/ID. Not part of identity equality.
    #[serde(rename = "id")]
    pub credential_id: String,
    /// Secondary per-server opaque handle.
    #[serde(rename = "subId", default)]
    pub subscription_id: String,
    /// Server-specific flags, copied verbatim when replicating.
    #[serde(flatten)]
    pub attributes: BTreeMap<String, Value>,
}

impl ClientRecord {
    /// Creates a record with no extra attributes.
    pub fn new(
        raw_identity: impl Into<String>,
        credential_id: impl Into<String>,
        subscription_id: impl Into<String>,
    ) -> Self {
        Self {
            raw_identity: raw_identity.into(),
            credential_id: credential_id.into(),
            subscription_id: subscription_id.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Sets an attribute, returning the record (builder style).
    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// Derives the reconciliation key from the raw identity.
    pub fn identity_key(&self) -> IdentityKey {
        IdentityKey::parse(&self.raw_identity)
    }

    /// Builds the record to push when replicating this record (as the
    /// first-observed template) onto a server that lacks the identity.
    ///
    /// The raw identity is re-rendered from the key so the pushed record
    /// is self-consistent; credential and subscription IDs stay the
    /// template's, and attributes are copied verbatim.
    pub fn replica_for(&self, key: &IdentityKey) -> Self {
        Self {
            raw_identity: key.to_raw(),
            credential_id: self.credential_id.clone(),
            subscription_id: self.subscription_id.clone(),
            attributes: self.attributes.clone(),
        }
    }
}

/// One server's full client list at a point in time.
///
/// Fetched fresh at the start of each reconciliation run and discarded at
/// the end; never persisted. Servers whose fetch failed have no view.
#[derive(Debug, Clone)]
pub struct ServerView {
    /// Server name (unique within a run).
    pub server: String,
    /// The client records, in the order the server reported them.
    pub records: Vec<ClientRecord>,
}

impl ServerView {
    /// Creates a view from a fetched record list.
    pub fn new(server: impl Into<String>, records: Vec<ClientRecord>) -> Self {
        Self {
            server: server.into(),
            records,
        }
    }
}
