//! Single-user provisioning.
//!
//! Onboarding one new identity does not run the reconciliation loop: it
//! is a degenerate one-identity push to every server, followed by a
//! directory create recording only the servers that confirmed success.
//! Servers that failed pick the identity up on the next reconciliation
//! run instead.

use crate::error::EngineResult;
use crate::reconciler::Reconciler;
use fleetsync_model::{ClientRecord, DirectoryEntry, IdentityKey, ServerHandle};
use serde_json::json;
use std::collections::BTreeMap;
use tracing::{info, warn};
use uuid::Uuid;

/// The outcome of provisioning on one server.
#[derive(Debug, Clone)]
pub struct ProvisionServerResult {
    /// Server name.
    pub server: String,
    /// Connection URL for the new client, when the server accepted it
    /// and the URL could be derived.
    pub url: Option<String>,
    /// Whether the server accepted the client.
    pub success: bool,
    /// Failure description when it did not.
    pub error: Option<String>,
}

/// The outcome of provisioning one identity across the fleet.
#[derive(Debug, Clone)]
pub struct ProvisionOutcome {
    /// The new identity's label.
    pub label: String,
    /// The new identity's contact (may be empty).
    pub contact: String,
    /// Per-server results, in configuration order.
    pub results: Vec<ProvisionServerResult>,
}

impl ProvisionOutcome {
    /// Returns true if at least one server accepted the client (and the
    /// identity was therefore recorded locally).
    pub fn succeeded_anywhere(&self) -> bool {
        self.results.iter().any(|r| r.success)
    }
}

/// Builds the local template for a brand-new identity: fresh credential
/// and subscription IDs plus the panel's default client attributes.
pub fn new_client_record(key: &IdentityKey) -> ClientRecord {
    let mut attributes = BTreeMap::new();
    attributes.insert("enable".to_string(), json!(true));
    attributes.insert("expiryTime".to_string(), json!(0));
    attributes.insert("flow".to_string(), json!(""));
    attributes.insert("limitIp".to_string(), json!(0));
    attributes.insert("totalGB".to_string(), json!(0));
    attributes.insert("tgId".to_string(), json!(""));
    attributes.insert("reset".to_string(), json!(0));

    ClientRecord {
        raw_identity: key.to_raw(),
        credential_id: Uuid::new_v4().to_string(),
        subscription_id: Uuid::new_v4().to_string(),
        attributes,
    }
}

impl Reconciler {
    /// Provisions one new identity on every server, independently, and
    /// records locally only the servers that confirmed success.
    ///
    /// Unlike reconciliation, the template here is constructed locally,
    /// since no server's copy exists yet to serve as one.
    pub fn provision(&self, label: &str, contact: &str) -> EngineResult<ProvisionOutcome> {
        let key = IdentityKey::new(label, contact);
        let record = new_client_record(&key);

        let mut handles: BTreeMap<String, ServerHandle> = BTreeMap::new();
        let mut results = Vec::new();

        for server in self.servers() {
            match server.endpoint.upsert_client(server.inbound_id, &record) {
                Ok(()) => {
                    info!(identity = %key, server = %server.name, "client provisioned");
                    let url = server.endpoint.access_url(server.inbound_id, &record).ok();
                    handles.insert(server.name.clone(), ServerHandle::from_record(&record));
                    results.push(ProvisionServerResult {
                        server: server.name.clone(),
                        url,
                        success: true,
                        error: None,
                    });
                }
                Err(e) => {
                    warn!(identity = %key, server = %server.name, error = %e, "provisioning failed");
                    results.push(ProvisionServerResult {
                        server: server.name.clone(),
                        url: None,
                        success: false,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        if !handles.is_empty() {
            let mut entries = self.store().load()?;
            entries.retain(|entry| entry.identity_key() != key);
            entries.push(DirectoryEntry::new(&key, handles));
            self.store().save_all(&entries)?;
        }

        Ok(ProvisionOutcome {
            label: key.label,
            contact: key.contact,
            results,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_has_fresh_ids_and_defaults() {
        let key = IdentityKey::new("alice", "@alice");
        let a = new_client_record(&key);
        let b = new_client_record(&key);

        assert_eq!(a.raw_identity, "alice|@alice");
        assert_ne!(a.credential_id, b.credential_id);
        assert_ne!(a.subscription_id, b.subscription_id);
        assert_eq!(a.attributes["enable"], json!(true));
        assert_eq!(a.attributes["totalGB"], json!(0));
    }
}
