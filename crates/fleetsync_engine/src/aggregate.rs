//! Cross-server state aggregation.

use fleetsync_model::{ClientRecord, IdentityKey, ServerHandle, ServerView};
use std::collections::BTreeMap;

/// What one reconciliation run knows about one identity.
#[derive(Debug, Clone)]
pub struct IdentityPresence {
    /// The first record observed for this identity, scanning views in
    /// configuration order. Used as the replication template; divergent
    /// attributes on later servers are deliberately ignored (documented
    /// first-observed-wins policy, not a merge).
    pub template: ClientRecord,
    /// Per-server handles, one for each server that reported the
    /// identity this run. The key set is the presence set.
    pub handles: BTreeMap<String, ServerHandle>,
}

impl IdentityPresence {
    /// Returns true if the given server reported this identity.
    pub fn is_present_on(&self, server: &str) -> bool {
        self.handles.contains_key(server)
    }

    /// The servers that reported this identity, in name order.
    pub fn present_on(&self) -> impl Iterator<Item = &str> {
        self.handles.keys().map(String::as_str)
    }
}

/// The canonical merged view of one run: identity → presence + template.
///
/// Run-scoped and in-memory only; each run constructs and discards its
/// own. Deterministic given a fixed view order, and free of I/O.
#[derive(Debug, Default)]
pub struct Aggregate {
    entries: BTreeMap<IdentityKey, IdentityPresence>,
}

impl Aggregate {
    /// Builds the aggregate from the views fetched this run.
    ///
    /// Views must be in configuration order; that order is what fixes
    /// template selection. Servers whose fetch failed are simply absent
    /// from the input and contribute no presence information. Records
    /// with an empty raw identity are skipped; they cannot be correlated.
    pub fn from_views(views: &[ServerView]) -> Self {
        let mut entries: BTreeMap<IdentityKey, IdentityPresence> = BTreeMap::new();

        for view in views {
            for record in &view.records {
                if record.raw_identity.is_empty() {
                    continue;
                }
                let key = record.identity_key();
                let presence = entries.entry(key).or_insert_with(|| IdentityPresence {
                    template: record.clone(),
                    handles: BTreeMap::new(),
                });
                presence
                    .handles
                    .insert(view.server.clone(), ServerHandle::from_record(record));
            }
        }

        Self { entries }
    }

    /// Looks up one identity.
    pub fn get(&self, key: &IdentityKey) -> Option<&IdentityPresence> {
        self.entries.get(key)
    }

    /// Returns true if any responding server reported the identity.
    pub fn contains(&self, key: &IdentityKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Iterates identities in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&IdentityKey, &IdentityPresence)> {
        self.entries.iter()
    }

    /// The identities observed this run, in key order.
    pub fn keys(&self) -> impl Iterator<Item = &IdentityKey> {
        self.entries.keys()
    }

    /// Number of distinct identities observed.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no identity was observed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
