//! Convergence planning.
//!
//! Two independent plans are derived from one run's aggregate: the push
//! plan (which identity must be created on which server) and the
//! local-store plan (create/update/delete of directory entries). The
//! push plan must be fully executed (every attempt issued and its
//! outcome recorded) before the store plan is computed, so the store
//! never reflects servers that were not actually observed.

use crate::aggregate::Aggregate;
use fleetsync_model::{ClientRecord, DirectoryEntry, IdentityKey};
use std::collections::BTreeSet;

/// One planned corrective write: create `record` on `server`.
#[derive(Debug, Clone)]
pub struct PushOp {
    /// Target server name.
    pub server: String,
    /// The identity being replicated.
    pub identity: IdentityKey,
    /// The record to push: the template re-keyed for this identity.
    pub record: ClientRecord,
}

/// The corrective writes needed to put every reachable server in
/// agreement with the aggregate.
#[derive(Debug, Default)]
pub struct PushPlan {
    /// Planned upserts, ordered by identity then server.
    pub ops: Vec<PushOp>,
}

impl PushPlan {
    /// Plans one upsert for every (identity, reachable server) pair where
    /// the server did not report the identity.
    ///
    /// Only servers in `reachable` are considered: a server that failed
    /// its fetch is excluded from this run's writes entirely.
    pub fn plan(aggregate: &Aggregate, reachable: &BTreeSet<String>) -> Self {
        let mut ops = Vec::new();

        for (key, presence) in aggregate.iter() {
            for server in reachable {
                if presence.is_present_on(server) {
                    continue;
                }
                ops.push(PushOp {
                    server: server.clone(),
                    identity: key.clone(),
                    record: presence.template.replica_for(key),
                });
            }
        }

        Self { ops }
    }

    /// Returns true if every reachable server already agrees.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Number of planned upserts.
    pub fn len(&self) -> usize {
        self.ops.len()
    }
}

/// The local-store delta for one run, plus the resulting collection.
#[derive(Debug, Default)]
pub struct StorePlan {
    /// Entries for identities observed on servers but absent locally.
    pub creates: Vec<DirectoryEntry>,
    /// Entries whose per-server handles changed this run.
    pub updates: Vec<DirectoryEntry>,
    /// Identities confirmed absent from every server.
    pub removes: Vec<IdentityKey>,
    entries: Vec<DirectoryEntry>,
}

impl StorePlan {
    /// Plans the store delta from this run's aggregate and the existing
    /// directory.
    ///
    /// Handles are recomputed purely from this run's observations;
    /// servers that only just received the identity via the push plan
    /// show up on the next run, after their copy is actually observed.
    ///
    /// `confirm_absence` must be true only when every configured server
    /// produced a view this run; deletions are skipped otherwise, so an
    /// identity is never dropped because a server was unreachable.
    pub fn plan(aggregate: &Aggregate, existing: &[DirectoryEntry], confirm_absence: bool) -> Self {
        let mut plan = Self::default();

        let known: BTreeSet<IdentityKey> =
            existing.iter().map(DirectoryEntry::identity_key).collect();

        for (key, presence) in aggregate.iter() {
            if !known.contains(key) {
                let entry = DirectoryEntry::new(key, presence.handles.clone());
                plan.creates.push(entry.clone());
                plan.entries.push(entry);
            }
        }

        for entry in existing {
            let key = entry.identity_key();
            match aggregate.get(&key) {
                Some(presence) => {
                    if entry.handles == presence.handles {
                        plan.entries.push(entry.clone());
                    } else {
                        let updated = DirectoryEntry::new(&key, presence.handles.clone());
                        plan.updates.push(updated.clone());
                        plan.entries.push(updated);
                    }
                }
                None if confirm_absence => plan.removes.push(key),
                // Some server never answered; absence is unconfirmed.
                None => plan.entries.push(entry.clone()),
            }
        }

        plan
    }

    /// The full directory collection after applying this plan.
    pub fn entries(&self) -> &[DirectoryEntry] {
        &self.entries
    }

    /// Returns true if the plan changes nothing.
    pub fn is_empty(&self) -> bool {
        self.creates.is_empty() && self.updates.is_empty() && self.removes.is_empty()
    }
}
