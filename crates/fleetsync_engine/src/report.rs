//! Run reports.
//!
//! The reconciliation trigger returns a human-readable log of actions
//! taken; no machine contract is promised beyond overall success or
//! failure. The report is that log, plus enough counts for a summary.

use fleetsync_model::IdentityKey;
use std::fmt;
use std::time::Duration;

/// One action taken (or failed) during a reconciliation run.
#[derive(Debug, Clone)]
pub enum RunAction {
    /// A server's client list could not be fetched; the server is
    /// excluded from this run.
    FetchFailed {
        /// Server name.
        server: String,
        /// Failure description.
        error: String,
    },
    /// An identity was created on a server that lacked it.
    ClientPushed {
        /// The replicated identity.
        identity: IdentityKey,
        /// Target server.
        server: String,
    },
    /// A planned push was rejected or never arrived.
    PushFailed {
        /// The identity that could not be replicated.
        identity: IdentityKey,
        /// Target server.
        server: String,
        /// Failure description.
        error: String,
    },
    /// A directory entry was created for a newly-observed identity.
    EntryCreated {
        /// The identity.
        identity: IdentityKey,
    },
    /// A directory entry's per-server handles were rewritten.
    EntryUpdated {
        /// The identity.
        identity: IdentityKey,
    },
    /// An identity confirmed absent everywhere was removed locally.
    EntryRemoved {
        /// The identity.
        identity: IdentityKey,
    },
}

impl RunAction {
    /// Renders the operator-facing line for this action.
    pub fn render(&self) -> String {
        match self {
            RunAction::FetchFailed { server, error } => {
                format!("failed to fetch clients from {}: {}", server, error)
            }
            RunAction::ClientPushed { identity, server } => {
                format!("added {} on {}", identity, server)
            }
            RunAction::PushFailed {
                identity,
                server,
                error,
            } => format!("failed to add {} on {}: {}", identity, server, error),
            RunAction::EntryCreated { identity } => {
                format!("added {} to the directory", identity)
            }
            RunAction::EntryUpdated { identity } => {
                format!("updated directory entry for {}", identity)
            }
            RunAction::EntryRemoved { identity } => {
                format!("removed {} from the directory", identity)
            }
        }
    }
}

/// The outcome of one reconciliation run.
///
/// A run that took no action at all (every server already agreed, the
/// directory already matched) produces an empty action list: the
/// signature of an idempotent re-run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Actions taken, in execution order.
    pub actions: Vec<RunAction>,
    /// Number of configured servers.
    pub servers_configured: usize,
    /// Number of servers that produced a view this run.
    pub servers_reachable: usize,
    /// Wall-clock duration of the run.
    pub duration: Duration,
}

impl RunReport {
    /// Creates an empty report for a fleet of the given size.
    pub fn new(servers_configured: usize) -> Self {
        Self {
            actions: Vec::new(),
            servers_configured,
            servers_reachable: 0,
            duration: Duration::ZERO,
        }
    }

    /// Records an action.
    pub fn push(&mut self, action: RunAction) {
        self.actions.push(action);
    }

    /// Number of clients successfully pushed.
    pub fn clients_pushed(&self) -> usize {
        self.count(|a| matches!(a, RunAction::ClientPushed { .. }))
    }

    /// Number of pushes that failed.
    pub fn push_failures(&self) -> usize {
        self.count(|a| matches!(a, RunAction::PushFailed { .. }))
    }

    /// Number of directory entries created.
    pub fn entries_created(&self) -> usize {
        self.count(|a| matches!(a, RunAction::EntryCreated { .. }))
    }

    /// Number of directory entries updated.
    pub fn entries_updated(&self) -> usize {
        self.count(|a| matches!(a, RunAction::EntryUpdated { .. }))
    }

    /// Number of directory entries removed.
    pub fn entries_removed(&self) -> usize {
        self.count(|a| matches!(a, RunAction::EntryRemoved { .. }))
    }

    /// Returns true if the run changed nothing anywhere.
    pub fn is_noop(&self) -> bool {
        self.actions.is_empty()
    }

    /// The operator-facing lines, one per action.
    pub fn lines(&self) -> Vec<String> {
        self.actions.iter().map(RunAction::render).collect()
    }

    fn count(&self, pred: impl Fn(&RunAction) -> bool) -> usize {
        self.actions.iter().filter(|a| pred(a)).count()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.lines() {
            writeln!(f, "{}", line)?;
        }
        write!(
            f,
            "{}/{} servers reachable, {} pushed, {} push failures, \
             {} created, {} updated, {} removed",
            self.servers_reachable,
            self.servers_configured,
            self.clients_pushed(),
            self.push_failures(),
            self.entries_created(),
            self.entries_updated(),
            self.entries_removed(),
        )
    }
}
