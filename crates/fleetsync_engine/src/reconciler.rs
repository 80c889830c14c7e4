//! The reconciliation run.

use crate::aggregate::Aggregate;
use crate::error::{EngineError, EngineResult};
use crate::plan::{PushPlan, StorePlan};
use crate::report::{RunAction, RunReport};
use fleetsync_endpoint::ServerEndpoint;
use fleetsync_model::{DirectoryEntry, ServerView};
use fleetsync_store::DirectoryStore;
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// The current state of the reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// No run has started yet.
    Idle,
    /// Fetching client lists from the fleet.
    Fetching,
    /// Executing the push plan.
    Pushing,
    /// Writing the local directory.
    Persisting,
    /// The last run completed.
    Completed,
    /// The last run aborted.
    Error,
}

impl RunState {
    /// Returns true if a run is currently executing.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            RunState::Fetching | RunState::Pushing | RunState::Persisting
        )
    }

    /// Returns true if a new run may start.
    pub fn can_start_run(&self) -> bool {
        matches!(self, RunState::Idle | RunState::Completed | RunState::Error)
    }
}

/// Statistics across the lifetime of a reconciler.
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    /// Total runs completed successfully.
    pub runs_completed: u64,
    /// Total clients pushed onto servers.
    pub clients_pushed: u64,
    /// Total push attempts that failed.
    pub push_failures: u64,
    /// Total directory entries created.
    pub entries_created: u64,
    /// Total directory entries updated.
    pub entries_updated: u64,
    /// Total directory entries removed.
    pub entries_removed: u64,
    /// Completion time of the last successful run.
    pub last_run_time: Option<Instant>,
    /// Last error message, cleared on a successful run.
    pub last_error: Option<String>,
}

/// One configured server: its name, inbound, and endpoint capability.
///
/// The order of `FleetServer` values handed to the reconciler is the
/// configuration order, which decides template selection.
#[derive(Clone)]
pub struct FleetServer {
    /// Server name, unique within the fleet.
    pub name: String,
    /// The inbound holding this fleet's clients on that server.
    pub inbound_id: u32,
    /// The authenticated endpoint.
    pub endpoint: Arc<dyn ServerEndpoint>,
}

impl FleetServer {
    /// Creates a fleet member.
    pub fn new(name: impl Into<String>, inbound_id: u32, endpoint: Arc<dyn ServerEndpoint>) -> Self {
        Self {
            name: name.into(),
            inbound_id,
            endpoint,
        }
    }
}

/// The reconciliation engine for one fleet.
///
/// Owns the directory store for its lifetime (and with it the store's
/// exclusive lock). Not re-entrant: overlapping `reconcile` calls are
/// rejected with [`EngineError::RunInProgress`]; callers single-flight
/// invocations.
pub struct Reconciler {
    servers: Vec<FleetServer>,
    store: DirectoryStore,
    state: RwLock<RunState>,
    stats: RwLock<RunStats>,
    cancelled: AtomicBool,
}

impl Reconciler {
    /// Creates a reconciler over the given fleet, in configuration order.
    pub fn new(servers: Vec<FleetServer>, store: DirectoryStore) -> Self {
        Self {
            servers,
            store,
            state: RwLock::new(RunState::Idle),
            stats: RwLock::new(RunStats::default()),
            cancelled: AtomicBool::new(false),
        }
    }

    /// Gets the current state.
    pub fn state(&self) -> RunState {
        *self.state.read()
    }

    /// Gets the lifetime stats.
    pub fn stats(&self) -> RunStats {
        self.stats.read().clone()
    }

    /// The configured fleet, in configuration order.
    pub fn servers(&self) -> &[FleetServer] {
        &self.servers
    }

    /// The directory store backing this reconciler.
    pub fn store(&self) -> &DirectoryStore {
        &self.store
    }

    /// Cancels the ongoing run. Checked between phases; a run cancelled
    /// before the persist phase changes no local state.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Reads the current directory without side effects.
    pub fn directory(&self) -> EngineResult<Vec<DirectoryEntry>> {
        Ok(self.store.load()?)
    }

    /// Performs a full reconciliation run:
    /// fetch → aggregate → plan → push → persist.
    ///
    /// Per-server fetch failures and per-identity push failures are
    /// recorded in the report and do not abort the run. Store failures
    /// abort it; remote pushes already issued stand and are re-observed
    /// harmlessly on the next run.
    pub fn reconcile(&self) -> EngineResult<RunReport> {
        let start = Instant::now();
        self.cancelled.store(false, Ordering::SeqCst);

        if !self.state().can_start_run() {
            return Err(EngineError::RunInProgress);
        }

        let mut report = RunReport::new(self.servers.len());

        // Fetch phase: configuration order fixes template selection.
        self.set_state(RunState::Fetching);
        let views = self.fetch_views(&mut report);
        report.servers_reachable = views.len();

        if views.is_empty() {
            let err = EngineError::NoReachableServers;
            self.handle_error(&err);
            return Err(err);
        }

        if let Err(e) = self.check_cancelled() {
            self.handle_error(&e);
            return Err(e);
        }

        let aggregate = Aggregate::from_views(&views);
        let reachable: BTreeSet<String> =
            views.iter().map(|view| view.server.clone()).collect();

        // Push phase: all attempts are issued and recorded before the
        // store plan is computed from this run's aggregate.
        self.set_state(RunState::Pushing);
        let push_plan = PushPlan::plan(&aggregate, &reachable);
        self.execute_pushes(&push_plan, &mut report);

        if let Err(e) = self.check_cancelled() {
            self.handle_error(&e);
            return Err(e);
        }

        // Persist phase.
        self.set_state(RunState::Persisting);
        let existing = match self.store.load() {
            Ok(entries) => entries,
            Err(e) => {
                let err = EngineError::from(e);
                self.handle_error(&err);
                return Err(err);
            }
        };

        let confirm_absence = views.len() == self.servers.len();
        let store_plan = StorePlan::plan(&aggregate, &existing, confirm_absence);

        if let Err(e) = self.store.save_all(store_plan.entries()) {
            let err = EngineError::from(e);
            self.handle_error(&err);
            return Err(err);
        }

        for entry in &store_plan.creates {
            report.push(RunAction::EntryCreated {
                identity: entry.identity_key(),
            });
        }
        for entry in &store_plan.updates {
            report.push(RunAction::EntryUpdated {
                identity: entry.identity_key(),
            });
        }
        for key in &store_plan.removes {
            info!(identity = %key, "removed from directory");
            report.push(RunAction::EntryRemoved {
                identity: key.clone(),
            });
        }

        report.duration = start.elapsed();
        self.set_state(RunState::Completed);

        let mut stats = self.stats.write();
        stats.runs_completed += 1;
        stats.clients_pushed += report.clients_pushed() as u64;
        stats.push_failures += report.push_failures() as u64;
        stats.entries_created += report.entries_created() as u64;
        stats.entries_updated += report.entries_updated() as u64;
        stats.entries_removed += report.entries_removed() as u64;
        stats.last_run_time = Some(Instant::now());
        stats.last_error = None;
        drop(stats);

        Ok(report)
    }

    /// Fetches every server's view; failures become report entries, not
    /// errors, and the failed server simply has no view.
    fn fetch_views(&self, report: &mut RunReport) -> Vec<ServerView> {
        let mut views = Vec::new();

        for server in &self.servers {
            match server.endpoint.list_clients(server.inbound_id) {
                Ok(records) => {
                    views.push(ServerView::new(server.name.clone(), records));
                }
                Err(e) => {
                    warn!(server = %server.name, error = %e, "fetch failed, excluding server from this run");
                    report.push(RunAction::FetchFailed {
                        server: server.name.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        views
    }

    /// Issues every planned push and records each outcome. Failures are
    /// per-identity-per-server and block nothing else.
    fn execute_pushes(&self, plan: &PushPlan, report: &mut RunReport) {
        for op in &plan.ops {
            let Some(server) = self.servers.iter().find(|s| s.name == op.server) else {
                continue;
            };
            match server.endpoint.upsert_client(server.inbound_id, &op.record) {
                Ok(()) => {
                    info!(identity = %op.identity, server = %op.server, "client added");
                    report.push(RunAction::ClientPushed {
                        identity: op.identity.clone(),
                        server: op.server.clone(),
                    });
                }
                Err(e) => {
                    warn!(identity = %op.identity, server = %op.server, error = %e, "push failed");
                    report.push(RunAction::PushFailed {
                        identity: op.identity.clone(),
                        server: op.server.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }
    }

    fn check_cancelled(&self) -> EngineResult<()> {
        if self.cancelled.load(Ordering::SeqCst) {
            Err(EngineError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn set_state(&self, state: RunState) {
        *self.state.write() = state;
    }

    fn handle_error(&self, error: &EngineError) {
        self.set_state(RunState::Error);
        self.stats.write().last_error = Some(error.to_string());
    }
}
