//! # fleetsync Engine
//!
//! Multi-server client reconciliation engine.
//!
//! This crate provides:
//! - Cross-server state aggregation (identity → presence + template)
//! - Convergence planning (push plan and local-store plan)
//! - The reconciliation run (fetch → aggregate → plan → push → persist)
//! - The single-user provisioning path
//!
//! ## Architecture
//!
//! One reconciliation run pulls every server's client list, merges them
//! into a canonical view keyed by identity, pushes each identity onto the
//! reachable servers that lack it, and then rewrites the local directory
//! to match what was actually observed. Servers that fail to answer
//! contribute nothing to the run; they are never inferred to be empty.
//!
//! ## Key Invariants
//!
//! - Servers are scanned in configuration order; the first record
//!   observed for an identity is its replication template
//! - All push attempts are issued and recorded before the local-store
//!   plan is computed
//! - An identity is deleted locally only when every configured server
//!   responded and none of them reported it
//! - Every operation is idempotent; re-running the whole reconciliation
//!   is the only retry mechanism

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod aggregate;
mod error;
mod plan;
mod provision;
mod reconciler;
mod report;

pub use aggregate::{Aggregate, IdentityPresence};
pub use error::{EngineError, EngineResult};
pub use plan::{PushOp, PushPlan, StorePlan};
pub use provision::{new_client_record, ProvisionOutcome, ProvisionServerResult};
pub use reconciler::{FleetServer, Reconciler, RunState, RunStats};
pub use report::{RunAction, RunReport};
