//! Reconcile command implementation.

use crate::commands::build_reconciler;
use crate::config::load_config;
use std::path::Path;
use tracing::info;

/// Runs a full reconciliation and prints the action log.
pub fn run(config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    info!(servers = config.servers.len(), "starting reconciliation");

    let engine = build_reconciler(&config)?;
    let report = engine.reconcile()?;

    if report.is_noop() {
        println!("fleet already converged; nothing to do");
    } else {
        for line in report.lines() {
            println!("{}", line);
        }
    }
    println!(
        "{}/{} servers reachable, {} pushed, {} created, {} updated, {} removed ({:.1?})",
        report.servers_reachable,
        report.servers_configured,
        report.clients_pushed(),
        report.entries_created(),
        report.entries_updated(),
        report.entries_removed(),
        report.duration,
    );

    Ok(())
}
