//! List-users command implementation.

use crate::commands::build_reconciler;
use crate::config::load_config;
use std::path::Path;

/// Lists directory entries and the servers each is recorded on.
pub fn run(config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    let engine = build_reconciler(&config)?;

    let entries = engine.directory()?;
    if entries.is_empty() {
        println!("no users in the directory");
        return Ok(());
    }

    for entry in entries {
        let servers: Vec<&str> = entry.handles.keys().map(String::as_str).collect();
        println!("{}  [{}]", entry.identity_key(), servers.join(", "));
    }

    Ok(())
}
