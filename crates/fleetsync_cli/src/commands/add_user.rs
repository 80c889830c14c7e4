//! Add-user command implementation.

use crate::commands::build_reconciler;
use crate::config::load_config;
use std::path::Path;

/// Provisions a new user and prints per-server connection results.
pub fn run(config_path: &Path, label: &str, contact: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    let engine = build_reconciler(&config)?;

    let outcome = engine.provision(label, contact)?;

    for result in &outcome.results {
        if result.success {
            println!("{}: ok", result.server);
            if let Some(url) = &result.url {
                println!("  {}", url);
            }
        } else {
            println!(
                "{}: failed ({})",
                result.server,
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    if !outcome.succeeded_anywhere() {
        return Err("no server accepted the new client".into());
    }

    Ok(())
}
