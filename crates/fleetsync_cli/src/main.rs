//! fleetsync CLI
//!
//! Operator tools for the fleet client reconciliation engine.
//!
//! # Commands
//!
//! - `reconcile` - Converge every server and the local directory
//! - `add-user` - Provision a new user on every configured server
//! - `list-users` - List directory entries and their server presence

mod commands;
mod config;
mod http;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Fleet client reconciliation tools.
#[derive(Parser)]
#[command(name = "fleetsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the fleet configuration file
    #[arg(global = true, short, long, default_value = "fleet.yaml")]
    config: PathBuf,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile clients across every configured server
    Reconcile,

    /// Provision a new user on every configured server
    AddUser {
        /// Username for the new client
        label: String,

        /// Contact portion of the identity (e.g. "@name" or "id:42")
        #[arg(long, default_value = "")]
        contact: String,
    },

    /// List directory entries and their per-server presence
    ListUsers,

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Reconcile => {
            commands::reconcile::run(&cli.config)?;
        }
        Commands::AddUser { label, contact } => {
            commands::add_user::run(&cli.config, &label, &contact)?;
        }
        Commands::ListUsers => {
            commands::list_users::run(&cli.config)?;
        }
        Commands::Version => {
            println!("fleetsync v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
