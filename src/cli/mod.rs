// src/cli/mod.rs
//! CLI command handlers.

pub mod args;
pub mod handlers;

pub use args::{Cli, Commands, RunArgs};

use crate::exit::ReforgeExit;
use anyhow::Result;

/// Executes the parsed command.
///
/// # Errors
/// Returns error if the command handler fails before producing an outcome.
pub fn execute(command: Commands) -> Result<ReforgeExit> {
    match command {
        Commands::Run(args) => handlers::handle_run(&args),
        Commands::Rollback { root, snapshot } => handlers::handle_rollback(&root, snapshot.as_deref()),
        Commands::Snapshots { root } => handlers::handle_snapshots(&root),
    }
}
