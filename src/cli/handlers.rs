// src/cli/handlers.rs
use crate::backup::BackupStore;
use crate::cli::args::RunArgs;
use crate::config::Config;
use crate::exit::ReforgeExit;
use crate::pipeline::Pipeline;
use crate::report::terminal;
use anyhow::{anyhow, Context, Result};
use colored::Colorize;
use std::path::{Path, PathBuf};

fn resolve_root(root: &Path) -> Result<PathBuf> {
    root.canonicalize()
        .with_context(|| format!("Root {} is not accessible", root.display()))
}

/// Loads `reforge.toml` and layers the run flags on top.
///
/// # Errors
/// Returns error if the root is missing, the config is malformed, or a glob
/// does not compile.
pub fn build_config(args: &RunArgs) -> Result<Config> {
    let root = resolve_root(&args.root)?;
    let mut config = Config::load(&root, args.config.as_deref())?;
    if let Some(n) = args.size_threshold {
        config.thresholds.size = n;
    }
    if let Some(n) = args.complexity_threshold {
        config.thresholds.complexity = n;
    }
    if let Some(n) = args.jobs {
        config.scheduler.jobs = n;
    }
    config.extend_patterns(&args.include, &args.exclude)?;
    config.duplicates.structural |= args.structural_dups;
    config.dry_run = args.dry_run;
    config.validate = !args.no_validate;
    config.report_path.clone_from(&args.report);
    Ok(config)
}

/// Handles `reforge run`.
///
/// # Errors
/// Returns error if the configuration cannot be built. Failures inside the
/// run are reported through the exit code.
pub fn handle_run(args: &RunArgs) -> Result<ReforgeExit> {
    let config = build_config(args)?;
    let outcome = Pipeline::new(&config).run();
    terminal::print_summary(&outcome.report);
    if let Some(path) = &outcome.report_path {
        println!("{} {}", "Report:".dimmed(), path.display());
    }
    Ok(outcome.exit)
}

/// Handles `reforge rollback`.
///
/// # Errors
/// Returns error if no snapshot exists or the restore fails.
pub fn handle_rollback(root: &Path, snapshot: Option<&str>) -> Result<ReforgeExit> {
    let root = resolve_root(root)?;
    let store = BackupStore::new(&root);
    let id = match snapshot {
        Some(id) => id.to_string(),
        None => {
            store
                .latest()?
                .ok_or_else(|| anyhow!("No snapshots under {}", root.display()))?
                .id
        }
    };
    let summary = store
        .restore(&id)
        .with_context(|| format!("Rollback to {id} failed"))?;
    println!(
        "{} Restored snapshot {} ({} rewritten, {} removed)",
        "OK".green().bold(),
        id.bold(),
        summary.restored,
        summary.deleted
    );
    Ok(ReforgeExit::Success)
}

/// Handles `reforge snapshots`.
///
/// # Errors
/// Returns error if the backup directory cannot be read.
pub fn handle_snapshots(root: &Path) -> Result<ReforgeExit> {
    let root = resolve_root(root)?;
    let snapshots = BackupStore::new(&root).list()?;
    if snapshots.is_empty() {
        println!("{}", "No snapshots.".dimmed());
        return Ok(ReforgeExit::Success);
    }
    for s in &snapshots {
        println!("{:<28} {:>6} files  {}", s.id.bold(), s.file_count, s.created_at.dimmed());
    }
    Ok(ReforgeExit::Success)
}
