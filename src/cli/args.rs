use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "reforge",
    version,
    about = "Split oversized source files, consolidate duplicates, validate, roll back"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
    /// Debug-level logging (overridden by REFORGE_LOG)
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan, plan, transform and validate a source tree
    Run(RunArgs),
    /// Restore the working tree from a snapshot
    Rollback {
        #[arg(value_name = "ROOT", default_value = ".")]
        root: PathBuf,
        /// Snapshot id; defaults to the most recent
        #[arg(long, value_name = "ID")]
        snapshot: Option<String>,
    },
    /// List snapshots, oldest first
    Snapshots {
        #[arg(value_name = "ROOT", default_value = ".")]
        root: PathBuf,
    },
}

#[allow(clippy::struct_excessive_bools)]
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    #[arg(value_name = "ROOT", default_value = ".")]
    pub root: PathBuf,
    /// Lines above which a file is split
    #[arg(long, value_name = "N")]
    pub size_threshold: Option<usize>,
    /// Cyclomatic complexity above which a file is split
    #[arg(long, value_name = "N")]
    pub complexity_threshold: Option<usize>,
    /// Worker threads
    #[arg(long, short, value_name = "N")]
    pub jobs: Option<usize>,
    #[arg(long, value_name = "GLOB")]
    pub include: Vec<String>,
    #[arg(long, value_name = "GLOB")]
    pub exclude: Vec<String>,
    /// Plan and report without writing anything
    #[arg(long)]
    pub dry_run: bool,
    /// Skip formatter, checker and tests
    #[arg(long)]
    pub no_validate: bool,
    /// Also report duplicates that differ only in identifier names
    #[arg(long)]
    pub structural_dups: bool,
    /// Write the JSON report here instead of .reforge/reports/
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,
    /// Config file; defaults to ROOT/reforge.toml
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}
