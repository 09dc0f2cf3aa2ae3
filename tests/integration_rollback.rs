// tests/integration_rollback.rs - fatal errors restore the pre-run tree
mod common;

use common::{config, long_module, scenario_tree, tree_hashes, write};
use reforge_core::backup::BackupStore;
use reforge_core::cli::handlers::handle_rollback;
use reforge_core::exit::ReforgeExit;
use reforge_core::pipeline::Pipeline;
use reforge_core::transform::writer::{FsSink, OutputSink};
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

/// Writes through to disk until `budget` writes have happened, then fails
/// like a full disk.
struct DiskFullAfter {
    budget: usize,
    writes: AtomicUsize,
}

impl DiskFullAfter {
    fn new(budget: usize) -> Self {
        Self {
            budget,
            writes: AtomicUsize::new(0),
        }
    }
}

impl OutputSink for DiskFullAfter {
    fn write(&self, path: &Path, content: &str) -> io::Result<()> {
        if self.writes.fetch_add(1, Ordering::SeqCst) >= self.budget {
            return Err(io::Error::new(io::ErrorKind::Other, "No space left on device"));
        }
        FsSink.write(path, content)
    }
}

#[test]
fn fatal_write_error_restores_tree_byte_for_byte() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let root = dir.path();
    scenario_tree(root)?;
    write(root, "src/D.ts", &long_module().replace("step", "phase"))?;
    let before = tree_hashes(root)?;
    let mut cfg = config(root)?;
    cfg.scheduler.jobs = 1;

    let sink = DiskFullAfter::new(5);
    let outcome = Pipeline::new(&cfg).with_sink(&sink).run();

    assert_eq!(outcome.exit, ReforgeExit::Fatal);
    assert!(outcome.report.rolled_back);
    assert!(outcome.report.fatal_error.is_some());
    assert!(outcome.report.changed.is_empty());
    assert_eq!(tree_hashes(root)?, before);
    assert!(!root.join("src/C").exists());
    assert!(!root.join("src/D").exists());
    Ok(())
}

#[test]
fn rollback_command_restores_latest_snapshot() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let root = dir.path();
    scenario_tree(root)?;
    let before = tree_hashes(root)?;

    let outcome = Pipeline::new(&config(root)?).run();
    assert_eq!(outcome.exit, ReforgeExit::Success);
    assert_ne!(tree_hashes(root)?, before);

    let exit = handle_rollback(root, None)?;
    assert_eq!(exit, ReforgeExit::Success);
    assert_eq!(tree_hashes(root)?, before);
    Ok(())
}

#[test]
fn snapshots_respect_retention() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let root = dir.path();
    let mut cfg = config(root)?;
    cfg.backup.retention = 2;

    for i in 0..3 {
        write(root, &format!("src/big{i}.ts"), &long_module().replace("step", &format!("s{i}_")))?;
        let outcome = Pipeline::new(&cfg).run();
        assert_eq!(outcome.exit, ReforgeExit::Success);
    }
    let snapshots = BackupStore::new(root).list()?;
    assert_eq!(snapshots.len(), 2);
    Ok(())
}
