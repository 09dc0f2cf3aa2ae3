// tests/cli_exit.rs - exit code contract of the binary
mod common;

use common::{scenario_tree, write};
use std::process::Command;
use tempfile::TempDir;

fn reforge(args: &[&str]) -> anyhow::Result<std::process::Output> {
    Ok(Command::new(env!("CARGO_BIN_EXE_reforge"))
        .args(args)
        .env("REFORGE_LOG", "warn")
        .output()?)
}

#[test]
fn dry_run_exits_zero() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    scenario_tree(dir.path())?;
    let root = dir.path().to_string_lossy().to_string();
    let out = reforge(&["run", &root, "--dry-run", "--size-threshold", "150"])?;
    assert_eq!(out.status.code(), Some(0), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(String::from_utf8_lossy(&out.stdout).contains("would change"));
    Ok(())
}

#[test]
fn malformed_config_exits_one() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    write(dir.path(), "reforge.toml", "[thresholds]\nsize = \"huge\"\n")?;
    let root = dir.path().to_string_lossy().to_string();
    let out = reforge(&["run", &root])?;
    assert_eq!(out.status.code(), Some(1));
    Ok(())
}

#[test]
fn snapshots_on_fresh_tree_lists_nothing() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let root = dir.path().to_string_lossy().to_string();
    let out = reforge(&["snapshots", &root])?;
    assert_eq!(out.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&out.stdout).contains("No snapshots"));
    Ok(())
}
