// tests/integration_scan.rs - discovery and classification over real trees
mod common;

use common::write;
use reforge_core::classify::classify_all;
use reforge_core::config::Config;
use reforge_core::discovery::Scanner;
use tempfile::TempDir;

#[test]
fn pruned_and_excluded_paths_never_reach_classification() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let root = dir.path();
    write(root, "src/a.ts", "export const a = 1;\n")?;
    write(root, "node_modules/pkg/index.js", "module.exports = 1;\n")?;
    write(root, ".git/HEAD", "ref: refs/heads/main\n")?;
    write(root, ".reforge/backups/x/tree/src/a.ts", "export const a = 1;\n")?;
    write(root, "legacy/old.ts", "export const old = 1;\n")?;
    write(root, "src/api/client.gen.ts", "export const gen = 1;\n")?;

    let mut cfg = Config::defaults_for(root)?;
    cfg.extend_patterns(&[], &["legacy/**".to_string(), "*.gen.ts".to_string()])?;
    let outcome = Scanner::from_config(&cfg).scan();

    let mut rels: Vec<String> = outcome
        .files
        .iter()
        .filter_map(|p| p.strip_prefix(root).ok())
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .collect();
    rels.sort();
    assert_eq!(rels, vec!["src/a.ts".to_string()]);
    Ok(())
}

#[test]
fn binary_and_unknown_files_are_classified_unknown() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let root = dir.path();
    write(root, "src/a.ts", "export const a = 1;\n")?;
    std::fs::write(root.join("src/blob.ts"), [0u8, 159, 146, 150, 0, 1])?;

    let cfg = Config::defaults_for(root)?;
    let files = Scanner::from_config(&cfg).scan().files;
    let records = classify_all(&files, root, &cfg.thresholds);
    let blob = records
        .iter()
        .find(|r| r.relative == "src/blob.ts")
        .ok_or_else(|| anyhow::anyhow!("blob not scanned"))?;
    assert!(blob.is_unknown());
    assert!(!blob.needs_transform);
    assert!(records.iter().any(|r| r.relative == "src/a.ts" && !r.is_unknown()));
    Ok(())
}
