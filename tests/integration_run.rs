// tests/integration_run.rs - end-to-end runs over small TypeScript trees
mod common;

use common::{config, scenario_tree, tree_hashes, TOTAL};
use reforge_core::classify::classify_all;
use reforge_core::discovery::Scanner;
use reforge_core::dispatch::{plan_all, DispatchContext};
use reforge_core::duplicates;
use reforge_core::exit::ReforgeExit;
use reforge_core::model::Strategy;
use reforge_core::pipeline::Pipeline;
use reforge_core::syntax::refs::Resolver;
use std::fs;
use tempfile::TempDir;

#[test]
fn duplicate_and_oversized_files_get_the_expected_plans() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let root = dir.path();
    scenario_tree(root)?;
    let cfg = config(root)?;

    let scanned = Scanner::from_config(&cfg).scan();
    let mut records = classify_all(&scanned.files, root, &cfg.thresholds);
    let sources = duplicates::load_sources(&records);
    let dups = duplicates::detect(&mut records, &sources, &cfg.duplicates);
    assert_eq!(dups.groups.len(), 1);
    assert_eq!(dups.groups[0].canonical, "src/A.ts");

    let resolver = Resolver::new(records.iter().map(|r| r.path.clone()));
    let ctx = DispatchContext {
        root,
        thresholds: &cfg.thresholds,
    };
    let plans = plan_all(&records, &dups.groups, &ctx, &resolver);
    let mut summary: Vec<(&str, Strategy)> = plans.iter().map(|p| (p.relative.as_str(), p.strategy)).collect();
    summary.sort_unstable_by_key(|s| s.0);
    assert_eq!(
        summary,
        vec![("src/C.ts", Strategy::SplitByChunk), ("src/shared/B.ts", Strategy::Consolidate)]
    );
    assert_eq!(plans.len(), 2);
    assert!(plans.iter().all(|p| p.relative != "src/A.ts"));

    let consolidate = plans
        .iter()
        .find(|p| p.strategy == Strategy::Consolidate)
        .ok_or_else(|| anyhow::anyhow!("no consolidate plan"))?;
    assert_eq!(consolidate.params.canonical.as_deref(), Some(root.join("src/A.ts").as_path()));
    assert_eq!(consolidate.params.dependents, vec![root.join("src/app.ts")]);
    Ok(())
}

#[test]
fn run_consolidates_splits_and_redirects_importers() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let root = dir.path();
    scenario_tree(root)?;
    let cfg = config(root)?;

    let outcome = Pipeline::new(&cfg).run();
    assert_eq!(outcome.exit, ReforgeExit::Success);
    assert!(outcome.report.failed.is_empty(), "{:?}", outcome.report.failed);
    assert_eq!(outcome.report.counts.transformed, 2);
    assert_eq!(outcome.report.duplicates.groups_consolidated, 1);

    assert_eq!(fs::read_to_string(root.join("src/A.ts"))?, TOTAL);
    assert_eq!(fs::read_to_string(root.join("src/shared/B.ts"))?, "export * from '../A';\n");
    assert!(fs::read_to_string(root.join("src/app.ts"))?.contains("from './A'"));
    let aggregator = fs::read_to_string(root.join("src/C.ts"))?;
    assert!(aggregator.contains("from './C/part_1'"));
    assert!(root.join("src/C/part_3.ts").exists());

    let report_path = outcome.report_path.ok_or_else(|| anyhow::anyhow!("report not written"))?;
    assert!(report_path.starts_with(root.join(".reforge/reports")));
    assert!(outcome.report.snapshot.is_some());
    Ok(())
}

#[test]
fn second_run_over_own_output_changes_nothing() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let root = dir.path();
    scenario_tree(root)?;
    let cfg = config(root)?;

    let first = Pipeline::new(&cfg).run();
    assert_eq!(first.exit, ReforgeExit::Success);
    let after_first = tree_hashes(root)?;

    let second = Pipeline::new(&cfg).run();
    assert_eq!(second.exit, ReforgeExit::Success);
    assert_eq!(second.report.counts.transformed, 0);
    assert!(second.report.changed.is_empty());
    assert!(second.report.snapshot.is_none());
    assert_eq!(tree_hashes(root)?, after_first);
    Ok(())
}

#[test]
fn dry_run_reports_changes_without_touching_disk() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let root = dir.path();
    scenario_tree(root)?;
    let before = tree_hashes(root)?;
    let mut cfg = config(root)?;
    cfg.dry_run = true;

    let outcome = Pipeline::new(&cfg).run();
    assert_eq!(outcome.exit, ReforgeExit::Success);
    assert_eq!(outcome.report.changed.len(), 2);
    assert!(outcome.report.changed.iter().all(|c| !c.written));
    assert_eq!(tree_hashes(root)?, before);
    assert!(!root.join(".reforge/backups").exists());
    Ok(())
}

#[test]
fn small_unique_files_are_left_alone() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let root = dir.path();
    common::write(root, "src/a.ts", "export const a = 1;\n")?;
    common::write(root, "src/b.py", "def b():\n    return 2\n")?;
    common::write(root, "src/lib.rs", "pub fn c() -> u8 {\n    3\n}\n")?;
    let before = tree_hashes(root)?;

    let outcome = Pipeline::new(&config(root)?).run();
    assert_eq!(outcome.exit, ReforgeExit::Success);
    assert_eq!(outcome.report.counts.transformed, 0);
    assert_eq!(outcome.report.counts.skipped, 3);
    assert_eq!(tree_hashes(root)?, before);
    Ok(())
}

#[test]
fn split_canonical_keeps_default_for_its_duplicate() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let root = dir.path();
    let mut module = String::new();
    for n in 0..12 {
        module.push_str(&format!("export function h{n}(x: number): number {{\n  return x * {n};\n}}\n\n"));
    }
    module.push_str("export default function main(): number {\n  return h1(2);\n}\n");
    common::write(root, "src/A.ts", &module)?;
    common::write(root, "src/shared/B.ts", &module)?;
    let mut cfg = config(root)?;
    cfg.thresholds.size = 40;
    cfg.scheduler.jobs = 1;

    let outcome = Pipeline::new(&cfg).run();
    assert_eq!(outcome.exit, ReforgeExit::Success);
    assert!(outcome.report.failed.is_empty(), "{:?}", outcome.report.failed);
    assert_eq!(outcome.report.counts.transformed, 2);

    let aggregator = fs::read_to_string(root.join("src/A.ts"))?;
    assert!(aggregator.contains("export { default } from './A/part_"), "{aggregator}");
    assert_eq!(
        fs::read_to_string(root.join("src/shared/B.ts"))?,
        "export * from '../A';\nexport { default } from '../A';\n"
    );
    Ok(())
}
