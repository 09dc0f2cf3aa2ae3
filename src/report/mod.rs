// src/report/mod.rs
//! End-of-run summary: the JSON document and the terminal digest.

pub mod json;
pub mod terminal;

use crate::classify::{is_oversized, metrics};
use crate::config::Config;
use crate::duplicates::DuplicateReport;
use crate::lang::Lang;
use crate::model::{
    DuplicateGroup, FileRecord, NearDuplicateGroup, PartialDuplicate, Strategy, TransformationResult,
};
use crate::scheduler::stats::{RunStatistics, StatsSnapshot};
use crate::utils::{line_count, normalize_path};
use crate::verification::ValidationReport;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize)]
pub struct ConfigSummary {
    pub size_threshold: usize,
    pub complexity_threshold: usize,
    pub jobs: usize,
    pub plan_timeout_secs: u64,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub structural_duplicates: bool,
    pub validate: bool,
}

impl ConfigSummary {
    fn of(config: &Config) -> Self {
        Self {
            size_threshold: config.thresholds.size,
            complexity_threshold: config.thresholds.complexity,
            jobs: config.jobs(),
            plan_timeout_secs: config.scheduler.plan_timeout_secs,
            include: config.include.clone(),
            exclude: config.exclude.clone(),
            structural_duplicates: config.duplicates.structural,
            validate: config.validate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileMetric {
    pub path: String,
    pub lines: usize,
    pub complexity: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DuplicateSummary {
    pub groups_found: usize,
    pub groups_consolidated: usize,
    pub groups: Vec<DuplicateGroup>,
    pub partial: Vec<PartialDuplicate>,
    pub near: Vec<NearDuplicateGroup>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChangedFile {
    pub path: String,
    pub strategy: Strategy,
    /// Root-relative paths of every file the plan produced or rewrote.
    pub outputs: Vec<String>,
    /// False in dry-run mode.
    pub written: bool,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FlaggedFile {
    pub path: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedFile {
    pub path: String,
    pub strategy: Strategy,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub timestamp: String,
    pub root: String,
    pub dry_run: bool,
    pub rolled_back: bool,
    /// Snapshot taken before mutation. `None` in dry-run mode.
    pub snapshot: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fatal_error: Option<String>,
    pub config: ConfigSummary,
    pub counts: StatsSnapshot,
    pub duplicates: DuplicateSummary,
    pub lines_before: usize,
    pub lines_after: usize,
    pub largest_before: Vec<FileMetric>,
    pub largest_after: Vec<FileMetric>,
    pub most_complex_before: Vec<FileMetric>,
    pub most_complex_after: Vec<FileMetric>,
    pub validation: ValidationReport,
    pub changed: Vec<ChangedFile>,
    pub flagged_untouched: Vec<FlaggedFile>,
    pub failed: Vec<FailedFile>,
}

/// Everything the report is built from.
pub struct ReportInput<'a> {
    pub run_id: &'a str,
    pub config: &'a Config,
    pub records: &'a [FileRecord],
    pub duplicates: &'a DuplicateReport,
    pub results: &'a [TransformationResult],
    pub validation: &'a ValidationReport,
    pub stats: &'a RunStatistics,
    pub snapshot: Option<&'a str>,
    pub rolled_back: bool,
    pub fatal_error: Option<String>,
}

/// Groups with at least one member successfully replaced by a re-export.
#[must_use]
pub fn consolidated_groups(groups: &[DuplicateGroup], results: &[TransformationResult]) -> usize {
    let done: BTreeSet<&str> = results
        .iter()
        .filter(|r| r.strategy == Strategy::Consolidate && r.is_success())
        .map(|r| r.relative.as_str())
        .collect();
    groups
        .iter()
        .filter(|g| g.non_canonical().any(|m| done.contains(m.as_str())))
        .count()
}

fn rel(root: &Path, path: &Path) -> String {
    normalize_path(path.strip_prefix(root).unwrap_or(path))
}

/// Per-file (lines, complexity) before the run.
fn metrics_before(records: &[FileRecord]) -> BTreeMap<PathBuf, (usize, usize)> {
    records
        .iter()
        .filter(|r| !r.is_unknown())
        .map(|r| (r.path.clone(), (r.line_count, r.complexity)))
        .collect()
}

/// `before` with every successful output laid over it.
fn metrics_after(
    before: &BTreeMap<PathBuf, (usize, usize)>,
    results: &[TransformationResult],
) -> BTreeMap<PathBuf, (usize, usize)> {
    let mut after = before.clone();
    for out in results.iter().filter(|r| r.is_success()).flat_map(|r| &r.outputs) {
        let lang = Lang::from_path(&out.path);
        after.insert(
            out.path.clone(),
            (line_count(&out.content), metrics::complexity(&out.content, lang)),
        );
    }
    after
}

fn top_n(
    root: &Path,
    table: &BTreeMap<PathBuf, (usize, usize)>,
    n: usize,
    key: impl Fn(&(usize, usize)) -> usize,
) -> Vec<FileMetric> {
    let mut rows: Vec<(&PathBuf, &(usize, usize))> = table.iter().collect();
    // Stable sort over path order keeps ties deterministic.
    rows.sort_by(|a, b| key(b.1).cmp(&key(a.1)));
    rows.into_iter()
        .take(n)
        .map(|(p, (lines, complexity))| FileMetric {
            path: rel(root, p),
            lines: *lines,
            complexity: *complexity,
        })
        .collect()
}

fn flagged(input: &ReportInput, planned: &BTreeSet<&str>) -> Vec<FlaggedFile> {
    let mut out: Vec<FlaggedFile> = Vec::new();
    if input.rolled_back {
        out.extend(input.results.iter().filter(|r| r.is_success()).map(|r| FlaggedFile {
            path: r.relative.clone(),
            reason: "transformed, then rolled back".to_string(),
        }));
    }
    for record in input.records {
        if planned.contains(record.relative.as_str()) {
            continue;
        }
        if record.needs_transform || is_oversized(record, &input.config.thresholds) {
            out.push(FlaggedFile {
                path: record.relative.clone(),
                reason: "oversized, no applicable strategy".to_string(),
            });
        }
    }
    for p in &input.duplicates.partials {
        if planned.contains(p.file.as_str()) {
            continue;
        }
        out.push(FlaggedFile {
            path: p.file.clone(),
            reason: format!(
                "lines {}-{} repeated in {}",
                p.start_line,
                p.end_line,
                p.also_in.join(", ")
            ),
        });
    }
    for group in &input.duplicates.near {
        for member in &group.members {
            let others: Vec<&str> = group
                .members
                .iter()
                .filter(|m| *m != member)
                .map(String::as_str)
                .collect();
            out.push(FlaggedFile {
                path: member.clone(),
                reason: format!("near duplicate of {}", others.join(", ")),
            });
        }
    }
    out
}

impl RunReport {
    #[must_use]
    pub fn build(input: &ReportInput) -> Self {
        let root = input.config.root.as_path();
        let top = input.config.report.top_n;
        let before = metrics_before(input.records);
        let after = if input.rolled_back {
            before.clone()
        } else {
            metrics_after(&before, input.results)
        };
        let lines_before: usize = before.values().map(|m| m.0).sum();
        let lines_after: usize = after.values().map(|m| m.0).sum();
        RunStatistics::set(&input.stats.lines_before, lines_before);
        RunStatistics::set(&input.stats.lines_after, lines_after);

        let planned: BTreeSet<&str> = input.results.iter().map(|r| r.relative.as_str()).collect();
        let changed = if input.rolled_back {
            Vec::new()
        } else {
            input
                .results
                .iter()
                .filter(|r| r.is_success())
                .map(|r| ChangedFile {
                    path: r.relative.clone(),
                    strategy: r.strategy,
                    outputs: r.outputs.iter().map(|o| rel(root, &o.path)).collect(),
                    written: r.written,
                    duration_ms: r.duration_ms,
                })
                .collect()
        };
        let failed = input
            .results
            .iter()
            .filter(|r| !r.is_success())
            .map(|r| FailedFile {
                path: r.relative.clone(),
                strategy: r.strategy,
                error: r.error.clone().unwrap_or_default(),
            })
            .collect();

        let counts = input.stats.snapshot();
        Self {
            run_id: input.run_id.to_string(),
            timestamp: chrono::Local::now().to_rfc3339(),
            root: normalize_path(root),
            dry_run: input.config.dry_run,
            rolled_back: input.rolled_back,
            snapshot: input.snapshot.map(String::from),
            fatal_error: input.fatal_error.clone(),
            config: ConfigSummary::of(input.config),
            duplicates: DuplicateSummary {
                groups_found: input.duplicates.groups.len(),
                groups_consolidated: counts.duplicate_groups_consolidated,
                groups: input.duplicates.groups.clone(),
                partial: input.duplicates.partials.clone(),
                near: input.duplicates.near.clone(),
            },
            counts,
            lines_before,
            lines_after,
            largest_before: top_n(root, &before, top, |m| m.0),
            largest_after: top_n(root, &after, top, |m| m.0),
            most_complex_before: top_n(root, &before, top, |m| m.1),
            most_complex_after: top_n(root, &after, top, |m| m.1),
            validation: input.validation.clone(),
            flagged_untouched: flagged(input, &planned),
            changed,
            failed,
        }
    }
}
