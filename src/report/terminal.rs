// src/report/terminal.rs
//! Colored end-of-run digest on stdout.

use super::{FileMetric, RunReport};
use crate::verification::StepStatus;
use colored::Colorize;
use std::time::Duration;

fn pluralize(word: &str, count: usize) -> String {
    if count == 1 {
        word.to_string()
    } else {
        format!("{word}s")
    }
}

fn print_top(title: &str, before: &[FileMetric], after: &[FileMetric], pick: fn(&FileMetric) -> usize) {
    if before.is_empty() {
        return;
    }
    println!("\n{}", title.bold());
    let rows = before.len().max(after.len());
    for i in 0..rows {
        let b = before
            .get(i)
            .map_or_else(String::new, |m| format!("{:>6}  {}", pick(m), m.path));
        let a = after
            .get(i)
            .map_or_else(String::new, |m| format!("{:>6}  {}", pick(m), m.path));
        println!("  {b:<48} {} {a}", "->".dimmed());
    }
}

/// Prints the summary. Counts first, then the three triage lists.
pub fn print_summary(report: &RunReport) {
    let c = &report.counts;
    let mode = if report.dry_run { " (dry run)".yellow().to_string() } else { String::new() };
    println!("{} reforge run {}{mode}", "==".cyan().bold(), report.run_id.bold());
    println!(
        "  scanned {}, classified {}, transformed {}, skipped {}, failed {}",
        c.scanned, c.classified, c.transformed, c.skipped, c.failed
    );
    println!(
        "  duplicate groups: {} found, {} consolidated",
        report.duplicates.groups_found, report.duplicates.groups_consolidated
    );
    println!("  lines: {} -> {}", report.lines_before, report.lines_after);

    print_top("Largest files (lines)", &report.largest_before, &report.largest_after, |m| m.lines);
    print_top(
        "Most complex files",
        &report.most_complex_before,
        &report.most_complex_after,
        |m| m.complexity,
    );

    if !report.changed.is_empty() {
        let verb = if report.dry_run { "would change" } else { "changed" };
        let n = report.changed.len();
        println!("\n{} {n} {} {verb}", "+".green().bold(), pluralize("file", n));
        for f in &report.changed {
            println!("  {} [{}] -> {} outputs", f.path, f.strategy, f.outputs.len());
        }
    }
    if !report.flagged_untouched.is_empty() {
        println!("\n{} {} flagged, left untouched", "~".yellow().bold(), report.flagged_untouched.len());
        for f in &report.flagged_untouched {
            println!("  {}: {}", f.path, f.reason.dimmed());
        }
    }
    if !report.failed.is_empty() {
        println!("\n{} {} failed", "X".red().bold(), report.failed.len());
        for f in &report.failed {
            println!("  {} [{}]: {}", f.path, f.strategy, f.error.red());
        }
    }

    println!();
    for step in &report.validation.steps {
        let label = match step.status {
            StepStatus::Passed => "passed".green(),
            StepStatus::Failed => "failed".red(),
            StepStatus::Inconclusive => "inconclusive".yellow(),
            StepStatus::Skipped => "skipped".dimmed(),
        };
        let errors = step.result.as_ref().map_or(0, |r| r.error_count());
        if errors > 0 {
            println!("  {:<10} {label} ({errors} {})", step.step.as_str(), pluralize("error", errors));
        } else {
            println!("  {:<10} {label}", step.step.as_str());
        }
    }

    let total: u64 = c.phase_ms.iter().map(|(_, ms)| ms).sum();
    let duration = Duration::from_millis(total);
    if let Some(err) = &report.fatal_error {
        println!("\n{} Fatal: {err}", "X".red().bold());
        if let (true, Some(id)) = (report.rolled_back, &report.snapshot) {
            println!("{} Working tree restored from snapshot {id}", "!".yellow().bold());
        }
    } else if report.failed.is_empty() {
        println!("\n{} Done in {duration:?}.", "OK".green().bold());
    } else {
        println!(
            "\n{} Done in {duration:?} with {} failed {}.",
            "~".yellow().bold(),
            report.failed.len(),
            pluralize("plan", report.failed.len())
        );
    }
}
