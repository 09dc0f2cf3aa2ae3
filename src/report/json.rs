// src/report/json.rs
use super::RunReport;
use crate::transform::writer::write_atomic;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub const REPORTS_DIR: &str = "reports";

/// `.reforge/reports/<run-id>.json`.
#[must_use]
pub fn default_path(state_dir: &Path, run_id: &str) -> PathBuf {
    state_dir.join(REPORTS_DIR).join(format!("{run_id}.json"))
}

/// Serializes `report` to `path`.
///
/// # Errors
/// Returns error if serialization or the write fails.
pub fn write_report(report: &RunReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
    write_atomic(path, json.as_bytes())
        .with_context(|| format!("Failed to write report to {}", path.display()))?;
    Ok(())
}
