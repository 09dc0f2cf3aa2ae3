// src/events.rs
//! Machine-readable run journal.
//!
//! Events are appended to `.reforge/events.jsonl`, one JSON object per line.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const EVENTS_FILE: &str = "events.jsonl";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    RunStarted {
        root: String,
        dry_run: bool,
    },
    SnapshotCreated {
        id: String,
        files: usize,
    },
    PlanSucceeded {
        path: String,
        strategy: String,
        outputs: usize,
    },
    PlanFailed {
        path: String,
        strategy: String,
        error: String,
    },
    FatalError {
        error: String,
    },
    RollbackCompleted {
        snapshot: String,
        restored: usize,
        deleted: usize,
    },
    RollbackFailed {
        snapshot: String,
        error: String,
    },
    ValidationStep {
        step: String,
        status: String,
    },
    RunFinished {
        transformed: usize,
        failed: usize,
        rolled_back: bool,
    },
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReforgeEvent {
    pub run_id: String,
    /// RFC 3339, local time.
    pub timestamp: String,
    pub kind: EventKind,
}

/// Appends events for one run. Cheap to share; writes are serialised.
#[derive(Debug)]
pub struct EventLogger {
    log_path: PathBuf,
    run_id: String,
    lock: Mutex<()>,
}

impl EventLogger {
    #[must_use]
    pub fn new(state_dir: &Path, run_id: &str) -> Self {
        Self {
            log_path: state_dir.join(EVENTS_FILE),
            run_id: run_id.to_string(),
            lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.log_path
    }

    /// Best-effort: a journal that cannot be written never stops a run.
    pub fn log(&self, kind: EventKind) {
        let written = self.serialize_event(kind).and_then(|json| self.append_to_file(&json));
        if let Err(e) = written {
            tracing::debug!(error = %e, "journal write skipped");
        }
    }

    fn serialize_event(&self, kind: EventKind) -> Result<String> {
        let event = ReforgeEvent {
            run_id: self.run_id.clone(),
            timestamp: chrono::Local::now().to_rfc3339(),
            kind,
        };
        Ok(serde_json::to_string(&event)?)
    }

    fn append_to_file(&self, line: &str) -> Result<()> {
        let _guard = self.lock.lock().map_err(|_| anyhow::anyhow!("journal lock poisoned"))?;
        if let Some(parent) = self.log_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)?;
        writeln!(file, "{line}")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn appends_one_line_per_event() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let logger = EventLogger::new(&dir.path().join(".reforge"), "r1");
        logger.log(EventKind::RunStarted {
            root: "/x".into(),
            dry_run: true,
        });
        logger.log(EventKind::FatalError { error: "boom".into() });

        let text = fs::read_to_string(logger.path())?;
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: ReforgeEvent = serde_json::from_str(lines[0])?;
        assert_eq!(first.run_id, "r1");
        assert!(lines[1].contains("\"fatal_error\""));
        Ok(())
    }
}
