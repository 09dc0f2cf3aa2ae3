// src/scheduler/stats.rs
//! Run-wide counters. Written concurrently by workers, read by the report.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Scan,
    Classify,
    Detect,
    Dispatch,
    Snapshot,
    Transform,
    Validate,
    Report,
}

impl Phase {
    pub const COUNT: usize = 8;
    pub const ALL: [Phase; Self::COUNT] = [
        Self::Scan,
        Self::Classify,
        Self::Detect,
        Self::Dispatch,
        Self::Snapshot,
        Self::Transform,
        Self::Validate,
        Self::Report,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scan => "scan",
            Self::Classify => "classify",
            Self::Detect => "detect",
            Self::Dispatch => "dispatch",
            Self::Snapshot => "snapshot",
            Self::Transform => "transform",
            Self::Validate => "validate",
            Self::Report => "report",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Default)]
pub struct RunStatistics {
    pub scanned: AtomicUsize,
    pub scan_errors: AtomicUsize,
    pub classified: AtomicUsize,
    pub transformed: AtomicUsize,
    pub skipped: AtomicUsize,
    pub failed: AtomicUsize,
    pub groups_found: AtomicUsize,
    pub groups_consolidated: AtomicUsize,
    pub lines_before: AtomicUsize,
    pub lines_after: AtomicUsize,
    phase_ms: [AtomicU64; Phase::COUNT],
}

/// Plain copy of the counters at one instant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub scanned: usize,
    pub scan_errors: usize,
    pub classified: usize,
    pub transformed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub duplicate_groups_found: usize,
    pub duplicate_groups_consolidated: usize,
    pub lines_before: usize,
    pub lines_after: usize,
    pub phase_ms: Vec<(Phase, u64)>,
}

impl RunStatistics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(counter: &AtomicUsize, n: usize) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub fn set(counter: &AtomicUsize, n: usize) {
        counter.store(n, Ordering::Relaxed);
    }

    pub fn record_phase(&self, phase: Phase, elapsed: Duration) {
        let ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        self.phase_ms[phase.index()].fetch_add(ms, Ordering::Relaxed);
    }

    #[must_use]
    pub fn phase_ms(&self, phase: Phase) -> u64 {
        self.phase_ms[phase.index()].load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        let get = |c: &AtomicUsize| c.load(Ordering::Relaxed);
        StatsSnapshot {
            scanned: get(&self.scanned),
            scan_errors: get(&self.scan_errors),
            classified: get(&self.classified),
            transformed: get(&self.transformed),
            skipped: get(&self.skipped),
            failed: get(&self.failed),
            duplicate_groups_found: get(&self.groups_found),
            duplicate_groups_consolidated: get(&self.groups_consolidated),
            lines_before: get(&self.lines_before),
            lines_after: get(&self.lines_after),
            phase_ms: Phase::ALL.iter().map(|p| (*p, self.phase_ms(*p))).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;

    #[test]
    fn concurrent_increments_are_not_lost() {
        let stats = RunStatistics::new();
        (0..1000).into_par_iter().for_each(|_| {
            RunStatistics::add(&stats.transformed, 1);
        });
        assert_eq!(stats.snapshot().transformed, 1000);
    }

    #[test]
    fn phase_timings_accumulate() {
        let stats = RunStatistics::new();
        stats.record_phase(Phase::Scan, Duration::from_millis(5));
        stats.record_phase(Phase::Scan, Duration::from_millis(7));
        assert_eq!(stats.phase_ms(Phase::Scan), 12);
        assert_eq!(stats.phase_ms(Phase::Report), 0);
    }
}
