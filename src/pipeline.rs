// src/pipeline.rs
//! Phase ordering for one `reforge run`.
//!
//! scan -> classify -> detect -> dispatch -> snapshot -> transform ->
//! validate -> report. Cancellation is checked before every phase. Any fatal
//! error once the snapshot exists restores the tree from it.

use crate::backup::BackupStore;
use crate::classify::classify_all;
use crate::config::Config;
use crate::discovery::Scanner;
use crate::dispatch::{plan_all, DispatchContext};
use crate::duplicates::{self, DuplicateReport};
use crate::error::ReforgeError;
use crate::events::{EventKind, EventLogger};
use crate::exit::ReforgeExit;
use crate::model::{BackupSnapshot, FileRecord, TransformationPlan, TransformationResult};
use crate::report::{self, json, ReportInput, RunReport};
use crate::scheduler::{self, stats::Phase, stats::RunStatistics};
use crate::syntax::refs::Resolver;
use crate::transform::writer::{FsSink, OutputSink};
use crate::transform::EngineContext;
use crate::verification::{self, ValidationReport};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cooperative cancellation, checked at phase boundaries.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// `YYYYMMDD-HHMMSS-<pid>`.
#[must_use]
pub fn base_run_id() -> String {
    format!(
        "{}-{}",
        chrono::Local::now().format("%Y%m%d-%H%M%S"),
        std::process::id()
    )
}

#[derive(Debug)]
pub struct RunOutcome {
    pub report: RunReport,
    /// Where the JSON report landed, if it could be written.
    pub report_path: Option<PathBuf>,
    pub exit: ReforgeExit,
}

pub struct Pipeline<'a> {
    config: &'a Config,
    sink: &'a dyn OutputSink,
    cancel: CancellationToken,
    on_phase: Option<Box<dyn Fn(Phase) + 'a>>,
}

/// State accumulated across phases.
#[derive(Default)]
struct RunState {
    records: Vec<FileRecord>,
    duplicates: DuplicateReport,
    plans: Vec<TransformationPlan>,
    resolver: Resolver,
    snapshot: Option<BackupSnapshot>,
    results: Vec<TransformationResult>,
    fatal: Option<ReforgeError>,
    rolled_back: bool,
}

impl<'a> Pipeline<'a> {
    #[must_use]
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            sink: &FsSink,
            cancel: CancellationToken::new(),
            on_phase: None,
        }
    }

    #[must_use]
    pub fn with_sink(mut self, sink: &'a dyn OutputSink) -> Self {
        self.sink = sink;
        self
    }

    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Called as each phase is about to start, before the cancellation check.
    #[must_use]
    pub fn on_phase(mut self, hook: impl Fn(Phase) + 'a) -> Self {
        self.on_phase = Some(Box::new(hook));
        self
    }

    /// True if the phase may run. Records a cancellation as fatal.
    fn enter(&self, phase: Phase, state: &mut RunState) -> bool {
        if state.fatal.is_some() {
            return false;
        }
        if let Some(hook) = &self.on_phase {
            hook(phase);
        }
        if self.cancel.is_cancelled() {
            tracing::warn!(phase = phase.as_str(), "run cancelled");
            state.fatal = Some(ReforgeError::Cancelled(phase.as_str()));
            return false;
        }
        tracing::info!(phase = phase.as_str(), "phase started");
        true
    }

    pub fn run(&self) -> RunOutcome {
        let config = self.config;
        let store = BackupStore::new(&config.root);
        let run_id = store.unique_id(&base_run_id());
        let events = EventLogger::new(&config.state_dir(), &run_id);
        let stats = RunStatistics::new();
        let mut state = RunState::default();

        events.log(EventKind::RunStarted {
            root: config.root.display().to_string(),
            dry_run: config.dry_run,
        });
        tracing::info!(%run_id, root = %config.root.display(), dry_run = config.dry_run, "run started");

        if self.enter(Phase::Scan, &mut state) {
            let t = Instant::now();
            let outcome = Scanner::from_config(config).scan();
            RunStatistics::set(&stats.scanned, outcome.files.len());
            RunStatistics::set(&stats.scan_errors, outcome.errors);
            stats.record_phase(Phase::Scan, t.elapsed());

            if self.enter(Phase::Classify, &mut state) {
                let t = Instant::now();
                state.records = classify_all(&outcome.files, &config.root, &config.thresholds);
                RunStatistics::set(&stats.classified, state.records.iter().filter(|r| !r.is_unknown()).count());
                stats.record_phase(Phase::Classify, t.elapsed());
            }
        }

        if self.enter(Phase::Detect, &mut state) {
            let t = Instant::now();
            let sources = duplicates::load_sources(&state.records);
            state.duplicates = duplicates::detect(&mut state.records, &sources, &config.duplicates);
            RunStatistics::set(&stats.groups_found, state.duplicates.groups.len());
            stats.record_phase(Phase::Detect, t.elapsed());
        }

        if self.enter(Phase::Dispatch, &mut state) {
            let t = Instant::now();
            state.resolver = Resolver::new(state.records.iter().map(|r| r.path.clone()));
            let ctx = DispatchContext {
                root: &config.root,
                thresholds: &config.thresholds,
            };
            state.plans = plan_all(&state.records, &state.duplicates.groups, &ctx, &state.resolver);
            RunStatistics::set(&stats.skipped, state.records.len().saturating_sub(state.plans.len()));
            stats.record_phase(Phase::Dispatch, t.elapsed());
        }

        if !config.dry_run && !state.plans.is_empty() && self.enter(Phase::Snapshot, &mut state) {
            let t = Instant::now();
            match store.create(&run_id) {
                Ok(snap) => {
                    events.log(EventKind::SnapshotCreated {
                        id: snap.id.clone(),
                        files: snap.file_count,
                    });
                    state.snapshot = Some(snap);
                }
                Err(e) => {
                    tracing::error!(error = %e, "snapshot failed, nothing will be changed");
                    state.fatal = Some(e);
                }
            }
            stats.record_phase(Phase::Snapshot, t.elapsed());
        }

        if self.enter(Phase::Transform, &mut state) {
            let t = Instant::now();
            self.transform(&mut state, &stats, &events);
            stats.record_phase(Phase::Transform, t.elapsed());
        }

        let validation = self.validate(&mut state, &stats, &events);

        if let Some(e) = &state.fatal {
            events.log(EventKind::FatalError { error: e.to_string() });
            if let Some(snap) = &state.snapshot {
                state.rolled_back = rollback(&store, snap, &events);
            }
        } else if state.snapshot.is_some() {
            if let Err(e) = store.prune(config.backup.retention) {
                tracing::warn!(error = %e, "snapshot retention skipped");
            }
        }

        let t = Instant::now();
        RunStatistics::set(
            &stats.groups_consolidated,
            report::consolidated_groups(&state.duplicates.groups, &state.results),
        );
        let report = RunReport::build(&ReportInput {
            run_id: &run_id,
            config,
            records: &state.records,
            duplicates: &state.duplicates,
            results: &state.results,
            validation: &validation,
            stats: &stats,
            snapshot: state.snapshot.as_ref().map(|s| s.id.as_str()),
            rolled_back: state.rolled_back,
            fatal_error: state.fatal.as_ref().map(ToString::to_string),
        });
        let path = config
            .report_path
            .clone()
            .unwrap_or_else(|| json::default_path(&config.state_dir(), &run_id));
        let report_path = match json::write_report(&report, &path) {
            Ok(()) => Some(path),
            Err(e) => {
                tracing::error!(error = %e, "report not written");
                None
            }
        };
        stats.record_phase(Phase::Report, t.elapsed());

        let snap = stats.snapshot();
        events.log(EventKind::RunFinished {
            transformed: snap.transformed,
            failed: snap.failed,
            rolled_back: state.rolled_back,
        });
        let exit = if state.fatal.is_some() {
            ReforgeExit::Fatal
        } else {
            ReforgeExit::Success
        };
        tracing::info!(%run_id, transformed = snap.transformed, failed = snap.failed, ?exit, "run finished");
        RunOutcome {
            report,
            report_path,
            exit,
        }
    }

    fn transform(&self, state: &mut RunState, stats: &RunStatistics, events: &EventLogger) {
        let timeout = match self.config.plan_timeout() {
            d if d.is_zero() => None,
            d => Some(d),
        };
        let ctx = EngineContext {
            resolver: &state.resolver,
            dry_run: self.config.dry_run,
            timeout,
            sink: self.sink,
        };
        match scheduler::run(&state.plans, self.config.jobs(), &ctx, stats) {
            Ok(outcome) => {
                for r in &outcome.results {
                    events.log(match &r.error {
                        None => EventKind::PlanSucceeded {
                            path: r.relative.clone(),
                            strategy: r.strategy.to_string(),
                            outputs: r.outputs.len(),
                        },
                        Some(e) => EventKind::PlanFailed {
                            path: r.relative.clone(),
                            strategy: r.strategy.to_string(),
                            error: e.clone(),
                        },
                    });
                }
                state.results = outcome.results;
                state.fatal = outcome.fatal;
            }
            Err(e) => state.fatal = Some(e),
        }
    }

    fn validate(&self, state: &mut RunState, stats: &RunStatistics, events: &EventLogger) -> ValidationReport {
        let config = self.config;
        let reason = if config.dry_run {
            Some("dry run")
        } else if !config.validate {
            Some("--no-validate")
        } else if state.results.iter().all(|r| !r.written) {
            Some("nothing written")
        } else {
            None
        };
        if let Some(reason) = reason {
            if state.fatal.is_none() {
                return ValidationReport::skipped(reason);
            }
        }
        if !self.enter(Phase::Validate, state) {
            return ValidationReport::skipped("fatal error");
        }
        let t = Instant::now();
        let report = verification::run(&config.root, &config.validation, validation_timeout(config), |step, cmd| {
            tracing::info!(step = step.as_str(), command = cmd, "running validation step");
        });
        for step in &report.steps {
            events.log(EventKind::ValidationStep {
                step: step.step.as_str().to_string(),
                status: format!("{:?}", step.status).to_lowercase(),
            });
        }
        stats.record_phase(Phase::Validate, t.elapsed());
        report
    }
}

fn validation_timeout(config: &Config) -> Duration {
    match config.validation_timeout() {
        d if d.is_zero() => Duration::from_secs(u64::from(u32::MAX)),
        d => d,
    }
}

fn rollback(store: &BackupStore, snap: &BackupSnapshot, events: &EventLogger) -> bool {
    tracing::warn!(snapshot = %snap.id, "rolling back");
    match store.restore(&snap.id) {
        Ok(summary) => {
            events.log(EventKind::RollbackCompleted {
                snapshot: snap.id.clone(),
                restored: summary.restored,
                deleted: summary.deleted,
            });
            true
        }
        Err(e) => {
            tracing::error!(snapshot = %snap.id, error = %e, "rollback failed, restore manually with `reforge rollback`");
            events.log(EventKind::RollbackFailed {
                snapshot: snap.id.clone(),
                error: e.to_string(),
            });
            false
        }
    }
}
