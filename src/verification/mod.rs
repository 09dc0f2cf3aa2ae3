//! Post-transformation validation: formatter, checker and tests, run as
//! external commands in the working-tree root.
//!
//! Every step is advisory. Nothing here can fail or roll back a run.

mod command;
mod runner;

pub use command::CommandResult;
pub use runner::run_single_command;

use crate::config::ValidationSection;
use serde::Serialize;
use std::path::Path;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Formatter,
    Checker,
    Tests,
}

impl Step {
    pub const ALL: [Step; 3] = [Self::Formatter, Self::Checker, Self::Tests];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Formatter => "formatter",
            Self::Checker => "checker",
            Self::Tests => "tests",
        }
    }

    fn command(self, section: &ValidationSection) -> Option<&str> {
        let cmd = match self {
            Self::Formatter => section.formatter.as_deref(),
            Self::Checker => section.checker.as_deref(),
            Self::Tests => section.tests.as_deref(),
        };
        cmd.filter(|c| !c.trim().is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Passed,
    Failed,
    /// Timed out; the process was killed.
    Inconclusive,
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub step: Step,
    pub status: StepStatus,
    /// Why a step was skipped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<CommandResult>,
}

impl StepOutcome {
    fn skipped(step: Step, reason: &str) -> Self {
        Self {
            step,
            status: StepStatus::Skipped,
            reason: Some(reason.to_string()),
            result: None,
        }
    }

    fn from_result(step: Step, result: CommandResult) -> Self {
        let status = if result.is_timed_out() {
            StepStatus::Inconclusive
        } else if result.passed() {
            StepStatus::Passed
        } else {
            StepStatus::Failed
        };
        Self {
            step,
            status,
            reason: None,
            result: Some(result),
        }
    }
}

/// Outcome of the validation phase.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub steps: Vec<StepOutcome>,
    pub duration_ms: u64,
}

impl ValidationReport {
    /// Every step skipped for the same reason (dry run, `--no-validate`, fatal run).
    #[must_use]
    pub fn skipped(reason: &str) -> Self {
        Self {
            steps: Step::ALL.iter().map(|s| StepOutcome::skipped(*s, reason)).collect(),
            duration_ms: 0,
        }
    }

    #[must_use]
    pub fn count(&self, status: StepStatus) -> usize {
        self.steps.iter().filter(|s| s.status == status).count()
    }

    /// True when nothing failed or timed out.
    #[must_use]
    pub fn clean(&self) -> bool {
        self.count(StepStatus::Failed) == 0 && self.count(StepStatus::Inconclusive) == 0
    }
}

/// Runs each configured step in order. A failing step does not stop the next.
///
/// The `on_step` callback is invoked before each command executes.
pub fn run<F>(root: &Path, section: &ValidationSection, timeout: Duration, mut on_step: F) -> ValidationReport
where
    F: FnMut(Step, &str),
{
    let start = Instant::now();
    let mut steps = Vec::with_capacity(Step::ALL.len());
    for step in Step::ALL {
        let Some(cmd) = step.command(section) else {
            steps.push(StepOutcome::skipped(step, "not configured"));
            continue;
        };
        on_step(step, cmd);
        let result = run_single_command(root, cmd, timeout);
        let outcome = StepOutcome::from_result(step, result);
        tracing::info!(step = step.as_str(), status = ?outcome.status, "validation step finished");
        steps.push(outcome);
    }
    ValidationReport {
        steps,
        duration_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
    }
}
