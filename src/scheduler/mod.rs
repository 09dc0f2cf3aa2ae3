// src/scheduler/mod.rs
//! Bounded pool driving the engine over every plan.
//!
//! Workers send their results over one channel; a single consumer owns the
//! result list and tracks each plan's state. `run` returns only once every
//! plan has a terminal result.

pub mod stats;

use crate::error::{ReforgeError, TransformError};
use crate::model::{PlanState, TransformationPlan, TransformationResult};
use crate::transform::{self, EngineContext};
use crossbeam_channel::unbounded;
use rayon::prelude::*;
use stats::RunStatistics;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};

enum Message {
    Started(usize),
    Finished(usize, TransformationResult),
    Fatal(usize, TransformationResult, ReforgeError),
}

#[derive(Debug)]
pub struct SchedulerOutcome {
    /// One per plan, in plan order.
    pub results: Vec<TransformationResult>,
    /// First fatal error, if any. Remaining plans were failed as aborted.
    pub fatal: Option<ReforgeError>,
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

enum Outcome {
    Done(TransformationResult),
    Fatal(ReforgeError),
}

/// Executes one plan, turning a panic into a failed result.
fn run_one(plan: &TransformationPlan, ctx: &EngineContext) -> Outcome {
    match panic::catch_unwind(AssertUnwindSafe(|| transform::execute(plan, ctx))) {
        Ok(Ok(result)) => Outcome::Done(result),
        Ok(Err(e)) => Outcome::Fatal(e),
        Err(payload) => Outcome::Done(TransformationResult::failed(
            plan,
            TransformError::Panicked(panic_message(payload.as_ref())),
            0,
        )),
    }
}

/// Executes `plans` on a pool of `jobs` threads.
///
/// # Errors
/// `ReforgeError::Scheduler` if the pool cannot be built. Engine fatals are
/// reported in the outcome, not as an error.
pub fn run(
    plans: &[TransformationPlan],
    jobs: usize,
    ctx: &EngineContext,
    stats: &RunStatistics,
) -> Result<SchedulerOutcome, ReforgeError> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs.max(1))
        .build()
        .map_err(|e| ReforgeError::Scheduler(e.to_string()))?;
    let abort = AtomicBool::new(false);
    let (tx, rx) = unbounded::<Message>();

    let (results, fatal) = std::thread::scope(|scope| {
        let consumer = scope.spawn(move || consume(plans, &rx, stats));

        pool.install(|| {
            plans.par_iter().enumerate().for_each_with(tx, |tx, (idx, plan)| {
                if abort.load(Ordering::SeqCst) {
                    let result = TransformationResult::failed(
                        plan,
                        TransformError::Aborted("an earlier plan hit a fatal error".into()),
                        0,
                    );
                    let _ = tx.send(Message::Finished(idx, result));
                    return;
                }
                let _ = tx.send(Message::Started(idx));
                match run_one(plan, ctx) {
                    Outcome::Done(result) => {
                        let _ = tx.send(Message::Finished(idx, result));
                    }
                    Outcome::Fatal(e) => {
                        abort.store(true, Ordering::SeqCst);
                        let result = TransformationResult::failed(plan, &e, 0);
                        let _ = tx.send(Message::Fatal(idx, result, e));
                    }
                }
            });
        });
        // All senders are dropped once `for_each_with` returns.
        consumer
            .join()
            .unwrap_or_else(|_| (Vec::new(), Some(ReforgeError::Scheduler("result consumer panicked".into()))))
    });

    Ok(SchedulerOutcome { results, fatal })
}

fn consume(
    plans: &[TransformationPlan],
    rx: &crossbeam_channel::Receiver<Message>,
    stats: &RunStatistics,
) -> (Vec<TransformationResult>, Option<ReforgeError>) {
    let mut states = vec![PlanState::Pending; plans.len()];
    let mut slots: Vec<Option<TransformationResult>> = vec![None; plans.len()];
    let mut fatal: Option<ReforgeError> = None;

    let mut settle = |idx: usize, result: TransformationResult, states: &mut [PlanState]| {
        match states[idx].advance(result.state) {
            Some(next) => states[idx] = next,
            None => {
                tracing::warn!(file = %result.relative, from = ?states[idx], to = ?result.state, "illegal plan transition");
                return;
            }
        }
        if result.is_success() {
            RunStatistics::add(&stats.transformed, 1);
        } else {
            RunStatistics::add(&stats.failed, 1);
        }
        slots[idx] = Some(result);
    };

    for msg in rx {
        match msg {
            Message::Started(idx) => {
                if let Some(next) = states[idx].advance(PlanState::InProgress) {
                    states[idx] = next;
                }
            }
            Message::Finished(idx, result) => settle(idx, result, &mut states),
            Message::Fatal(idx, result, e) => {
                tracing::error!(file = %result.relative, error = %e, "fatal error, aborting remaining plans");
                settle(idx, result, &mut states);
                fatal.get_or_insert(e);
            }
        }
    }

    let results = slots
        .into_iter()
        .zip(plans)
        .map(|(slot, plan)| {
            slot.unwrap_or_else(|| {
                TransformationResult::failed(plan, TransformError::Aborted("no result recorded".into()), 0)
            })
        })
        .collect();
    (results, fatal)
}
