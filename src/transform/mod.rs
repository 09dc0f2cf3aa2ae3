// src/transform/mod.rs
//! Executes one plan: parse, relocate, prepare every output in memory, then
//! flush them together.

pub mod chunk;
pub mod consolidate;
pub mod layout;
pub mod role;
pub mod split;
pub mod writer;

use crate::error::{ReforgeError, TransformError};
use crate::lang::{Lang, LangFamily};
use crate::model::{FileOutput, Strategy, TransformationPlan, TransformationResult};
use crate::syntax::refs::Resolver;
use crate::syntax::SymbolTree;
use layout::{chunk_names, Layout};
use split::{PartSpec, Split};
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};
use writer::OutputSink;

/// Everything a plan needs besides the plan itself. Shared across workers.
pub struct EngineContext<'a> {
    pub resolver: &'a Resolver,
    pub dry_run: bool,
    /// `None` disables the per-plan deadline.
    pub timeout: Option<Duration>,
    pub sink: &'a dyn OutputSink,
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Runs `plan`. Plan-level problems come back as a failed result with the
/// file untouched; `Err` means a write failed and the run must roll back.
///
/// # Errors
/// `ReforgeError::Fatal` if flushing the outputs fails.
pub fn execute(plan: &TransformationPlan, ctx: &EngineContext) -> Result<TransformationResult, ReforgeError> {
    let start = Instant::now();
    let outputs = match prepare(plan, ctx) {
        Ok(outputs) => outputs,
        Err(e) => {
            tracing::debug!(file = %plan.relative, strategy = %plan.strategy, error = %e, "plan failed");
            return Ok(TransformationResult::failed(plan, e, elapsed_ms(start)));
        }
    };

    if let Some(limit) = ctx.timeout {
        if start.elapsed() > limit {
            let ms = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX);
            return Ok(TransformationResult::failed(
                plan,
                TransformError::TimedOut(ms),
                elapsed_ms(start),
            ));
        }
    }

    if ctx.dry_run {
        return Ok(TransformationResult::succeeded(plan, outputs, false, elapsed_ms(start)));
    }
    writer::flush(ctx.sink, &outputs)?;
    tracing::debug!(file = %plan.relative, outputs = outputs.len(), "plan written");
    Ok(TransformationResult::succeeded(plan, outputs, true, elapsed_ms(start)))
}

/// Builds every output of `plan` without touching the filesystem.
///
/// # Errors
/// Returns `TransformError` when the plan cannot be applied safely.
pub fn prepare(plan: &TransformationPlan, ctx: &EngineContext) -> Result<Vec<FileOutput>, TransformError> {
    let lang = plan
        .lang
        .ok_or_else(|| TransformError::UnsupportedLanguage(plan.relative.clone()))?;
    let source = read(&plan.path)?;
    let tree = parse(lang, &plan.path, &source)?;
    match plan.strategy {
        Strategy::Consolidate => prepare_consolidate(plan, lang, &tree, ctx),
        Strategy::SplitByChunk => prepare_split(plan, lang, &tree, ctx, None),
        role => prepare_split(plan, lang, &tree, ctx, Some(role)),
    }
}

fn read(path: &Path) -> Result<String, TransformError> {
    fs::read_to_string(path).map_err(|e| TransformError::Read {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn parse(lang: Lang, path: &Path, source: &str) -> Result<SymbolTree, TransformError> {
    SymbolTree::parse(lang, source).map_err(|e| TransformError::Parse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn prepare_consolidate(
    plan: &TransformationPlan,
    lang: Lang,
    tree: &SymbolTree,
    ctx: &EngineContext,
) -> Result<Vec<FileOutput>, TransformError> {
    let canonical = plan
        .params
        .canonical
        .as_deref()
        .ok_or_else(|| TransformError::Ambiguous(format!("{} has no canonical member", plan.relative)))?;
    let canonical_lang = Lang::from_path(canonical).unwrap_or(lang);
    if canonical_lang.family() != lang.family() {
        return Err(TransformError::Ambiguous(format!(
            "{} and {} are different languages",
            plan.relative,
            canonical.display()
        )));
    }
    if !canonical.is_file() {
        return Err(TransformError::Read {
            path: canonical.to_path_buf(),
            reason: "canonical member is missing".to_string(),
        });
    }
    let content = consolidate::reexport(lang, &plan.path, tree, canonical, ctx.resolver)?;

    let mut outputs = vec![FileOutput {
        path: plan.path.clone(),
        content,
    }];
    for dependent in &plan.params.dependents {
        match consolidate::rewrite_dependent(dependent, &plan.params.redirects, ctx.resolver) {
            Ok(Some(out)) => outputs.push(out),
            Ok(None) => {}
            Err(e) => tracing::warn!(file = %dependent.display(), error = %e, "dependent left unchanged"),
        }
    }
    Ok(outputs)
}

fn prepare_split(
    plan: &TransformationPlan,
    lang: Lang,
    tree: &SymbolTree,
    ctx: &EngineContext,
    role: Option<Strategy>,
) -> Result<Vec<FileOutput>, TransformError> {
    if let Some(name) = split::pinned_writer(tree) {
        return Err(TransformError::Ambiguous(format!(
            "`{name}` is reassigned by code that stays in {}",
            plan.relative
        )));
    }
    let units = split::units(tree, &split::movable(tree));
    if units.len() < 2 {
        return Err(TransformError::NothingToSplit(format!(
            "{} has {} movable item(s)",
            plan.relative,
            units.len()
        )));
    }

    let grouped = role.and_then(|r| role::group(r, tree, &units));
    if role.is_some() && grouped.is_none() {
        tracing::debug!(file = %plan.relative, "fewer than two role groups, chunking instead");
    }
    let parts = match grouped {
        Some(parts) => parts,
        None => chunk_parts(tree, &units, plan.params.chunk_count.unwrap_or(2)),
    };

    let package = plan
        .path
        .parent()
        .is_some_and(|d| ctx.resolver.contains(&d.join("__init__.py")));
    let layout = Layout::new(lang, &plan.path).in_package(package);
    for part in &parts {
        let target = layout.part_path(&part.name);
        if target.exists() {
            return Err(TransformError::Ambiguous(format!(
                "{} already exists",
                target.display()
            )));
        }
    }

    let outputs = match lang.family() {
        LangFamily::Script => layout::script::render(&layout, &Split::build(tree, &parts, false)),
        LangFamily::Rust => layout::rust::render(&layout, tree, &Split::build(tree, &parts, true)),
        LangFamily::Python => layout::python::render(&layout, &Split::build(tree, &parts, false)),
    };
    Ok(outputs)
}

fn chunk_parts(tree: &SymbolTree, units: &[Vec<usize>], n: usize) -> Vec<PartSpec> {
    let weights: Vec<usize> = units
        .iter()
        .map(|u| u.iter().map(|&i| tree.items[i].line_weight()).sum())
        .collect();
    let ranges = chunk::partition(&weights, n);
    chunk_names(ranges.len())
        .into_iter()
        .zip(ranges)
        .map(|(name, range)| PartSpec {
            name,
            items: units[range].iter().flatten().copied().collect(),
        })
        .collect()
}
