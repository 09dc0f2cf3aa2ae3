// src/dispatch.rs
//! Decision table from classified records to transformation plans.

use crate::classify::is_oversized;
use crate::config::Thresholds;
use crate::model::{DuplicateGroup, FileRecord, PlanParams, Strategy, TransformationPlan};
use crate::syntax::refs::Resolver;
use crate::transform::layout::{chunk_names, Layout};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// Read-only inputs shared by every dispatch decision.
#[derive(Debug, Clone, Copy)]
pub struct DispatchContext<'a> {
    pub root: &'a Path,
    pub thresholds: &'a Thresholds,
}

fn ceil_div(a: usize, b: usize) -> usize {
    if b == 0 {
        1
    } else {
        a.div_ceil(b)
    }
}

/// `max(2, ceil(lines / (0.75 * size)), ceil(complexity / complexity_threshold))`.
#[must_use]
pub fn chunk_count(record: &FileRecord, thresholds: &Thresholds) -> usize {
    let by_lines = ceil_div(record.line_count * 4, thresholds.size * 3);
    let by_complexity = ceil_div(record.complexity, thresholds.complexity);
    2.max(by_lines).max(by_complexity)
}

/// Plan for one record, or `None` if it needs nothing. First match wins:
/// non-canonical duplicate, oversized role file, oversized anything else.
#[must_use]
pub fn dispatch(
    record: &FileRecord,
    group: Option<&DuplicateGroup>,
    ctx: &DispatchContext,
) -> Option<TransformationPlan> {
    if record.is_unknown() || !record.needs_transform {
        return None;
    }

    if let Some(g) = group.filter(|g| !g.is_canonical(&record.relative)) {
        return Some(TransformationPlan {
            path: record.path.clone(),
            relative: record.relative.clone(),
            lang: record.lang,
            strategy: Strategy::Consolidate,
            params: PlanParams {
                canonical: Some(ctx.root.join(&g.canonical)),
                ..PlanParams::default()
            },
            planned_outputs: vec![record.path.clone()],
        });
    }

    if !is_oversized(record, ctx.thresholds) {
        return None;
    }

    let chunks = chunk_count(record, ctx.thresholds);
    let (strategy, parts) = match Strategy::for_role(record.role) {
        Some(s) => (s, s.parts().iter().map(|p| (*p).to_string()).collect()),
        None => (Strategy::SplitByChunk, chunk_names(chunks)),
    };
    let layout = record.lang.map(|l| Layout::new(l, &record.path));

    Some(TransformationPlan {
        path: record.path.clone(),
        relative: record.relative.clone(),
        lang: record.lang,
        strategy,
        params: PlanParams {
            chunk_count: Some(chunks),
            layout_dir: layout.as_ref().map(|l| l.dir.clone()),
            parts: parts.clone(),
            ..PlanParams::default()
        },
        planned_outputs: layout.map_or_else(
            || vec![record.path.clone()],
            |l| l.planned_outputs(&parts),
        ),
    })
}

/// Dispatches every record in order, then links consolidation dependents.
#[must_use]
pub fn plan_all(
    records: &[FileRecord],
    groups: &[DuplicateGroup],
    ctx: &DispatchContext,
    resolver: &Resolver,
) -> Vec<TransformationPlan> {
    let by_id: HashMap<&str, &DuplicateGroup> = groups.iter().map(|g| (g.id.as_str(), g)).collect();
    let mut plans: Vec<TransformationPlan> = records
        .iter()
        .filter_map(|r| {
            let group = r.duplicate_group.as_deref().and_then(|id| by_id.get(id).copied());
            dispatch(r, group, ctx)
        })
        .collect();
    link_dependents(&mut plans, records, resolver);
    tracing::info!(plans = plans.len(), "dispatch complete");
    plans
}

/// Assigns every file that imports a non-canonical duplicate, and has no plan
/// of its own, to exactly one consolidate plan: the one for the lexically
/// smallest redirected path it imports.
pub fn link_dependents(plans: &mut [TransformationPlan], records: &[FileRecord], resolver: &Resolver) {
    let redirects: BTreeMap<PathBuf, PathBuf> = plans
        .iter()
        .filter(|p| p.strategy == Strategy::Consolidate)
        .filter_map(|p| p.params.canonical.clone().map(|c| (p.path.clone(), c)))
        .collect();
    if redirects.is_empty() {
        return;
    }
    let owners: HashMap<PathBuf, usize> = plans
        .iter()
        .enumerate()
        .filter(|(_, p)| p.strategy == Strategy::Consolidate)
        .map(|(i, p)| (p.path.clone(), i))
        .collect();
    let planned: std::collections::HashSet<&Path> = plans.iter().map(|p| p.path.as_path()).collect();

    let mut assignments: Vec<(usize, PathBuf, Vec<PathBuf>)> = Vec::new();
    for record in records {
        if planned.contains(record.path.as_path()) {
            continue;
        }
        let Some(lang) = record.lang else { continue };
        let mut hits: Vec<PathBuf> = record
            .references
            .iter()
            .filter_map(|spec| resolver.resolve(lang, &record.path, spec))
            .map(|r| r.target)
            .filter(|t| redirects.get(t).is_some_and(|c| *c != record.path))
            .collect();
        hits.sort();
        hits.dedup();
        let Some(owner) = hits.first().and_then(|k| owners.get(k)) else {
            continue;
        };
        assignments.push((*owner, record.path.clone(), hits));
    }

    for (owner, dependent, hits) in assignments {
        let plan = &mut plans[owner];
        for key in hits {
            if let Some(target) = redirects.get(&key) {
                plan.params.redirects.insert(key, target.clone());
            }
        }
        plan.params.dependents.push(dependent);
    }
    for plan in plans.iter_mut().filter(|p| !p.params.dependents.is_empty()) {
        plan.params.dependents.sort();
        plan.params.dependents.dedup();
        plan.planned_outputs.extend(plan.params.dependents.iter().cloned());
    }
}
