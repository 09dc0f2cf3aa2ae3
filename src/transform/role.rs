// src/transform/role.rs
//! Assignment of items to a role strategy's fixed sub-structure.

use crate::classify::roles::tokenize;
use crate::model::Strategy;
use crate::syntax::{Item, ItemKind, SymbolTree};
use crate::transform::split::PartSpec;
use std::collections::HashMap;

const REPOSITORY_TOKENS: &[&str] = &[
    "repo", "repository", "repositories", "store", "dao", "query", "queries", "persist",
    "persistence", "db", "database", "sql", "table",
];
const SERVICE_TOKENS: &[&str] = &["service", "usecase", "interactor", "workflow"];
const DTO_SUFFIXES: &[&str] = &[
    "dto", "request", "response", "payload", "body", "params", "query", "input", "output",
];
const VALIDATION_TOKENS: &[&str] = &[
    "valid", "validate", "validator", "validation", "schema", "sanitize", "sanitizer", "guard",
    "check", "assert", "verify",
];

struct Names {
    tokens: Vec<String>,
    first: String,
}

impl Names {
    fn of(item: &Item) -> Self {
        Self {
            tokens: item.names.iter().flat_map(|n| tokenize(n)).collect(),
            first: item.names.first().cloned().unwrap_or_default(),
        }
    }

    fn any(&self, wanted: &[&str]) -> bool {
        self.tokens.iter().any(|t| wanted.contains(&t.as_str()))
    }

    fn ends_with(&self, wanted: &[&str]) -> bool {
        self.tokens.last().is_some_and(|t| wanted.contains(&t.as_str()))
    }

    fn is_hook(&self) -> bool {
        self.first
            .strip_prefix("use")
            .and_then(|rest| rest.chars().next())
            .is_some_and(|c| c.is_ascii_uppercase())
    }

    fn starts_lowercase(&self) -> bool {
        self.first.chars().next().is_some_and(char::is_lowercase)
    }
}

fn is_pure_type(kind: ItemKind) -> bool {
    matches!(kind, ItemKind::Interface | ItemKind::TypeAlias | ItemKind::Enum)
}

/// Part name for one declaration, or `None` for "wherever the rest goes".
fn decide(strategy: Strategy, item: &Item) -> Option<&'static str> {
    if item.names.is_empty() {
        return None;
    }
    let n = Names::of(item);
    let type_like = item.kind.is_type_like();
    match strategy {
        Strategy::Service => {
            if n.any(REPOSITORY_TOKENS) {
                Some("repository")
            } else if type_like && !n.any(SERVICE_TOKENS) {
                Some("entities")
            } else {
                Some("use-cases")
            }
        }
        Strategy::Controller => {
            if type_like && (is_pure_type(item.kind) || n.ends_with(DTO_SUFFIXES)) {
                Some("dto")
            } else if n.any(VALIDATION_TOKENS) {
                Some("validation")
            } else {
                Some("handlers")
            }
        }
        Strategy::Repository => {
            if type_like && !n.any(REPOSITORY_TOKENS) {
                Some("entities")
            } else {
                Some("queries")
            }
        }
        Strategy::Component => {
            if is_pure_type(item.kind) {
                Some("types")
            } else if n.is_hook() {
                Some("hooks")
            } else if matches!(item.kind, ItemKind::Function | ItemKind::Constant)
                && !item.default_export
                && n.starts_lowercase()
            {
                Some("utils")
            } else {
                Some("view")
            }
        }
        Strategy::Consolidate | Strategy::SplitByChunk => None,
    }
}

/// Groups `units` by the strategy's rule table. Returns the non-empty groups
/// in the strategy's part order, or `None` if fewer than two are non-empty.
#[must_use]
pub fn group(strategy: Strategy, tree: &SymbolTree, units: &[Vec<usize>]) -> Option<Vec<PartSpec>> {
    let parts = strategy.parts();
    let fallback = parts.last()?;
    let mut assigned: Vec<&str> = Vec::with_capacity(units.len());
    let mut by_type: HashMap<&str, &str> = HashMap::new();

    for unit in units {
        let item = &tree.items[unit[0]];
        let part = if item.kind == ItemKind::Impl {
            ""
        } else {
            decide(strategy, item).unwrap_or(fallback)
        };
        if !part.is_empty() {
            for name in &item.names {
                by_type.entry(name.as_str()).or_insert(part);
            }
        }
        assigned.push(part);
    }
    // Impl blocks follow the type they implement.
    for (unit, part) in units.iter().zip(assigned.iter_mut()) {
        if part.is_empty() {
            let target = tree.items[unit[0]].impl_target.as_deref();
            *part = target.and_then(|t| by_type.get(t).copied()).unwrap_or(fallback);
        }
    }

    let specs: Vec<PartSpec> = parts
        .iter()
        .map(|p| PartSpec {
            name: (*p).to_string(),
            items: units
                .iter()
                .zip(&assigned)
                .filter(|(_, a)| **a == *p)
                .flat_map(|(u, _)| u.iter().copied())
                .collect(),
        })
        .filter(|s| !s.items.is_empty())
        .collect();
    (specs.len() >= 2).then_some(specs)
}
