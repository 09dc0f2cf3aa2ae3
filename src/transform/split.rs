// src/transform/split.rs
//! Language-neutral bookkeeping for moving items out of a file.
//!
//! Given a symbol tree and an assignment of movable items to parts, works out
//! which original imports each part still needs, which names cross part
//! boundaries, which private items must be widened, and what the aggregator
//! left at the original path has to keep and re-expose.

use crate::syntax::{Item, ItemKind, SymbolTree};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// A name imported from a part.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Binding {
    pub name: String,
    pub type_only: bool,
    pub default: bool,
}

/// Items (tree indices, ascending) assigned to one part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartSpec {
    pub name: String,
    pub items: Vec<usize>,
}

#[derive(Debug)]
pub struct PartModule<'t> {
    pub name: String,
    pub items: Vec<&'t Item>,
    /// Parallel to `items`.
    pub widen: Vec<bool>,
    pub imports: Vec<&'t Item>,
    /// Bindings to import from sibling parts, keyed by part index.
    pub siblings: BTreeMap<usize, Vec<Binding>>,
    /// Names declared by items that stay in the aggregator.
    pub from_parent: Vec<String>,
}

#[derive(Debug)]
pub struct AggregatorSpec<'t> {
    pub headers: Vec<&'t Item>,
    pub imports: Vec<&'t Item>,
    pub pinned: Vec<&'t Item>,
    /// Names the pinned items need from each part.
    pub pinned_refs: BTreeMap<usize, Vec<Binding>>,
    /// Per part: the originally exported surface.
    pub surface: Vec<Vec<Binding>>,
    /// Per part: every declared name.
    pub declared: Vec<Vec<String>>,
}

#[derive(Debug)]
pub struct Split<'t> {
    pub parts: Vec<PartModule<'t>>,
    pub aggregator: AggregatorSpec<'t>,
}

/// Items that may leave the original file.
#[must_use]
pub fn is_movable(item: &Item) -> bool {
    !item.pinned && !matches!(item.kind, ItemKind::Header | ItemKind::Import)
}

#[must_use]
pub fn movable(tree: &SymbolTree) -> Vec<usize> {
    tree.items
        .iter()
        .enumerate()
        .filter(|(_, item)| is_movable(item))
        .map(|(i, _)| i)
        .collect()
}

/// Groups movable items into units that must stay together: runs of
/// consecutive declarations of the same name (overload signatures), and every
/// item between a rebindable declaration and an item that reassigns it.
#[must_use]
pub fn units(tree: &SymbolTree, movable: &[usize]) -> Vec<Vec<usize>> {
    merge_writers(tree, overload_runs(tree, movable))
}

fn overload_runs(tree: &SymbolTree, movable: &[usize]) -> Vec<Vec<usize>> {
    let mut out: Vec<Vec<usize>> = Vec::new();
    for &idx in movable {
        let item = &tree.items[idx];
        let joins_previous = out.last().and_then(|u| u.last()).is_some_and(|&prev| {
            let p = &tree.items[prev];
            prev + 1 == idx && !item.names.is_empty() && p.names == item.names
        });
        match out.last_mut() {
            Some(unit) if joins_previous => unit.push(idx),
            _ => out.push(vec![idx]),
        }
    }
    out
}

/// An imported binding is read-only, so a writer must share a module with
/// the declaration it reassigns.
fn merge_writers(tree: &SymbolTree, units: Vec<Vec<usize>>) -> Vec<Vec<usize>> {
    let mut reach: Vec<usize> = (0..units.len()).collect();
    for (ud, decl_unit) in units.iter().enumerate() {
        for decl in decl_unit.iter().map(|&i| &tree.items[i]).filter(|i| i.rebindable) {
            for (uw, writer_unit) in units.iter().enumerate() {
                let writes = writer_unit
                    .iter()
                    .any(|&w| decl.names.iter().any(|n| tree.items[w].assigned.contains(n)));
                if uw != ud && writes {
                    let lo = ud.min(uw);
                    reach[lo] = reach[lo].max(ud.max(uw));
                }
            }
        }
    }

    let mut out = Vec::with_capacity(units.len());
    let mut u = 0;
    while u < units.len() {
        let mut end = reach[u];
        let mut merged = Vec::new();
        let mut k = u;
        while k <= end {
            end = end.max(reach[k]);
            merged.extend(units[k].iter().copied());
            k += 1;
        }
        out.push(merged);
        u = k;
    }
    out
}

/// First rebindable name declared by a movable item but reassigned by an
/// item that stays behind.
#[must_use]
pub fn pinned_writer(tree: &SymbolTree) -> Option<&str> {
    let pinned: Vec<&Item> = tree.items.iter().filter(|i| !is_movable(i)).collect();
    tree.items
        .iter()
        .filter(|i| is_movable(i) && i.rebindable)
        .flat_map(|i| i.names.iter())
        .find(|name| pinned.iter().any(|p| p.assigned.contains(*name)))
        .map(String::as_str)
}

fn binding(name: &str, item: &Item) -> Binding {
    Binding {
        name: name.to_string(),
        type_only: item.type_only,
        default: item.default_export,
    }
}

impl<'t> Split<'t> {
    /// `widen_all` widens every private movable item (languages where the
    /// aggregator reaches parts only through visibility).
    #[must_use]
    pub fn build(tree: &'t SymbolTree, parts: &[PartSpec], widen_all: bool) -> Self {
        let mut owner: HashMap<&str, (usize, &Item)> = HashMap::new();
        for (p, spec) in parts.iter().enumerate() {
            for &i in &spec.items {
                let item = &tree.items[i];
                for name in &item.names {
                    owner.entry(name.as_str()).or_insert((p, item));
                }
            }
        }

        let pool: Vec<&Item> = tree.items.iter().filter(|i| i.kind == ItemKind::Import).collect();
        let headers: Vec<&Item> = tree.items.iter().filter(|i| i.kind == ItemKind::Header).collect();
        let pinned: Vec<&Item> = tree
            .items
            .iter()
            .filter(|i| i.pinned && i.kind != ItemKind::Header)
            .collect();
        let parent_names: BTreeSet<&str> = pinned
            .iter()
            .filter(|i| i.kind != ItemKind::ReExport)
            .flat_map(|i| i.names.iter().map(String::as_str))
            .collect();

        let pinned_refs_all: BTreeSet<&str> = pinned
            .iter()
            .flat_map(|i| i.references.iter().map(String::as_str))
            .collect();
        let mut pinned_refs: BTreeMap<usize, Vec<Binding>> = BTreeMap::new();
        let mut crossing: HashSet<&str> = HashSet::new();
        for name in &pinned_refs_all {
            if let Some(&(q, item)) = owner.get(name) {
                pinned_refs.entry(q).or_default().push(binding(name, item));
                crossing.insert(name);
            }
        }

        let mut modules: Vec<PartModule<'t>> = Vec::with_capacity(parts.len());
        for (p, spec) in parts.iter().enumerate() {
            let items: Vec<&Item> = spec.items.iter().map(|&i| &tree.items[i]).collect();
            let refs: BTreeSet<&str> = items
                .iter()
                .flat_map(|i| i.references.iter().map(String::as_str))
                .collect();
            let own: BTreeSet<&str> = items
                .iter()
                .flat_map(|i| i.names.iter().map(String::as_str))
                .collect();

            let imports = pool
                .iter()
                .copied()
                .filter(|imp| imp.side_effect || imp.names.iter().any(|n| refs.contains(n.as_str())))
                .collect();

            let mut siblings: BTreeMap<usize, Vec<Binding>> = BTreeMap::new();
            for name in refs.difference(&own) {
                if let Some(&(q, item)) = owner.get(name) {
                    if q != p {
                        siblings.entry(q).or_default().push(binding(name, item));
                        crossing.insert(name);
                    }
                }
            }
            let from_parent = refs
                .intersection(&parent_names)
                .filter(|n| !own.contains(*n))
                .map(|n| (*n).to_string())
                .collect();

            modules.push(PartModule {
                name: spec.name.clone(),
                widen: Vec::new(),
                items,
                imports,
                siblings,
                from_parent,
            });
        }

        for module in &mut modules {
            module.widen = module
                .items
                .iter()
                .map(|item| {
                    if item.widen_points.is_empty() {
                        return false;
                    }
                    widen_all
                        || (!item.exported && item.names.iter().any(|n| crossing.contains(n.as_str())))
                })
                .collect();
        }

        let surface = modules
            .iter()
            .map(|m| {
                let mut out = Vec::new();
                for item in m.items.iter().filter(|i| i.exported) {
                    if item.default_export {
                        out.push(binding("default", item));
                    } else {
                        out.extend(item.names.iter().map(|n| binding(n, item)));
                    }
                }
                out
            })
            .collect();
        let declared = modules
            .iter()
            .map(|m| m.items.iter().flat_map(|i| i.names.iter().cloned()).collect())
            .collect();

        let imports = pool
            .iter()
            .copied()
            .filter(|imp| {
                imp.side_effect || imp.names.iter().any(|n| pinned_refs_all.contains(n.as_str()))
            })
            .collect();

        Self {
            parts: modules,
            aggregator: AggregatorSpec {
                headers,
                imports,
                pinned,
                pinned_refs,
                surface,
                declared,
            },
        }
    }
}

/// Joins item texts the way they sat in the original file, dropping leading
/// blank lines of the first one. `widen` applies `prefix` per item.
#[must_use]
pub fn join_items(items: &[&Item], widen: &[bool], prefix: Option<&str>) -> String {
    let mut out = String::new();
    for (i, item) in items.iter().enumerate() {
        let text = match prefix {
            Some(p) if widen.get(i).copied().unwrap_or(false) => item.widened(p),
            _ => item.text.clone(),
        };
        if i == 0 {
            out.push_str(text.trim_start_matches(['\n', '\r']));
        } else {
            out.push_str(&text);
        }
    }
    out
}

/// Concatenates non-empty blocks with one blank line between them.
#[must_use]
pub fn blocks(parts: &[String]) -> String {
    let mut out = parts
        .iter()
        .map(|b| b.trim_matches(['\n', '\r']))
        .filter(|b| !b.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::Lang;

    const SRC: &str = "import { db } from './db';\nimport { log } from './log';\n\nconst LIMIT = 5;\n\nexport function load() {\n  return db.take(LIMIT);\n}\n\nexport function show() {\n  log(load());\n}\n\nexport { LIMIT as limit };\n";

    fn parse(src: &str) -> SymbolTree {
        SymbolTree::parse(Lang::TypeScript, src).unwrap_or_else(|e| panic!("{e}"))
    }

    #[test]
    fn crossing_names_become_sibling_imports() {
        let tree = parse(SRC);
        let mv = movable(&tree);
        assert_eq!(mv, vec![2, 3, 4]);
        let parts = vec![
            PartSpec { name: "a".into(), items: vec![2, 3] },
            PartSpec { name: "b".into(), items: vec![4] },
        ];
        let split = Split::build(&tree, &parts, false);

        let a = &split.parts[0];
        let imported: Vec<&str> = a.imports.iter().flat_map(|i| i.names.iter().map(String::as_str)).collect();
        assert_eq!(imported, vec!["db"]);
        // LIMIT is private but the pinned export list needs it.
        assert_eq!(a.widen, vec![true, false]);

        let b = &split.parts[1];
        assert_eq!(b.siblings.get(&0).map(|v| v[0].name.as_str()), Some("load"));
        let b_imports: Vec<&str> = b.imports.iter().flat_map(|i| i.names.iter().map(String::as_str)).collect();
        assert_eq!(b_imports, vec!["log"]);

        let agg = &split.aggregator;
        assert_eq!(agg.pinned.len(), 1);
        assert_eq!(agg.pinned_refs.get(&0).map(|v| v[0].name.as_str()), Some("LIMIT"));
        assert!(agg.imports.is_empty());
        let surface: Vec<&str> = agg.surface[0].iter().map(|b| b.name.as_str()).collect();
        assert_eq!(surface, vec!["load"]);
    }

    #[test]
    fn overloads_form_one_unit() {
        let tree = parse("export function f(a: string): string;\nexport function f(a: number): number;\nexport function f(a: any) { return a; }\nexport const g = 1;\n");
        let u = units(&tree, &movable(&tree));
        assert_eq!(u, vec![vec![0, 1, 2], vec![3]]);
    }

    #[test]
    fn reassigned_bindings_stay_with_their_writers() {
        let tree = parse("let cache = {};\n\nexport function get() {\n  return cache;\n}\n\nexport const LIMIT = 3;\n\nexport function reset() {\n  cache = {};\n}\n\nexport function tail() {\n  return LIMIT;\n}\n");
        assert!(tree.items[0].rebindable);
        assert!(tree.items[3].assigned.contains("cache"));
        let u = units(&tree, &movable(&tree));
        assert_eq!(u, vec![vec![0, 1, 2, 3], vec![4]]);
        assert_eq!(pinned_writer(&tree), None);
    }

    #[test]
    fn const_bindings_do_not_merge() {
        let tree = parse("const cache = {};\n\nexport function reset() {\n  let cache = 1;\n  cache = 2;\n  return cache;\n}\n");
        assert!(!tree.items[0].rebindable);
        assert_eq!(units(&tree, &movable(&tree)), vec![vec![0], vec![1]]);
    }

    #[test]
    fn join_drops_only_leading_blank_lines() {
        let tree = parse("\n\nconst a = 1;\n\nconst b = 2;\n");
        let items: Vec<&Item> = tree.items.iter().collect();
        assert_eq!(join_items(&items, &[false, true], Some("export ")), "const a = 1;\n\nexport const b = 2;");
        assert_eq!(blocks(&["\nx\n".into(), String::new(), "y".into()]), "x\n\ny\n");
    }
}
