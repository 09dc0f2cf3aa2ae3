// src/duplicates/mod.rs
//! Corpus-wide duplicate detection.
//!
//! The exact pass hashes comment-free, whitespace-collapsed text together
//! with the language family. It does NOT catch files that differ only by a
//! renamed identifier; that is a known limitation of the exact pass. The
//! optional structural pass reports such near duplicates but never feeds
//! consolidation.

pub mod blocks;
pub mod fingerprint;
pub mod normalize;

use crate::config::DuplicateSection;
use crate::model::{DuplicateGroup, FileRecord, NearDuplicateGroup, PartialDuplicate};
use crate::utils::compute_sha256;
use normalize::{normalize, Normalized};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fs;

#[derive(Debug, Clone, Default)]
pub struct DuplicateReport {
    pub groups: Vec<DuplicateGroup>,
    pub partials: Vec<PartialDuplicate>,
    pub near: Vec<NearDuplicateGroup>,
}

/// Reads every classifiable file in parallel. `None` for unknown records or
/// files that vanished since classification.
#[must_use]
pub fn load_sources(records: &[FileRecord]) -> Vec<Option<String>> {
    records
        .par_iter()
        .map(|r| {
            if r.is_unknown() {
                return None;
            }
            fs::read_to_string(&r.path)
                .map_err(|e| tracing::warn!(path = %r.path.display(), error = %e, "cannot re-read"))
                .ok()
        })
        .collect()
}

/// Deterministic canonical member: shortest path, then lexical order.
#[must_use]
pub fn choose_canonical<'a>(members: &[&'a str]) -> Option<&'a str> {
    members
        .iter()
        .copied()
        .min_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)))
}

/// Groups records by normalized content and marks non-canonical members as
/// needing transformation. `sources[i]` is the text of `records[i]`.
pub fn detect(
    records: &mut [FileRecord],
    sources: &[Option<String>],
    settings: &DuplicateSection,
) -> DuplicateReport {
    let normalized: Vec<Option<Normalized>> = records
        .par_iter()
        .zip(sources.par_iter())
        .map(|(r, src)| src.as_deref().map(|s| normalize(s, r.lang)))
        .collect();

    let groups = exact_groups(records, &normalized, settings.min_lines);
    for group in &groups {
        for rec in records.iter_mut().filter(|r| group.members.contains(&r.relative)) {
            rec.duplicate_group = Some(group.id.clone());
            if !group.is_canonical(&rec.relative) {
                rec.needs_transform = true;
            }
        }
    }

    let partial_inputs: Vec<(&str, &Normalized)> = records
        .iter()
        .zip(&normalized)
        .filter(|(r, _)| r.duplicate_group.is_none())
        .filter_map(|(r, n)| n.as_ref().map(|n| (r.relative.as_str(), n)))
        .collect();
    let partials = blocks::find_partials(&partial_inputs, settings.block_window);

    let near = if settings.structural {
        structural_groups(records, sources)
    } else {
        Vec::new()
    };

    tracing::info!(
        groups = groups.len(),
        partials = partials.len(),
        near = near.len(),
        "duplicate detection complete"
    );
    DuplicateReport {
        groups,
        partials,
        near,
    }
}

fn exact_groups(
    records: &[FileRecord],
    normalized: &[Option<Normalized>],
    min_lines: usize,
) -> Vec<DuplicateGroup> {
    let mut by_hash: BTreeMap<String, Vec<&str>> = BTreeMap::new();
    for (rec, norm) in records.iter().zip(normalized) {
        let Some(norm) = norm else { continue };
        if norm.significant_lines() < min_lines.max(1) {
            continue;
        }
        let family = rec.lang.map_or("text", |l| l.family().as_str());
        let hash = compute_sha256(&format!("{family}\n{}", norm.text()));
        by_hash.entry(hash).or_default().push(rec.relative.as_str());
    }

    by_hash
        .into_iter()
        .filter(|(_, members)| members.len() > 1)
        .filter_map(|(hash, mut members)| {
            members.sort_unstable();
            members.dedup();
            let canonical = choose_canonical(&members)?.to_string();
            Some(DuplicateGroup {
                id: format!("dup-{}", &hash[..12]),
                members: members.iter().map(|m| (*m).to_string()).collect(),
                canonical,
                hash,
            })
        })
        .filter(|g| g.members.len() > 1)
        .collect()
}

fn structural_groups(records: &[FileRecord], sources: &[Option<String>]) -> Vec<NearDuplicateGroup> {
    let prints: Vec<Option<(String, &str, Option<&str>)>> = records
        .par_iter()
        .zip(sources.par_iter())
        .map(|(r, src)| {
            let lang = r.lang?;
            let fp = fingerprint::compute(lang, src.as_deref()?)?;
            Some((fp, r.relative.as_str(), r.duplicate_group.as_deref()))
        })
        .collect();

    let mut by_print: BTreeMap<String, Vec<(&str, Option<&str>)>> = BTreeMap::new();
    for (fp, rel, group) in prints.into_iter().flatten() {
        by_print.entry(fp).or_default().push((rel, group));
    }

    by_print
        .into_iter()
        .filter_map(|(fingerprint, members)| {
            // Already reported as exact duplicates of each other.
            let first_group = members.first().and_then(|m| m.1);
            let all_exact = first_group.is_some() && members.iter().all(|m| m.1 == first_group);
            if members.len() < 2 || all_exact {
                return None;
            }
            let mut names: Vec<String> = members.iter().map(|m| m.0.to_string()).collect();
            names.sort();
            Some(NearDuplicateGroup {
                fingerprint: fingerprint[..12].to_string(),
                members: names,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Thresholds;
    use crate::classify::classify_text;
    use std::path::PathBuf;

    const BODY: &str = "export function total(items: number[]): number {\n  let sum = 0;\n  for (const item of items) {\n    sum += item;\n  }\n  return sum;\n}\n";

    fn record(rel: &str, content: &str) -> FileRecord {
        classify_text(
            PathBuf::from(format!("/r/{rel}")),
            rel.to_string(),
            content,
            &Thresholds { size: 1000, complexity: 1000 },
        )
    }

    fn settings() -> DuplicateSection {
        DuplicateSection {
            min_lines: 3,
            block_window: 0,
            structural: false,
        }
    }

    #[test]
    fn canonical_is_shortest_then_lexical() {
        assert_eq!(choose_canonical(&["lib/b.ts", "a.ts", "z.ts"]), Some("a.ts"));
        assert_eq!(choose_canonical(&["b.ts", "a.ts"]), Some("a.ts"));
        assert_eq!(choose_canonical(&[]), None);
    }

    #[test]
    fn canonical_ignores_member_order() {
        let one = choose_canonical(&["x/y.ts", "a.ts", "b.ts"]);
        let two = choose_canonical(&["b.ts", "x/y.ts", "a.ts"]);
        assert_eq!(one, two);
    }

    #[test]
    fn comment_and_whitespace_changes_still_match() {
        let variant = format!("// copied from A\n\n{}", BODY.replace("  ", "    "));
        let mut recs = vec![record("A.ts", BODY), record("lib/B.ts", &variant), record("C.ts", "export const c = 1;\nexport const d = 2;\nexport const e = 3;\n")];
        let sources: Vec<Option<String>> = vec![Some(BODY.into()), Some(variant.clone()), Some("export const c = 1;\nexport const d = 2;\nexport const e = 3;\n".into())];
        let report = detect(&mut recs, &sources, &settings());

        assert_eq!(report.groups.len(), 1);
        let g = &report.groups[0];
        assert_eq!(g.canonical, "A.ts");
        assert_eq!(g.members, vec!["A.ts", "lib/B.ts"]);
        assert!(!recs[0].needs_transform);
        assert!(recs[1].needs_transform);
        assert_eq!(recs[1].duplicate_group.as_deref(), Some(g.id.as_str()));
        assert!(recs[2].duplicate_group.is_none());
    }

    #[test]
    fn short_files_and_other_families_never_group() {
        let tiny = "x = 1\n";
        let mut recs = vec![record("a.py", tiny), record("b.py", tiny)];
        let sources = vec![Some(tiny.to_string()), Some(tiny.to_string())];
        assert!(detect(&mut recs, &sources, &settings()).groups.is_empty());

        let same = "a();\nb();\nc();\n";
        let mut recs = vec![record("a.ts", same), record("a.rs", same)];
        let sources = vec![Some(same.to_string()), Some(same.to_string())];
        assert!(detect(&mut recs, &sources, &settings()).groups.is_empty());
    }

    #[test]
    fn group_ids_are_stable() {
        let run = || {
            let mut recs = vec![record("a.ts", BODY), record("b.ts", BODY)];
            let sources = vec![Some(BODY.to_string()), Some(BODY.to_string())];
            detect(&mut recs, &sources, &settings()).groups
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn renamed_identifiers_are_only_near_duplicates() {
        let renamed = BODY.replace("sum", "acc").replace("item", "v");
        let mut recs = vec![record("a.ts", BODY), record("b.ts", &renamed)];
        let sources = vec![Some(BODY.to_string()), Some(renamed.clone())];
        let mut s = settings();
        s.structural = true;
        let report = detect(&mut recs, &sources, &s);
        assert!(report.groups.is_empty());
        assert_eq!(report.near.len(), 1);
        assert_eq!(report.near[0].members, vec!["a.ts", "b.ts"]);
        assert!(!recs[1].needs_transform);
    }
}
