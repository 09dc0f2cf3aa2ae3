// src/duplicates/blocks.rs
//! Partial duplication: windows of normalized lines that occur verbatim more
//! than once, within one file or across files.

use super::normalize::Normalized;
use crate::model::PartialDuplicate;
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};

/// Lines this short (`}`, `});`, `end`) carry no signal on their own.
const TRIVIAL_LINE_LEN: usize = 3;

/// Finds repeated windows of `window` normalized lines. `files` pairs each
/// relative path with its normalized content. Never panics on odd input;
/// a zero window disables the pass.
#[must_use]
pub fn find_partials(files: &[(&str, &Normalized)], window: usize) -> Vec<PartialDuplicate> {
    if window == 0 {
        return Vec::new();
    }
    let mut occurrences: BTreeMap<u64, Vec<(usize, usize)>> = BTreeMap::new();
    for (file_idx, (_, norm)) in files.iter().enumerate() {
        if norm.lines.len() < window {
            continue;
        }
        for start in 0..=norm.lines.len() - window {
            let slice = &norm.lines[start..start + window];
            let substantial = slice
                .iter()
                .filter(|l| l.text.len() > TRIVIAL_LINE_LEN)
                .count();
            if substantial * 2 < window {
                continue;
            }
            let mut h = DefaultHasher::new();
            for line in slice {
                line.text.hash(&mut h);
            }
            occurrences.entry(h.finish()).or_default().push((file_idx, start));
        }
    }

    // Per file: duplicated window starts, plus where else the window occurs.
    let mut starts: BTreeMap<usize, BTreeMap<usize, Vec<(usize, usize)>>> = BTreeMap::new();
    for locations in occurrences.values().filter(|v| v.len() > 1) {
        for &(file_idx, start) in locations {
            let others = locations
                .iter()
                .copied()
                .filter(|&loc| loc != (file_idx, start))
                .collect();
            starts.entry(file_idx).or_default().insert(start, others);
        }
    }

    let mut out = Vec::new();
    for (file_idx, by_start) in starts {
        let Some((path, norm)) = files.get(file_idx) else {
            continue;
        };
        let mut run: Option<(usize, usize, &Vec<(usize, usize)>)> = None;
        for (&start, others) in &by_start {
            run = match run {
                Some((first, last, o)) if start == last + 1 => Some((first, start, o)),
                Some((first, last, o)) => {
                    out.push(to_partial(path, norm, files, first, last + window - 1, o));
                    Some((start, start, others))
                }
                None => Some((start, start, others)),
            };
        }
        if let Some((first, last, o)) = run {
            out.push(to_partial(path, norm, files, first, last + window - 1, o));
        }
    }
    out
}

fn to_partial(
    path: &str,
    norm: &Normalized,
    files: &[(&str, &Normalized)],
    first: usize,
    last: usize,
    others: &[(usize, usize)],
) -> PartialDuplicate {
    let line_of = |n: &Normalized, idx: usize| n.lines.get(idx).map_or(0, |l| l.source_line);
    let also_in: BTreeSet<String> = others
        .iter()
        .filter_map(|&(f, s)| {
            let (p, n) = files.get(f)?;
            Some(format!("{p}:{}", line_of(*n, s)))
        })
        .collect();
    PartialDuplicate {
        file: path.to_string(),
        start_line: line_of(norm, first),
        end_line: line_of(norm, last),
        also_in: also_in.into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duplicates::normalize::normalize;
    use crate::lang::Lang;

    const SHARED: &str = "const total = items.reduce(fn);\nconst label = format(total);\nlogger.info(label);\nreturn label;\n";

    #[test]
    fn finds_window_shared_across_files() {
        let a = normalize(&format!("function a() {{\n{SHARED}}}\n"), Some(Lang::TypeScript));
        let b = normalize(&format!("// x\nfunction b() {{\n{SHARED}}}\n"), Some(Lang::TypeScript));
        let files = vec![("a.ts", &a), ("b.ts", &b)];
        let found = find_partials(&files, 4);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].file, "a.ts");
        // The closing brace extends the shared run by one window.
        assert_eq!((found[0].start_line, found[0].end_line), (2, 6));
        assert_eq!(found[0].also_in, vec!["b.ts:3"]);
        assert_eq!((found[1].start_line, found[1].end_line), (3, 7));
    }

    #[test]
    fn trivial_windows_are_ignored() {
        let src = "}\n}\n}\n}\n}\n}\n}\n}\n";
        let n = normalize(src, Some(Lang::TypeScript));
        assert!(find_partials(&[("a.ts", &n)], 3).is_empty());
    }

    #[test]
    fn zero_or_oversized_window_is_empty() {
        let n = normalize(SHARED, Some(Lang::TypeScript));
        assert!(find_partials(&[("a.ts", &n)], 0).is_empty());
        assert!(find_partials(&[("a.ts", &n)], 50).is_empty());
    }
}
