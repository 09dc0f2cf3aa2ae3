// src/syntax/refs.rs
//! Identifier collection and import-specifier resolution.

use crate::lang::Lang;
use std::collections::{BTreeSet, HashSet};
use std::path::{Component, Path, PathBuf};
use tree_sitter::Node;

const SCRIPT_EXTS: &[&str] = &["ts", "tsx", "js", "jsx", "mjs", "cjs", "mts", "cts"];

/// Every identifier used anywhere under `node`.
#[must_use]
pub fn collect_identifiers(node: Node, bytes: &[u8]) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    let mut stack = vec![node];
    while let Some(n) = stack.pop() {
        if matches!(
            n.kind(),
            "identifier" | "type_identifier" | "shorthand_property_identifier"
        ) {
            if let Ok(t) = n.utf8_text(bytes) {
                out.insert(t.to_string());
            }
        }
        let mut cursor = n.walk();
        stack.extend(n.children(&mut cursor));
    }
    out
}

/// Plain identifiers reassigned under `node`. Python only counts names
/// declared `global`, since a bare assignment there binds a local.
#[must_use]
pub fn collect_assigned(lang: Lang, node: Node, bytes: &[u8]) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    let mut stack = vec![node];
    while let Some(n) = stack.pop() {
        let target = match (lang, n.kind()) {
            (Lang::Python, "global_statement") => {
                let mut cursor = n.walk();
                for name in n.named_children(&mut cursor) {
                    if let Ok(t) = name.utf8_text(bytes) {
                        out.insert(t.to_string());
                    }
                }
                None
            }
            (Lang::Python, _) => None,
            (_, "assignment_expression" | "augmented_assignment_expression") => {
                n.child_by_field_name("left")
            }
            (_, "update_expression") => n.child_by_field_name("argument"),
            _ => None,
        };
        if let Some(t) = target.filter(|t| t.kind() == "identifier") {
            if let Ok(name) = t.utf8_text(bytes) {
                out.insert(name.to_string());
            }
        }
        let mut cursor = n.walk();
        stack.extend(n.children(&mut cursor));
    }
    out
}

/// Removes `.` and `..` components without touching the filesystem.
#[must_use]
pub fn lexical_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Relative path from directory `base` to `target`. Both absolute.
#[must_use]
pub fn diff_paths(target: &Path, base: &Path) -> PathBuf {
    let t: Vec<Component> = target.components().collect();
    let b: Vec<Component> = base.components().collect();
    let common = t.iter().zip(b.iter()).take_while(|(x, y)| x == y).count();
    let mut out = PathBuf::new();
    for _ in common..b.len() {
        out.push("..");
    }
    for comp in t.iter().skip(common) {
        out.push(comp.as_os_str());
    }
    out
}

/// ES-module style specifier from `from_dir` to `target`, always starting
/// with `./` or `../`.
#[must_use]
pub fn script_specifier(from_dir: &Path, target: &Path, keep_ext: bool) -> String {
    let mut rel = diff_paths(target, from_dir);
    if !keep_ext {
        rel.set_extension("");
    }
    let s = rel.to_string_lossy().replace('\\', "/");
    if s.starts_with("../") {
        s
    } else {
        format!("./{s}")
    }
}

/// Re-bases a relative script specifier written in `old_dir` so it resolves
/// to the same place from `new_dir`. Bare specifiers pass through.
#[must_use]
pub fn rebase_script(spec: &str, old_dir: &Path, new_dir: &Path) -> String {
    if !is_relative_script(spec) {
        return spec.to_string();
    }
    let target = lexical_normalize(&old_dir.join(spec));
    let rel = diff_paths(&target, new_dir);
    let s = rel.to_string_lossy().replace('\\', "/");
    if s.starts_with("../") || s == ".." {
        s
    } else if s.is_empty() {
        ".".to_string()
    } else {
        format!("./{s}")
    }
}

/// Re-bases a Rust use path for an item moved one module deeper.
#[must_use]
pub fn rebase_rust(spec: &str, local_modules: &[String]) -> String {
    if let Some(rest) = spec.strip_prefix("self::") {
        return format!("super::{rest}");
    }
    if spec == "self" {
        return "super".to_string();
    }
    if spec.starts_with("super") {
        return format!("super::{spec}");
    }
    let first = spec.split("::").next().unwrap_or(spec);
    if local_modules.iter().any(|m| m == first) {
        return format!("super::{spec}");
    }
    spec.to_string()
}

fn is_relative_script(spec: &str) -> bool {
    spec == "." || spec == ".." || spec.starts_with("./") || spec.starts_with("../")
}

/// Module path of a Rust file relative to its crate's `src` directory.
/// Returns the `src` directory and the path segments.
#[must_use]
pub fn rust_module_path(file: &Path) -> Option<(PathBuf, Vec<String>)> {
    let src = file.ancestors().skip(1).find(|a| a.file_name().is_some_and(|n| n == "src"))?;
    let rel = file.strip_prefix(src).ok()?;
    let mut segs: Vec<String> = rel
        .parent()
        .map(|p| {
            p.components()
                .map(|c| c.as_os_str().to_string_lossy().to_string())
                .collect()
        })
        .unwrap_or_default();
    let stem = file.file_stem()?.to_string_lossy().to_string();
    let is_root = segs.is_empty() && (stem == "lib" || stem == "main");
    if stem != "mod" && !is_root {
        segs.push(stem);
    }
    Some((src.to_path_buf(), segs))
}

/// Resolves import specifiers against the set of scanned files.
#[derive(Debug, Default, Clone)]
pub struct Resolver {
    known: HashSet<PathBuf>,
}

/// A resolved specifier. `consumed` counts the leading `::`-segments of a
/// Rust path that name the module (the rest names items inside it).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub target: PathBuf,
    pub consumed: usize,
}

impl Resolver {
    pub fn new<I: IntoIterator<Item = PathBuf>>(known: I) -> Self {
        Self {
            known: known.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.known.contains(path)
    }

    #[must_use]
    pub fn resolve(&self, lang: Lang, from: &Path, spec: &str) -> Option<Resolved> {
        match lang {
            Lang::TypeScript | Lang::Tsx => self.resolve_script(from, spec),
            Lang::Python => self.resolve_python(from, spec),
            Lang::Rust => self.resolve_rust(from, spec),
        }
    }

    fn first_known(&self, candidates: impl IntoIterator<Item = PathBuf>) -> Option<PathBuf> {
        candidates.into_iter().find(|c| self.known.contains(c))
    }

    fn resolve_script(&self, from: &Path, spec: &str) -> Option<Resolved> {
        if !is_relative_script(spec) {
            return None;
        }
        let base = lexical_normalize(&from.parent()?.join(spec));
        let mut candidates = vec![base.clone()];
        // `./x.js` may name `x.ts` under ESM resolution.
        if let Some(ext) = base.extension().and_then(|e| e.to_str()) {
            if SCRIPT_EXTS.contains(&ext) {
                candidates.extend(SCRIPT_EXTS.iter().map(|e| base.with_extension(e)));
            }
        }
        let base_str = base.to_string_lossy().to_string();
        candidates.extend(SCRIPT_EXTS.iter().map(|e| PathBuf::from(format!("{base_str}.{e}"))));
        candidates.extend(SCRIPT_EXTS.iter().map(|e| base.join(format!("index.{e}"))));
        self.first_known(candidates).map(|target| Resolved { target, consumed: 0 })
    }

    fn resolve_python(&self, from: &Path, spec: &str) -> Option<Resolved> {
        let dots = spec.chars().take_while(|c| *c == '.').count();
        let rest = &spec[dots..];
        let segs: Vec<&str> = rest.split('.').filter(|s| !s.is_empty()).collect();
        let bases: Vec<PathBuf> = if dots > 0 {
            let mut dir = from.parent()?.to_path_buf();
            for _ in 1..dots {
                dir = dir.parent()?.to_path_buf();
            }
            vec![dir]
        } else {
            from.ancestors().skip(1).map(Path::to_path_buf).collect()
        };
        for base in bases {
            let mut module = base.clone();
            for s in &segs {
                module.push(s);
            }
            let found = self.first_known([module.with_extension("py"), module.join("__init__.py")]);
            if let Some(target) = found {
                return Some(Resolved { target, consumed: 0 });
            }
        }
        None
    }

    fn resolve_rust(&self, from: &Path, spec: &str) -> Option<Resolved> {
        let (src, current) = rust_module_path(from)?;
        let segs: Vec<&str> = spec.split("::").map(str::trim).collect();
        let (mut module, skip): (Vec<String>, usize) = match segs.first().copied() {
            Some("crate") => (Vec::new(), 1),
            Some("self") => (current.clone(), 1),
            Some("super") => {
                let mut m = current.clone();
                let mut n = 0;
                while segs.get(n).copied() == Some("super") {
                    m.pop();
                    n += 1;
                }
                (m, n)
            }
            _ => return None,
        };
        let mut best: Option<Resolved> = None;
        for (i, seg) in segs.iter().enumerate().skip(skip) {
            module.push((*seg).to_string());
            let file = src.join(module.join("/"));
            if let Some(target) =
                self.first_known([file.with_extension("rs"), file.join("mod.rs")])
            {
                best = Some(Resolved {
                    target,
                    consumed: i + 1,
                });
            }
        }
        best
    }
}

/// New specifier text that makes `from` import `new_target` where it used to
/// import `old_target` via `spec`.
#[must_use]
pub fn redirect_specifier(
    lang: Lang,
    from: &Path,
    spec: &str,
    resolved: &Resolved,
    new_target: &Path,
) -> Option<String> {
    match lang {
        Lang::TypeScript | Lang::Tsx => {
            let keep_ext = Path::new(spec)
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| SCRIPT_EXTS.contains(&e));
            Some(script_specifier(from.parent()?, new_target, keep_ext))
        }
        Lang::Python => python_redirect(from, spec, &resolved.target, new_target),
        Lang::Rust => {
            let (src_from, _) = rust_module_path(from)?;
            let (src_to, segs) = rust_module_path(new_target)?;
            if src_from != src_to {
                return None;
            }
            let rest: Vec<&str> = spec.split("::").map(str::trim).skip(resolved.consumed).collect();
            let mut parts = vec!["crate".to_string()];
            parts.extend(segs);
            parts.extend(rest.iter().map(|s| (*s).to_string()));
            Some(parts.join("::"))
        }
    }
}

fn python_module_segments(file: &Path) -> Vec<String> {
    let mut segs: Vec<String> = file
        .parent()
        .map(|p| {
            p.components()
                .map(|c| c.as_os_str().to_string_lossy().to_string())
                .collect()
        })
        .unwrap_or_default();
    if let Some(stem) = file.file_stem().map(|s| s.to_string_lossy().to_string()) {
        if stem != "__init__" {
            segs.push(stem);
        }
    }
    segs
}

fn python_redirect(from: &Path, spec: &str, old_target: &Path, new_target: &Path) -> Option<String> {
    if spec.starts_with('.') {
        let from_dir = from.parent()?;
        let rel = diff_paths(new_target, from_dir);
        let comps: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect();
        let ups = comps.iter().take_while(|c| *c == "..").count();
        let tail: Vec<String> = python_module_segments(&comps[ups..].iter().collect::<PathBuf>());
        return Some(format!("{}{}", ".".repeat(ups + 1), tail.join(".")));
    }
    // Absolute: find the sys.path base the old spec was resolved against.
    let depth = spec.split('.').count();
    let old_is_pkg = old_target.file_name().is_some_and(|n| n == "__init__.py");
    let mut base = old_target.parent()?;
    let levels = if old_is_pkg { depth } else { depth - 1 };
    for _ in 0..levels {
        base = base.parent()?;
    }
    let rel = new_target.strip_prefix(base).ok()?;
    Some(python_module_segments(rel).join("."))
}
