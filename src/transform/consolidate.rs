// src/transform/consolidate.rs
//! Replacing a duplicate with a re-export of its canonical twin, and
//! pointing importers at the canonical file.

use crate::error::TransformError;
use crate::lang::{Lang, LangFamily};
use crate::model::FileOutput;
use crate::syntax::refs::{diff_paths, redirect_specifier, rust_module_path, Resolver};
use crate::syntax::{ItemKind, SymbolTree};
use crate::transform::layout::script::module_specifier;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// New content for duplicate `path`: a re-export of `canonical`.
///
/// `tree` is the duplicate's own pre-run tree. Group members share one
/// normalized text, so it carries the canonical's export surface even after
/// the canonical itself has been split.
///
/// # Errors
/// `Ambiguous` when no import path from `path` to `canonical` can be written.
pub fn reexport(
    lang: Lang,
    path: &Path,
    tree: &SymbolTree,
    canonical: &Path,
    resolver: &Resolver,
) -> Result<String, TransformError> {
    match lang.family() {
        LangFamily::Script => {
            let dir = path.parent().unwrap_or_else(|| Path::new(""));
            let spec = module_specifier(dir, canonical);
            let mut out = format!("export * from '{spec}';\n");
            if tree.has_default_export() {
                out.push_str(&format!("export {{ default }} from '{spec}';\n"));
            }
            Ok(out)
        }
        LangFamily::Rust => rust_reexport(path, tree, canonical),
        LangFamily::Python => python_reexport(path, canonical, resolver),
    }
}

fn rust_reexport(path: &Path, tree: &SymbolTree, canonical: &Path) -> Result<String, TransformError> {
    let external_mod = tree
        .items
        .iter()
        .any(|i| i.kind == ItemKind::Module && i.trimmed().trim_end().ends_with(';'));
    if external_mod {
        return Err(TransformError::Ambiguous(format!(
            "{} declares file modules that would be orphaned",
            path.display()
        )));
    }
    let from = rust_module_path(path);
    let to = rust_module_path(canonical);
    match (from, to) {
        (Some((src_a, _)), Some((src_b, segs))) if src_a == src_b && !segs.is_empty() => {
            Ok(format!("pub use crate::{}::*;\n", segs.join("::")))
        }
        _ => Err(TransformError::Ambiguous(format!(
            "{} and {} are not modules of the same crate",
            path.display(),
            canonical.display()
        ))),
    }
}

/// Top-most package directory containing `dir` (following `__init__.py`).
fn package_root(dir: &Path, resolver: &Resolver) -> Option<PathBuf> {
    let mut root = None;
    let mut cur = Some(dir);
    while let Some(d) = cur {
        if !resolver.contains(&d.join("__init__.py")) {
            break;
        }
        root = Some(d.to_path_buf());
        cur = d.parent();
    }
    root
}

fn python_reexport(path: &Path, canonical: &Path, resolver: &Resolver) -> Result<String, TransformError> {
    let from_dir = path.parent().unwrap_or_else(|| Path::new(""));
    let to_dir = canonical.parent().unwrap_or_else(|| Path::new(""));
    let stem = canonical
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let in_package = resolver.contains(&from_dir.join("__init__.py"));

    if from_dir == to_dir && !in_package {
        return Ok(format!("from {stem} import *  # noqa: F401,F403\n"));
    }
    let same_package = match (package_root(from_dir, resolver), package_root(to_dir, resolver)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    };
    if !same_package {
        return Err(TransformError::Ambiguous(format!(
            "no import path from {} to {}",
            path.display(),
            canonical.display()
        )));
    }
    let rel = diff_paths(to_dir, from_dir);
    let mut ups = 1;
    let mut segs: Vec<String> = Vec::new();
    for comp in rel.components() {
        match comp {
            Component::ParentDir => ups += 1,
            other => segs.push(other.as_os_str().to_string_lossy().to_string()),
        }
    }
    if stem != "__init__" {
        segs.push(stem);
    }
    Ok(format!(
        "from {}{} import *  # noqa: F401,F403\n",
        ".".repeat(ups),
        segs.join(".")
    ))
}

/// Rewrites the import specifiers of `dependent` that resolve to a key of
/// `redirects`. `Ok(None)` if nothing changed.
///
/// # Errors
/// Returns `TransformError` if the dependent cannot be read or parsed.
pub fn rewrite_dependent(
    dependent: &Path,
    redirects: &BTreeMap<PathBuf, PathBuf>,
    resolver: &Resolver,
) -> Result<Option<FileOutput>, TransformError> {
    let lang = Lang::from_path(dependent)
        .ok_or_else(|| TransformError::UnsupportedLanguage(dependent.display().to_string()))?;
    let source = fs::read_to_string(dependent).map_err(|e| TransformError::Read {
        path: dependent.to_path_buf(),
        reason: e.to_string(),
    })?;
    let tree = SymbolTree::parse(lang, &source).map_err(|e| TransformError::Parse {
        path: dependent.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut changed = false;
    let mut out = String::with_capacity(source.len());
    for item in &tree.items {
        let edits: Vec<(usize, String)> = item
            .specifiers
            .iter()
            .enumerate()
            .filter_map(|(i, spec)| {
                let resolved = resolver.resolve(lang, dependent, &spec.value)?;
                let new_target = redirects.get(&resolved.target)?;
                if new_target == dependent {
                    return None;
                }
                let new_spec = redirect_specifier(lang, dependent, &spec.value, &resolved, new_target)?;
                (new_spec != spec.value).then_some((i, new_spec))
            })
            .collect();
        if edits.is_empty() {
            out.push_str(&item.text);
        } else {
            changed = true;
            out.push_str(&item.with_specifiers(&edits));
        }
    }
    out.push_str(&tree.trailing);

    Ok(changed.then(|| FileOutput {
        path: dependent.to_path_buf(),
        content: out,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(lang: Lang, src: &str) -> SymbolTree {
        SymbolTree::parse(lang, src).unwrap_or_else(|e| panic!("{e}"))
    }

    #[test]
    fn script_reexport_keeps_default() -> Result<(), TransformError> {
        let dup = parse(Lang::TypeScript, "export default function f() {}\n");
        let out = reexport(
            Lang::TypeScript,
            Path::new("/r/lib/b.ts"),
            &dup,
            Path::new("/r/a.ts"),
            &Resolver::default(),
        )?;
        assert_eq!(out, "export * from '../a';\nexport { default } from '../a';\n");
        Ok(())
    }

    #[test]
    fn rust_reexport_uses_crate_path() -> Result<(), TransformError> {
        let tree = parse(Lang::Rust, "pub fn f() {}\n");
        let out = reexport(
            Lang::Rust,
            Path::new("/r/src/copy/util.rs"),
            &tree,
            Path::new("/r/src/util.rs"),
            &Resolver::default(),
        )?;
        assert_eq!(out, "pub use crate::util::*;\n");

        let with_mod = parse(Lang::Rust, "mod inner;\npub fn f() {}\n");
        let err = reexport(
            Lang::Rust,
            Path::new("/r/src/copy/util.rs"),
            &with_mod,
            Path::new("/r/src/util.rs"),
            &Resolver::default(),
        );
        assert!(matches!(err, Err(TransformError::Ambiguous(_))));
        Ok(())
    }

    #[test]
    fn python_reexport_is_relative_inside_a_package() -> Result<(), TransformError> {
        let resolver = Resolver::new([
            PathBuf::from("/r/shop/__init__.py"),
            PathBuf::from("/r/shop/legacy/__init__.py"),
        ]);
        let tree = parse(Lang::Python, "def f():\n    pass\n");
        let out = reexport(
            Lang::Python,
            Path::new("/r/shop/legacy/orders.py"),
            &tree,
            Path::new("/r/shop/orders.py"),
            &resolver,
        )?;
        assert_eq!(out, "from ..orders import *  # noqa: F401,F403\n");

        let loose = reexport(
            Lang::Python,
            Path::new("/r/tools/b.py"),
            &tree,
            Path::new("/r/shop/orders.py"),
            &resolver,
        );
        assert!(matches!(loose, Err(TransformError::Ambiguous(_))));
        Ok(())
    }

    #[test]
    fn dependents_get_only_their_redirected_specifiers_rewritten() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let root = dir.path();
        fs::create_dir_all(root.join("lib"))?;
        let app = root.join("app.ts");
        fs::write(
            &app,
            "import { b } from './lib/b';\nimport { c } from './c';\n// './lib/b' in a comment\nconsole.log(b, c);\n",
        )?;
        let resolver = Resolver::new([
            app.clone(),
            root.join("a.ts"),
            root.join("lib/b.ts"),
            root.join("c.ts"),
        ]);
        let redirects = BTreeMap::from([(root.join("lib/b.ts"), root.join("a.ts"))]);

        let out = rewrite_dependent(&app, &redirects, &resolver)?;
        let content = out.map(|o| o.content).unwrap_or_default();
        assert_eq!(
            content,
            "import { b } from './a';\nimport { c } from './c';\n// './lib/b' in a comment\nconsole.log(b, c);\n"
        );
        Ok(())
    }
}
