// src/transform/layout/script.rs
//! TypeScript / JavaScript: parts live in `<dir>/<stem>/<part>.<ext>`, the
//! aggregator re-exports them with explicit `export { .. } from` lists.

use super::Layout;
use crate::model::FileOutput;
use crate::syntax::refs::{diff_paths, rebase_script};
use crate::syntax::Item;
use crate::transform::split::{blocks, join_items, Binding, Split};
use std::path::Path;

/// Module specifier from `from_dir` to `target`. ESM-only extensions are
/// spelled out; others resolve extensionless.
#[must_use]
pub fn module_specifier(from_dir: &Path, target: &Path) -> String {
    let mut rel = diff_paths(target, from_dir);
    let ext = target.extension().and_then(|e| e.to_str()).unwrap_or_default();
    match ext {
        "mjs" | "cjs" => {}
        "mts" => {
            rel.set_extension("mjs");
        }
        "cts" => {
            rel.set_extension("cjs");
        }
        _ => {
            rel.set_extension("");
        }
    }
    let s = rel.to_string_lossy().replace('\\', "/");
    if s.starts_with("../") {
        s
    } else {
        format!("./{s}")
    }
}

fn import_text(item: &Item, old_dir: &Path, new_dir: &Path) -> String {
    let edits: Vec<(usize, String)> = item
        .specifiers
        .iter()
        .enumerate()
        .map(|(i, s)| (i, rebase_script(&s.value, old_dir, new_dir)))
        .filter(|(i, v)| item.specifiers.get(*i).is_some_and(|s| &s.value != v))
        .collect();
    item.with_specifiers(&edits)
        .trim_start_matches(['\n', '\r'])
        .to_string()
}

/// `import` statements for `bindings` from `spec`.
fn import_lines(bindings: &[Binding], spec: &str) -> Vec<String> {
    let mut out = Vec::new();
    if let Some(d) = bindings.iter().find(|b| b.default) {
        out.push(format!("import {} from '{spec}';", d.name));
    }
    let values: Vec<&str> = bindings
        .iter()
        .filter(|b| !b.default && !b.type_only)
        .map(|b| b.name.as_str())
        .collect();
    let types: Vec<&str> = bindings
        .iter()
        .filter(|b| !b.default && b.type_only)
        .map(|b| b.name.as_str())
        .collect();
    if !values.is_empty() {
        out.push(format!("import {{ {} }} from '{spec}';", values.join(", ")));
    }
    if !types.is_empty() {
        out.push(format!("import type {{ {} }} from '{spec}';", types.join(", ")));
    }
    out
}

fn export_lines(bindings: &[Binding], spec: &str) -> Vec<String> {
    let mut out = Vec::new();
    let values: Vec<&str> = bindings
        .iter()
        .filter(|b| !b.default && !b.type_only)
        .map(|b| b.name.as_str())
        .collect();
    let types: Vec<&str> = bindings
        .iter()
        .filter(|b| !b.default && b.type_only)
        .map(|b| b.name.as_str())
        .collect();
    if !values.is_empty() {
        out.push(format!("export {{ {} }} from '{spec}';", values.join(", ")));
    }
    if !types.is_empty() {
        out.push(format!("export type {{ {} }} from '{spec}';", types.join(", ")));
    }
    if bindings.iter().any(|b| b.default) {
        out.push(format!("export {{ default }} from '{spec}';"));
    }
    out
}

/// Renders parts then the aggregator.
#[must_use]
pub fn render(layout: &Layout, split: &Split) -> Vec<FileOutput> {
    let old_dir = layout.source.parent().unwrap_or_else(|| Path::new(""));
    let paths: Vec<_> = split.parts.iter().map(|p| layout.part_path(&p.name)).collect();
    let mut outputs = Vec::with_capacity(split.parts.len() + 1);

    for (idx, part) in split.parts.iter().enumerate() {
        let preamble: Vec<String> = part
            .imports
            .iter()
            .map(|i| import_text(i, old_dir, &layout.dir))
            .collect();
        let mut siblings = Vec::new();
        for (q, bindings) in &part.siblings {
            if let Some(target) = paths.get(*q) {
                siblings.extend(import_lines(bindings, &module_specifier(&layout.dir, target)));
            }
        }
        let body = join_items(&part.items, &part.widen, Some("export "));
        outputs.push(FileOutput {
            path: paths[idx].clone(),
            content: blocks(&[preamble.join("\n"), siblings.join("\n"), body]),
        });
    }

    let agg = &split.aggregator;
    let headers: Vec<&str> = agg.headers.iter().map(|h| h.trimmed()).collect();
    let kept: Vec<&str> = agg.imports.iter().map(|i| i.trimmed()).collect();
    let mut pinned_imports = Vec::new();
    for (q, bindings) in &agg.pinned_refs {
        if let Some(target) = paths.get(*q) {
            pinned_imports.extend(import_lines(bindings, &module_specifier(old_dir, target)));
        }
    }
    let mut exports = Vec::new();
    for (q, bindings) in agg.surface.iter().enumerate() {
        let Some(target) = paths.get(q) else { continue };
        let spec = module_specifier(old_dir, target);
        if bindings.is_empty() {
            // Statement-only parts still have to run.
            exports.push(format!("import '{spec}';"));
        } else {
            exports.extend(export_lines(bindings, &spec));
        }
    }
    let pinned = join_items(&agg.pinned, &[], None);

    outputs.push(FileOutput {
        path: layout.source.clone(),
        content: blocks(&[
            headers.join("\n"),
            [kept, pinned_imports.iter().map(String::as_str).collect()].concat().join("\n"),
            exports.join("\n"),
            pinned,
        ]),
    });
    outputs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::Lang;
    use crate::syntax::SymbolTree;
    use crate::transform::split::PartSpec;
    use std::path::PathBuf;

    #[test]
    fn specifiers_follow_extension_rules() {
        let dir = Path::new("/r/src");
        assert_eq!(module_specifier(dir, Path::new("/r/src/big/part_1.ts")), "./big/part_1");
        assert_eq!(module_specifier(dir, Path::new("/r/src/big/part_1.mts")), "./big/part_1.mjs");
        assert_eq!(module_specifier(Path::new("/r/src/big"), Path::new("/r/lib/x.mjs")), "../../lib/x.mjs");
    }

    #[test]
    fn renders_parts_and_aggregator() -> anyhow::Result<()> {
        let src = "import { db } from './db';\n\ntype Row = { id: number };\n\nexport function load(): Row[] {\n  return db.all();\n}\n\nexport default function main() {\n  return load();\n}\n";
        let tree = SymbolTree::parse(Lang::TypeScript, src)?;
        let layout = Layout::new(Lang::TypeScript, Path::new("/r/src/big.ts"));
        let parts = vec![
            PartSpec { name: "part_1".into(), items: vec![1, 2] },
            PartSpec { name: "part_2".into(), items: vec![3] },
        ];
        let split = Split::build(&tree, &parts, false);
        let out = render(&layout, &split);

        assert_eq!(out[0].path, PathBuf::from("/r/src/big/part_1.ts"));
        assert_eq!(
            out[0].content,
            "import { db } from '../db';\n\ntype Row = { id: number };\n\nexport function load(): Row[] {\n  return db.all();\n}\n"
        );
        assert_eq!(
            out[1].content,
            "import { load } from './part_1';\n\nexport default function main() {\n  return load();\n}\n"
        );
        assert_eq!(out[2].path, PathBuf::from("/r/src/big.ts"));
        assert_eq!(
            out[2].content,
            "export { load } from './big/part_1';\nexport { default } from './big/part_2';\n"
        );
        Ok(())
    }
}
