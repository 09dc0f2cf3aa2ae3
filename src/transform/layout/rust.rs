// src/transform/layout/rust.rs
//! Rust: parts become child modules. The aggregator declares them and
//! glob re-exports their items; private items are widened to `pub(super)`
//! so they stay visible wherever they were visible before.

use super::Layout;
use crate::model::FileOutput;
use crate::syntax::refs::rebase_rust;
use crate::syntax::{Item, ItemKind, SymbolTree};
use crate::transform::split::{blocks, join_items, Binding, Split};

pub const WIDEN: &str = "pub(super) ";

fn import_text(item: &Item, local: &[String]) -> String {
    let edits: Vec<(usize, String)> = item
        .specifiers
        .iter()
        .enumerate()
        .map(|(i, s)| (i, rebase_rust(&s.value, local)))
        .collect();
    item.with_specifiers(&edits)
        .trim_start_matches(['\n', '\r'])
        .to_string()
}

fn use_line(prefix: &str, names: &[&str]) -> String {
    match names {
        [one] => format!("use {prefix}::{one};"),
        _ => format!("use {prefix}::{{{}}};", names.join(", ")),
    }
}

fn names_of(bindings: &[Binding]) -> Vec<&str> {
    bindings.iter().map(|b| b.name.as_str()).collect()
}

/// Renders parts then the aggregator.
#[must_use]
pub fn render(layout: &Layout, tree: &SymbolTree, split: &Split) -> Vec<FileOutput> {
    let local: Vec<String> = tree
        .items
        .iter()
        .filter(|i| i.kind != ItemKind::Import)
        .flat_map(|i| i.names.iter().cloned())
        .collect();
    let modules: Vec<String> = split.parts.iter().map(|p| layout.module_name(&p.name)).collect();
    let mut outputs = Vec::with_capacity(split.parts.len() + 1);

    for (idx, part) in split.parts.iter().enumerate() {
        let mut uses: Vec<String> = Vec::new();
        if !part.from_parent.is_empty() {
            let names: Vec<&str> = part.from_parent.iter().map(String::as_str).collect();
            uses.push(use_line("super", &names));
        }
        uses.extend(part.imports.iter().map(|i| import_text(i, &local)));
        for (q, bindings) in &part.siblings {
            if let Some(module) = modules.get(*q) {
                uses.push(use_line(&format!("super::{module}"), &names_of(bindings)));
            }
        }
        let body = join_items(&part.items, &part.widen, Some(WIDEN));
        outputs.push(FileOutput {
            path: layout.part_path(&part.name),
            content: blocks(&[uses.join("\n"), body]),
        });
    }

    let agg = &split.aggregator;
    let headers: Vec<&str> = agg.headers.iter().map(|h| h.trimmed()).collect();
    let kept: Vec<&str> = agg.imports.iter().map(|i| i.trimmed()).collect();
    let decls: Vec<String> = modules
        .iter()
        .map(|m| {
            if layout.path_attr {
                format!("#[path = \"{}/{m}.rs\"]\nmod {m};", layout.stem)
            } else {
                format!("mod {m};")
            }
        })
        .collect();
    let reexports: Vec<String> = modules.iter().map(|m| format!("pub use self::{m}::*;")).collect();

    outputs.push(FileOutput {
        path: layout.source.clone(),
        content: blocks(&[
            headers.join("\n"),
            kept.join("\n"),
            join_items(&agg.pinned, &[], None),
            decls.join("\n"),
            reexports.join("\n"),
        ]),
    });
    outputs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::Lang;
    use crate::transform::split::PartSpec;
    use std::path::{Path, PathBuf};

    const SRC: &str = "//! Shapes.\nuse std::fmt;\n\nmod extra;\n\n#[derive(Debug)]\nstruct Point {\n    x: i32,\n}\n\nimpl Point {\n    fn origin() -> Self {\n        Point { x: 0 }\n    }\n}\n\npub fn show(p: &Point) -> String {\n    format!(\"{p:?}\")\n}\n\nimpl fmt::Display for Point {\n    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {\n        write!(f, \"{}\", extra::label(self.x))\n    }\n}\n";

    #[test]
    fn renders_child_modules() -> anyhow::Result<()> {
        let tree = SymbolTree::parse(Lang::Rust, SRC)?;
        // 0 header, 1 use, 2 mod, 3 struct, 4 impl, 5 fn, 6 impl Display
        let layout = Layout::new(Lang::Rust, Path::new("/r/src/shapes.rs"));
        let parts = vec![
            PartSpec { name: "part_1".into(), items: vec![3, 4] },
            PartSpec { name: "part_2".into(), items: vec![5, 6] },
        ];
        let split = Split::build(&tree, &parts, true);
        let out = render(&layout, &tree, &split);

        assert_eq!(out[0].path, PathBuf::from("/r/src/shapes/part_1.rs"));
        assert_eq!(
            out[0].content,
            "#[derive(Debug)]\npub(super) struct Point {\n    pub(super) x: i32,\n}\n\nimpl Point {\n    pub(super) fn origin() -> Self {\n        Point { x: 0 }\n    }\n}\n"
        );
        assert!(out[1].content.starts_with("use super::extra;\nuse std::fmt;\nuse super::part_1::Point;\n\npub fn show"));
        assert_eq!(
            out[2].content,
            "//! Shapes.\n\nmod extra;\n\nmod part_1;\nmod part_2;\n\npub use self::part_1::*;\npub use self::part_2::*;\n"
        );
        Ok(())
    }

    #[test]
    fn crate_root_like_files_use_path_attributes() {
        let layout = Layout::new(Lang::Rust, Path::new("/r/src/bin/tool.rs"));
        assert!(layout.path_attr);
        assert_eq!(use_line("super", &["a", "b"]), "use super::{a, b};");
    }
}
