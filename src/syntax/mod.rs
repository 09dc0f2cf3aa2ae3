// src/syntax/mod.rs
//! Editable symbol tree over tree-sitter.
//!
//! A file is cut into top-level [`Item`]s. Each item owns the exact source
//! text from the end of the previous item through the end of its own node, so
//! leading comments and attributes travel with the declaration they annotate.
//! Concatenating every item's text plus [`SymbolTree::trailing`] reproduces
//! the input byte-for-byte.

pub mod items;
pub mod refs;

use crate::lang::Lang;
use std::collections::BTreeSet;
use std::ops::Range;
use thiserror::Error;
use tree_sitter::{Node, Parser, Tree};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SyntaxError {
    #[error("grammar unavailable: {0}")]
    Grammar(String),
    #[error("parser produced no tree")]
    NoTree,
    #[error("syntax error near line {line}")]
    Invalid { line: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    /// Must stay first in the file: shebangs, inner attributes, docstrings.
    Header,
    Import,
    /// Re-export of another module (`export .. from`, `pub use`).
    ReExport,
    /// `export { a, b }` without a source.
    ExportList,
    Function,
    Class,
    Enum,
    Interface,
    TypeAlias,
    Constant,
    Impl,
    Module,
    Macro,
    Statement,
}

impl ItemKind {
    #[must_use]
    pub fn is_type_like(self) -> bool {
        matches!(
            self,
            Self::Class | Self::Enum | Self::Interface | Self::TypeAlias
        )
    }

    /// Items that declare something a sibling could import.
    #[must_use]
    pub fn is_declaration(self) -> bool {
        matches!(
            self,
            Self::Function
                | Self::Class
                | Self::Enum
                | Self::Interface
                | Self::TypeAlias
                | Self::Constant
                | Self::Module
        )
    }
}

/// An import/export source string inside an item. `range` indexes into
/// [`Item::text`] and covers the specifier without quotes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Specifier {
    pub value: String,
    pub range: Range<usize>,
}

#[derive(Debug, Clone)]
pub struct Item {
    pub kind: ItemKind,
    /// Declared names, or local bindings for imports.
    pub names: Vec<String>,
    pub exported: bool,
    pub default_export: bool,
    /// Stays in the original file when the file is split.
    pub pinned: bool,
    /// Type-only declaration (TS interfaces and aliases).
    pub type_only: bool,
    /// Import with no usable binding list (side-effect or glob).
    pub side_effect: bool,
    /// Declares a module-level binding that other items may reassign.
    pub rebindable: bool,
    pub impl_target: Option<String>,
    pub text: String,
    /// Offset in `text` where the node itself starts.
    pub decl_offset: usize,
    /// Offsets in `text` where a visibility prefix widens a private declaration.
    pub widen_points: Vec<usize>,
    pub references: BTreeSet<String>,
    /// Plain names this item assigns to.
    pub assigned: BTreeSet<String>,
    pub specifiers: Vec<Specifier>,
    /// 1-based line of the node start in the original file.
    pub start_line: usize,
}

impl Item {
    /// Node text without leading trivia.
    #[must_use]
    pub fn body(&self) -> &str {
        self.text.get(self.decl_offset..).unwrap_or(&self.text)
    }

    /// Text with leading blank lines dropped, as emitted into a new file.
    #[must_use]
    pub fn trimmed(&self) -> &str {
        self.text.trim_start_matches(['\n', '\r'])
    }

    #[must_use]
    pub fn line_weight(&self) -> usize {
        self.trimmed().lines().count().max(1)
    }

    #[must_use]
    pub fn declares(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Inserts `prefix` at every widen point.
    #[must_use]
    pub fn widened(&self, prefix: &str) -> String {
        let mut out = self.text.clone();
        let mut points = self.widen_points.clone();
        points.sort_unstable();
        for p in points.into_iter().rev() {
            if out.is_char_boundary(p) {
                out.insert_str(p, prefix);
            }
        }
        out
    }

    /// Returns the text with the specifiers replaced (`edits` maps specifier
    /// index to the new value).
    #[must_use]
    pub fn with_specifiers(&self, edits: &[(usize, String)]) -> String {
        let mut sorted: Vec<&(usize, String)> = edits.iter().collect();
        sorted.sort_by(|a, b| b.0.cmp(&a.0));
        let mut ranges: Vec<(Range<usize>, &str)> = sorted
            .iter()
            .filter_map(|(i, v)| self.specifiers.get(*i).map(|s| (s.range.clone(), v.as_str())))
            .collect();
        ranges.sort_by(|a, b| b.0.start.cmp(&a.0.start));
        let mut out = self.text.clone();
        for (range, value) in ranges {
            if range.end <= out.len() && out.is_char_boundary(range.start) && out.is_char_boundary(range.end) {
                out.replace_range(range, value);
            }
        }
        out
    }
}

#[derive(Debug, Clone)]
pub struct SymbolTree {
    pub lang: Lang,
    pub items: Vec<Item>,
    /// Whitespace and comments after the last item.
    pub trailing: String,
}

impl SymbolTree {
    /// Parses `source`. Any ERROR or MISSING node fails the parse so callers
    /// never edit a tree the grammar did not fully understand.
    ///
    /// # Errors
    /// Returns `SyntaxError` if the grammar cannot load or the text has syntax errors.
    pub fn parse(lang: Lang, source: &str) -> Result<Self, SyntaxError> {
        let tree = parse_tree(lang, source)?;
        let root = tree.root_node();
        if root.has_error() {
            let line = first_error(root).map_or(1, |n| n.start_position().row + 1);
            return Err(SyntaxError::Invalid { line });
        }
        Ok(Self::build(lang, root, source))
    }

    fn build(lang: Lang, root: Node, source: &str) -> Self {
        let bytes = source.as_bytes();
        let mut items: Vec<Item> = Vec::new();
        let mut cursor_pos = 0usize;
        let mut last_end_row: Option<usize> = None;
        let mut walker = root.walk();

        for node in root.children(&mut walker) {
            if items::is_trivia(lang, node, bytes) {
                let same_row = last_end_row == Some(node.start_position().row);
                if same_row && node.kind().contains("comment") {
                    if let (Some(last), Some(chunk)) =
                        (items.last_mut(), source.get(cursor_pos..node.end_byte()))
                    {
                        last.text.push_str(chunk);
                        cursor_pos = node.end_byte();
                    }
                }
                continue;
            }
            let Some(text) = source.get(cursor_pos..node.end_byte()) else {
                continue;
            };
            let meta = items::describe(lang, node, bytes, items.len());
            let (references, assigned) = if meta.kind == ItemKind::Import {
                (BTreeSet::new(), BTreeSet::new())
            } else {
                (
                    refs::collect_identifiers(node, bytes),
                    refs::collect_assigned(lang, node, bytes),
                )
            };
            items.push(Item {
                kind: meta.kind,
                names: meta.names,
                exported: meta.exported,
                default_export: meta.default_export,
                pinned: meta.pinned,
                type_only: meta.type_only,
                side_effect: meta.side_effect,
                rebindable: meta.rebindable,
                impl_target: meta.impl_target,
                text: text.to_string(),
                decl_offset: node.start_byte() - cursor_pos,
                widen_points: meta
                    .widen
                    .iter()
                    .filter_map(|p| p.checked_sub(cursor_pos))
                    .collect(),
                references,
                assigned,
                specifiers: meta
                    .specifiers
                    .into_iter()
                    .filter_map(|(value, r)| {
                        Some(Specifier {
                            value,
                            range: r.start.checked_sub(cursor_pos)?..r.end.checked_sub(cursor_pos)?,
                        })
                    })
                    .collect(),
                start_line: node.start_position().row + 1,
            });
            cursor_pos = node.end_byte();
            last_end_row = Some(node.end_position().row);
        }

        Self {
            lang,
            items,
            trailing: source.get(cursor_pos..).unwrap_or_default().to_string(),
        }
    }

    /// Prints the tree. For an unmodified tree this is the parsed input.
    #[must_use]
    pub fn print(&self) -> String {
        let mut out = String::new();
        for item in &self.items {
            out.push_str(&item.text);
        }
        out.push_str(&self.trailing);
        out
    }

    pub fn imports(&self) -> impl Iterator<Item = &Item> {
        self.items.iter().filter(|i| i.kind == ItemKind::Import)
    }

    /// All outbound specifiers (imports and re-exports), in source order.
    #[must_use]
    pub fn specifiers(&self) -> Vec<String> {
        self.items
            .iter()
            .flat_map(|i| i.specifiers.iter().map(|s| s.value.clone()))
            .collect()
    }

    #[must_use]
    pub fn has_default_export(&self) -> bool {
        self.items.iter().any(|i| i.default_export)
    }
}

/// Raw tree-sitter parse, shared with the structural fingerprint pass.
///
/// # Errors
/// Returns `SyntaxError` if the grammar cannot be loaded or parsing yields nothing.
pub fn parse_tree(lang: Lang, source: &str) -> Result<Tree, SyntaxError> {
    let mut parser = Parser::new();
    parser
        .set_language(lang.grammar())
        .map_err(|e| SyntaxError::Grammar(e.to_string()))?;
    parser.parse(source, None).ok_or(SyntaxError::NoTree)
}

fn first_error(root: Node) -> Option<Node> {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            return Some(node);
        }
        if !node.has_error() {
            continue;
        }
        let mut cursor = node.walk();
        let mut children: Vec<Node> = node.children(&mut cursor).collect();
        children.reverse();
        stack.extend(children);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const TS: &str = r#"import { a } from './a';
import './side-effect';

// helper
export function one(): number {
  return a + 1; // trailing
}

const two = () => one() * 2;

export interface Shape { w: number }
"#;

    #[test]
    fn unmodified_tree_round_trips() -> Result<(), SyntaxError> {
        let tree = SymbolTree::parse(Lang::TypeScript, TS)?;
        assert_eq!(tree.print(), TS);
        Ok(())
    }

    #[test]
    fn ts_items_are_classified() -> Result<(), SyntaxError> {
        let tree = SymbolTree::parse(Lang::TypeScript, TS)?;
        let kinds: Vec<ItemKind> = tree.items.iter().map(|i| i.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ItemKind::Import,
                ItemKind::Import,
                ItemKind::Function,
                ItemKind::Constant,
                ItemKind::Interface
            ]
        );
        let one = &tree.items[2];
        assert!(one.exported);
        assert!(one.text.contains("// helper"));
        assert!(one.text.ends_with("}"));
        assert!(one.references.contains("a"));
        let two = &tree.items[3];
        assert!(!two.exported);
        assert_eq!(two.names, vec!["two"]);
        assert_eq!(two.widen_points.len(), 1);
        assert!(tree.items[1].side_effect);
        assert_eq!(tree.specifiers(), vec!["./a", "./side-effect"]);
        Ok(())
    }

    #[test]
    fn same_line_comment_stays_with_previous_item() -> Result<(), SyntaxError> {
        let src = "const a = 1; // one\nconst b = 2;\n";
        let tree = SymbolTree::parse(Lang::TypeScript, src)?;
        assert!(tree.items[0].text.ends_with("// one"));
        assert!(!tree.items[1].text.contains("one"));
        assert_eq!(tree.print(), src);
        Ok(())
    }

    #[test]
    fn default_reexports_count_as_default_exports() -> Result<(), SyntaxError> {
        let forwarded = SymbolTree::parse(Lang::TypeScript, "export { default } from './part_2';\n")?;
        assert!(forwarded.has_default_export());
        let renamed = SymbolTree::parse(Lang::TypeScript, "export { main as default } from './main';\n")?;
        assert!(renamed.has_default_export());
        let named = SymbolTree::parse(Lang::TypeScript, "export { a, b } from './part_1';\n")?;
        assert!(!named.has_default_export());
        Ok(())
    }

    #[test]
    fn syntax_errors_fail_the_parse() {
        let err = SymbolTree::parse(Lang::TypeScript, "function (\n{ let = ;\n");
        assert!(matches!(err, Err(SyntaxError::Invalid { .. })));
    }

    #[test]
    fn widening_inserts_prefix() -> Result<(), SyntaxError> {
        let tree = SymbolTree::parse(Lang::TypeScript, "\n\nconst x = 1;")?;
        assert_eq!(tree.items[0].widened("export "), "\n\nexport const x = 1;");
        Ok(())
    }

    #[test]
    fn specifier_edit_touches_only_the_literal() -> Result<(), SyntaxError> {
        let tree = SymbolTree::parse(Lang::TypeScript, "import { b } from './b';\n")?;
        let import = &tree.items[0];
        assert_eq!(import.specifiers[0].value, "./b");
        assert_eq!(
            import.with_specifiers(&[(0, "./a".to_string())]),
            "import { b } from './a';"
        );
        Ok(())
    }

    #[test]
    fn rust_items_and_attributes() -> Result<(), SyntaxError> {
        let src = "//! crate docs\nuse std::fmt;\n\n#[derive(Debug)]\nstruct Point { x: i32 }\n\nimpl Point {\n    fn new() -> Self { Point { x: 0 } }\n}\n\npub fn show(p: &Point) -> String { format!(\"{p:?}\") }\n";
        let tree = SymbolTree::parse(Lang::Rust, src)?;
        assert_eq!(tree.print(), src);
        let kinds: Vec<ItemKind> = tree.items.iter().map(|i| i.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ItemKind::Header,
                ItemKind::Import,
                ItemKind::Class,
                ItemKind::Impl,
                ItemKind::Function
            ]
        );
        assert!(tree.items[2].text.contains("#[derive(Debug)]"));
        assert_eq!(tree.items[3].impl_target.as_deref(), Some("Point"));
        assert_eq!(tree.items[3].widen_points.len(), 1);
        assert!(tree.items[4].exported);
        assert_eq!(tree.items[1].names, vec!["fmt"]);
        Ok(())
    }

    #[test]
    fn python_items() -> Result<(), SyntaxError> {
        let src = "\"\"\"Module docs.\"\"\"\nimport os\nfrom .models import User as U\n\nLIMIT = 3\n\n@cache\ndef load(path):\n    return os.path.join(path)\n\nclass _Hidden:\n    pass\n\nif __name__ == \"__main__\":\n    load('.')\n";
        let tree = SymbolTree::parse(Lang::Python, src)?;
        assert_eq!(tree.print(), src);
        assert_eq!(tree.items[0].kind, ItemKind::Header);
        assert_eq!(tree.items[1].names, vec!["os"]);
        assert_eq!(tree.items[2].names, vec!["U"]);
        assert_eq!(tree.items[2].specifiers[0].value, ".models");
        assert_eq!(tree.items[3].names, vec!["LIMIT"]);
        assert_eq!(tree.items[4].kind, ItemKind::Function);
        assert!(tree.items[4].text.contains("@cache"));
        assert!(!tree.items[5].exported);
        assert!(tree.items[6].pinned);
        Ok(())
    }
}
