// src/duplicates/fingerprint.rs
//! Identifier-invariant structural fingerprint of a whole file.
//!
//! Walks the syntax tree depth-first and hashes node kinds, child positions
//! and the text of every leaf except identifiers and comments. Two files that
//! differ only in the names they use produce the same fingerprint.

use crate::lang::Lang;
use crate::syntax::parse_tree;
use sha2::{Digest, Sha256};
use tree_sitter::Node;

/// Leaf kinds hashed by kind only.
const IDENTIFIER_KINDS: &[&str] = &[
    "identifier",
    "type_identifier",
    "field_identifier",
    "property_identifier",
    "shorthand_property_identifier",
    "shorthand_property_identifier_pattern",
    "private_property_identifier",
];

/// Fingerprint of `source`, or `None` if it does not parse cleanly.
#[must_use]
pub fn compute(lang: Lang, source: &str) -> Option<String> {
    let tree = parse_tree(lang, source).ok()?;
    let root = tree.root_node();
    if root.has_error() {
        return None;
    }
    let mut state = FingerprintState {
        hasher: Sha256::new(),
        node_count: 0,
    };
    state.mix(lang.family().as_str().as_bytes());
    state.visit(root, source.as_bytes(), 0);
    // Tiny files collide structurally by accident.
    (state.node_count >= 16).then(|| format!("{:x}", state.hasher.finalize()))
}

struct FingerprintState {
    hasher: Sha256,
    node_count: usize,
}

impl FingerprintState {
    fn mix(&mut self, bytes: &[u8]) {
        self.hasher.update((bytes.len() as u64).to_le_bytes());
        self.hasher.update(bytes);
    }

    fn visit(&mut self, node: Node, source: &[u8], depth: usize) {
        let kind = node.kind();
        if kind.contains("comment") {
            return;
        }
        self.node_count += 1;
        self.mix(&(depth as u64).to_le_bytes());
        self.mix(kind.as_bytes());

        if node.child_count() == 0 && !IDENTIFIER_KINDS.contains(&kind) {
            if let Ok(text) = node.utf8_text(source) {
                self.mix(text.as_bytes());
            }
        }

        let mut cursor = node.walk();
        let children: Vec<Node> = node.children(&mut cursor).collect();
        self.mix(&(children.len() as u64).to_le_bytes());
        for (i, child) in children.into_iter().enumerate() {
            self.mix(&(i as u64).to_le_bytes());
            self.visit(child, source, depth + 1);
        }
    }
}
