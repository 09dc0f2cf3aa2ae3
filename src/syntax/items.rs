// src/syntax/items.rs
//! Per-language mapping from top-level tree-sitter nodes to item metadata.

use super::ItemKind;
use crate::lang::Lang;
use std::ops::Range;
use tree_sitter::Node;

/// Metadata for one top-level node. Byte positions are absolute.
#[derive(Debug)]
pub struct ItemMeta {
    pub kind: ItemKind,
    pub names: Vec<String>,
    pub exported: bool,
    pub default_export: bool,
    pub pinned: bool,
    pub type_only: bool,
    pub side_effect: bool,
    pub rebindable: bool,
    pub impl_target: Option<String>,
    pub widen: Vec<usize>,
    pub specifiers: Vec<(String, Range<usize>)>,
}

impl ItemMeta {
    fn new(kind: ItemKind) -> Self {
        Self {
            kind,
            names: Vec::new(),
            exported: false,
            default_export: false,
            pinned: false,
            type_only: false,
            side_effect: false,
            rebindable: false,
            impl_target: None,
            widen: Vec::new(),
            specifiers: Vec::new(),
        }
    }

    fn pinned(kind: ItemKind) -> Self {
        let mut meta = Self::new(kind);
        meta.pinned = true;
        meta
    }
}

fn text<'a>(node: Node, bytes: &'a [u8]) -> &'a str {
    node.utf8_text(bytes).unwrap_or("")
}

fn field_text(node: Node, field: &str, bytes: &[u8]) -> Option<String> {
    node.child_by_field_name(field)
        .map(|n| text(n, bytes).to_string())
}

fn has_child_kind(node: Node, kind: &str) -> bool {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).any(|c| c.kind() == kind);
    found
}

/// Nodes that attach to the following item instead of forming one.
#[must_use]
pub fn is_trivia(lang: Lang, node: Node, bytes: &[u8]) -> bool {
    match lang {
        Lang::Rust => match node.kind() {
            "line_comment" => !text(node, bytes).starts_with("//!"),
            "block_comment" => !text(node, bytes).starts_with("/*!"),
            "attribute_item" => true,
            _ => false,
        },
        Lang::Python | Lang::TypeScript | Lang::Tsx => node.kind() == "comment",
    }
}

/// Describes a top-level node. `index` is the number of items before it.
#[must_use]
pub fn describe(lang: Lang, node: Node, bytes: &[u8], index: usize) -> ItemMeta {
    match lang {
        Lang::Rust => describe_rust(node, bytes),
        Lang::Python => describe_python(node, bytes, index),
        Lang::TypeScript | Lang::Tsx => describe_script(node, bytes, index),
    }
}

// ---------------------------------------------------------------- Rust

fn describe_rust(node: Node, bytes: &[u8]) -> ItemMeta {
    let has_vis = has_child_kind(node, "visibility_modifier");
    let kind = match node.kind() {
        "use_declaration" => return rust_use(node, bytes, has_vis),
        "line_comment" | "block_comment" | "inner_attribute_item" | "extern_crate_declaration" => {
            return ItemMeta::pinned(ItemKind::Header)
        }
        "mod_item" => {
            let mut meta = ItemMeta::pinned(ItemKind::Module);
            meta.names.extend(field_text(node, "name", bytes));
            meta.exported = has_vis;
            return meta;
        }
        "macro_definition" => {
            let mut meta = ItemMeta::pinned(ItemKind::Macro);
            meta.names.extend(field_text(node, "name", bytes));
            return meta;
        }
        "impl_item" => return rust_impl(node, bytes),
        "function_item" | "function_signature_item" => ItemKind::Function,
        "struct_item" | "union_item" => ItemKind::Class,
        "enum_item" => ItemKind::Enum,
        "trait_item" => ItemKind::Interface,
        "type_item" => ItemKind::TypeAlias,
        "const_item" | "static_item" => ItemKind::Constant,
        _ => return ItemMeta::new(ItemKind::Statement),
    };
    let mut meta = ItemMeta::new(kind);
    meta.names.extend(field_text(node, "name", bytes));
    meta.exported = has_vis;
    if !has_vis {
        meta.widen.push(node.start_byte());
    }
    if node.kind() == "struct_item" {
        widen_private_children(node, "field_declaration", &mut meta.widen);
    }
    meta
}

fn widen_private_children(node: Node, kind: &str, widen: &mut Vec<usize>) {
    let Some(body) = node.child_by_field_name("body") else {
        return;
    };
    let mut cursor = body.walk();
    for child in body.named_children(&mut cursor) {
        if child.kind() == kind && !has_child_kind(child, "visibility_modifier") {
            widen.push(child.start_byte());
        }
    }
}

fn rust_use(node: Node, bytes: &[u8], has_vis: bool) -> ItemMeta {
    let mut meta = if has_vis {
        let mut m = ItemMeta::pinned(ItemKind::ReExport);
        m.exported = true;
        m
    } else {
        ItemMeta::new(ItemKind::Import)
    };
    if let Some(arg) = node.child_by_field_name("argument") {
        rust_use_bindings(arg, bytes, &mut meta);
        if let Some(path) = rust_use_path(arg) {
            meta.specifiers
                .push((text(path, bytes).to_string(), path.byte_range()));
        }
    }
    meta
}

fn rust_use_bindings(node: Node, bytes: &[u8], meta: &mut ItemMeta) {
    match node.kind() {
        "identifier" => meta.names.push(text(node, bytes).to_string()),
        "scoped_identifier" => match field_text(node, "name", bytes) {
            Some(name) if name != "self" => meta.names.push(name),
            _ => meta.side_effect = true,
        },
        "use_as_clause" => match field_text(node, "alias", bytes) {
            Some(alias) if alias != "_" => meta.names.push(alias),
            _ => meta.side_effect = true,
        },
        "use_list" => {
            let mut cursor = node.walk();
            let children: Vec<Node> = node.named_children(&mut cursor).collect();
            for child in children {
                rust_use_bindings(child, bytes, meta);
            }
        }
        "scoped_use_list" => {
            if let Some(list) = node.child_by_field_name("list") {
                rust_use_bindings(list, bytes, meta);
            }
        }
        "use_wildcard" | "self" => meta.side_effect = true,
        _ => {}
    }
}

/// Module path node of a use tree (`crate::a::b` in `use crate::a::b::{C, D}`).
#[must_use]
pub fn rust_use_path(arg: Node) -> Option<Node> {
    match arg.kind() {
        "scoped_identifier" | "identifier" | "crate" | "super" | "self" => Some(arg),
        "scoped_use_list" | "use_as_clause" => arg.child_by_field_name("path"),
        "use_wildcard" => arg.named_child(0),
        _ => None,
    }
}

fn rust_impl(node: Node, bytes: &[u8]) -> ItemMeta {
    let mut meta = ItemMeta::new(ItemKind::Impl);
    meta.impl_target = node.child_by_field_name("type").map(|t| rust_type_name(t, bytes));
    if node.child_by_field_name("trait").is_some() {
        return meta;
    }
    // Inherent methods become callable from sibling modules.
    widen_private_children(node, "function_item", &mut meta.widen);
    widen_private_children(node, "const_item", &mut meta.widen);
    meta
}

fn rust_type_name(node: Node, bytes: &[u8]) -> String {
    match node.kind() {
        "generic_type" => node
            .child_by_field_name("type")
            .map_or_else(|| text(node, bytes).to_string(), |t| rust_type_name(t, bytes)),
        "scoped_type_identifier" => field_text(node, "name", bytes)
            .unwrap_or_else(|| text(node, bytes).to_string()),
        _ => text(node, bytes).to_string(),
    }
}

// ---------------------------------------------------------------- Python

fn describe_python(node: Node, bytes: &[u8], index: usize) -> ItemMeta {
    match node.kind() {
        "import_statement" => python_import(node, bytes),
        "import_from_statement" => python_from_import(node, bytes),
        "future_import_statement" => {
            let mut meta = ItemMeta::new(ItemKind::Import);
            meta.side_effect = true;
            meta
        }
        "function_definition" | "class_definition" => python_definition(node, bytes),
        "decorated_definition" => node
            .child_by_field_name("definition")
            .map_or_else(|| ItemMeta::new(ItemKind::Statement), |d| python_definition(d, bytes)),
        "expression_statement" => python_expression(node, bytes, index),
        "if_statement" => {
            let guard = node
                .child_by_field_name("condition")
                .is_some_and(|c| text(c, bytes).contains("__name__"));
            if guard {
                ItemMeta::pinned(ItemKind::Statement)
            } else {
                ItemMeta::new(ItemKind::Statement)
            }
        }
        _ => ItemMeta::new(ItemKind::Statement),
    }
}

fn python_definition(node: Node, bytes: &[u8]) -> ItemMeta {
    let kind = if node.kind() == "class_definition" {
        ItemKind::Class
    } else {
        ItemKind::Function
    };
    let mut meta = ItemMeta::new(kind);
    meta.names.extend(field_text(node, "name", bytes));
    meta.exported = meta.names.iter().any(|n| !n.starts_with('_'));
    meta
}

fn python_expression(node: Node, bytes: &[u8], index: usize) -> ItemMeta {
    let Some(inner) = node.named_child(0) else {
        return ItemMeta::new(ItemKind::Statement);
    };
    match inner.kind() {
        "string" if index == 0 => ItemMeta::pinned(ItemKind::Header),
        "assignment" => {
            let mut meta = ItemMeta::new(ItemKind::Constant);
            meta.rebindable = true;
            if let Some(left) = inner.child_by_field_name("left") {
                collect_pattern_names(left, bytes, &mut meta.names);
            }
            meta.pinned = meta.names.iter().any(|n| n == "__all__");
            meta.exported = meta.names.iter().any(|n| !n.starts_with('_'));
            meta
        }
        _ => ItemMeta::new(ItemKind::Statement),
    }
}

fn python_import(node: Node, bytes: &[u8]) -> ItemMeta {
    let mut meta = ItemMeta::new(ItemKind::Import);
    let mut cursor = node.walk();
    for name in node.children_by_field_name("name", &mut cursor) {
        match name.kind() {
            "dotted_name" => {
                meta.specifiers.push((text(name, bytes).to_string(), name.byte_range()));
                if let Some(first) = name.named_child(0) {
                    meta.names.push(text(first, bytes).to_string());
                }
            }
            "aliased_import" => {
                if let Some(module) = name.child_by_field_name("name") {
                    meta.specifiers
                        .push((text(module, bytes).to_string(), module.byte_range()));
                }
                meta.names.extend(field_text(name, "alias", bytes));
            }
            _ => {}
        }
    }
    meta
}

fn python_from_import(node: Node, bytes: &[u8]) -> ItemMeta {
    let mut meta = ItemMeta::new(ItemKind::Import);
    if let Some(module) = node.child_by_field_name("module_name") {
        meta.specifiers
            .push((text(module, bytes).to_string(), module.byte_range()));
    }
    if has_child_kind(node, "wildcard_import") {
        meta.side_effect = true;
    }
    let mut cursor = node.walk();
    for name in node.children_by_field_name("name", &mut cursor) {
        match name.kind() {
            "dotted_name" => {
                let last = name.named_child(name.named_child_count().saturating_sub(1));
                meta.names.extend(last.map(|n| text(n, bytes).to_string()));
            }
            "aliased_import" => meta.names.extend(field_text(name, "alias", bytes)),
            _ => {}
        }
    }
    meta
}

// ---------------------------------------------------------------- TS / JS

fn describe_script(node: Node, bytes: &[u8], index: usize) -> ItemMeta {
    match node.kind() {
        "hash_bang_line" => ItemMeta::pinned(ItemKind::Header),
        "import_statement" => script_import(node, bytes),
        "export_statement" => script_export(node, bytes),
        "expression_statement" => {
            let directive = index == 0
                && node.named_child(0).is_some_and(|c| c.kind() == "string");
            if directive {
                ItemMeta::pinned(ItemKind::Header)
            } else {
                ItemMeta::new(ItemKind::Statement)
            }
        }
        _ => {
            let mut meta = script_declaration(node, bytes);
            if meta.kind.is_declaration() && !meta.names.is_empty() && !meta.pinned {
                meta.widen.push(node.start_byte());
            }
            meta
        }
    }
}

fn script_declaration(node: Node, bytes: &[u8]) -> ItemMeta {
    let kind = match node.kind() {
        "lexical_declaration" | "variable_declaration" => {
            let mut meta = ItemMeta::new(ItemKind::Constant);
            meta.rebindable = node.kind() == "variable_declaration"
                || node.child(0).is_some_and(|c| c.kind() == "let");
            let mut cursor = node.walk();
            for decl in node.named_children(&mut cursor) {
                if decl.kind() == "variable_declarator" {
                    if let Some(name) = decl.child_by_field_name("name") {
                        collect_pattern_names(name, bytes, &mut meta.names);
                    }
                }
            }
            return meta;
        }
        "ambient_declaration" => {
            let inner = node.named_child(0);
            return inner.map_or_else(
                || ItemMeta::new(ItemKind::Statement),
                |d| script_declaration(d, bytes),
            );
        }
        "function_declaration" | "generator_function_declaration" | "function_signature" => {
            ItemKind::Function
        }
        "class_declaration" | "abstract_class_declaration" => ItemKind::Class,
        "interface_declaration" => ItemKind::Interface,
        "type_alias_declaration" => ItemKind::TypeAlias,
        "enum_declaration" => ItemKind::Enum,
        "module" | "internal_module" => ItemKind::Module,
        _ => return ItemMeta::new(ItemKind::Statement),
    };
    let mut meta = ItemMeta::new(kind);
    meta.type_only = matches!(kind, ItemKind::Interface | ItemKind::TypeAlias);
    if let Some(name) = node.child_by_field_name("name") {
        if name.kind() == "string" {
            // `declare module "x"` augments another module.
            meta.pinned = true;
        } else {
            meta.names.push(text(name, bytes).to_string());
        }
    }
    meta
}

fn script_import(node: Node, bytes: &[u8]) -> ItemMeta {
    let mut meta = ItemMeta::new(ItemKind::Import);
    push_string_specifier(node.child_by_field_name("source"), bytes, &mut meta);
    let mut cursor = node.walk();
    let children: Vec<Node> = node.named_children(&mut cursor).collect();
    let mut bound = false;
    for child in children {
        match child.kind() {
            "import_clause" => {
                bound = true;
                script_import_clause(child, bytes, &mut meta.names);
            }
            "import_require_clause" => {
                bound = true;
                if let Some(id) = child.named_child(0) {
                    meta.names.push(text(id, bytes).to_string());
                }
                let mut c = child.walk();
                let source = child.named_children(&mut c).find(|n| n.kind() == "string");
                push_string_specifier(source, bytes, &mut meta);
            }
            _ => {}
        }
    }
    meta.side_effect = !bound;
    meta
}

fn script_import_clause(clause: Node, bytes: &[u8], names: &mut Vec<String>) {
    let mut cursor = clause.walk();
    let children: Vec<Node> = clause.named_children(&mut cursor).collect();
    for child in children {
        match child.kind() {
            "identifier" => names.push(text(child, bytes).to_string()),
            "namespace_import" => {
                if let Some(id) = child.named_child(0) {
                    names.push(text(id, bytes).to_string());
                }
            }
            "named_imports" => {
                let mut c = child.walk();
                for spec in child.named_children(&mut c) {
                    if spec.kind() != "import_specifier" {
                        continue;
                    }
                    let local = spec
                        .child_by_field_name("alias")
                        .or_else(|| spec.child_by_field_name("name"));
                    if let Some(local) = local {
                        names.push(text(local, bytes).to_string());
                    }
                }
            }
            _ => {}
        }
    }
}

fn script_export(node: Node, bytes: &[u8]) -> ItemMeta {
    if let Some(source) = node.child_by_field_name("source") {
        let mut meta = ItemMeta::pinned(ItemKind::ReExport);
        meta.exported = true;
        push_string_specifier(Some(source), bytes, &mut meta);
        if let Some(clause) = first_named_of_kind(node, "export_clause") {
            let mut cursor = clause.walk();
            for spec in clause.named_children(&mut cursor) {
                meta.default_export |= exported_name(spec, bytes) == "default";
            }
        }
        return meta;
    }
    let is_default = has_child_kind(node, "default");
    if let Some(decl) = node.child_by_field_name("declaration") {
        let mut meta = script_declaration(decl, bytes);
        meta.exported = true;
        meta.default_export = is_default;
        meta.widen.clear();
        return meta;
    }
    if let Some(clause) = first_named_of_kind(node, "export_clause") {
        let mut meta = ItemMeta::pinned(ItemKind::ExportList);
        meta.exported = true;
        let mut cursor = clause.walk();
        for spec in clause.named_children(&mut cursor) {
            let alias = field_text(spec, "alias", bytes);
            let name = field_text(spec, "name", bytes);
            meta.default_export |= alias.as_deref() == Some("default");
            meta.names.extend(alias.or(name));
        }
        return meta;
    }
    if node.child_by_field_name("value").is_some() {
        let mut meta = ItemMeta::new(ItemKind::Statement);
        meta.exported = true;
        meta.default_export = is_default;
        return meta;
    }
    ItemMeta::pinned(ItemKind::Statement)
}

/// Public name of an export specifier: the last word of `a`, `a as b`.
fn exported_name<'a>(spec: Node, bytes: &'a [u8]) -> &'a str {
    text(spec, bytes).split_whitespace().last().unwrap_or_default()
}

fn first_named_of_kind<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    let found = node.named_children(&mut cursor).find(|c| c.kind() == kind);
    found
}

fn push_string_specifier(node: Option<Node>, bytes: &[u8], meta: &mut ItemMeta) {
    let Some(node) = node else { return };
    let range = node.byte_range();
    if range.len() < 2 {
        return;
    }
    let inner = range.start + 1..range.end - 1;
    if let Some(value) = bytes.get(inner.clone()).and_then(|b| std::str::from_utf8(b).ok()) {
        meta.specifiers.push((value.to_string(), inner));
    }
}

// ---------------------------------------------------------------- shared

/// Names bound by a destructuring or assignment target.
fn collect_pattern_names(node: Node, bytes: &[u8], out: &mut Vec<String>) {
    match node.kind() {
        "identifier" | "shorthand_property_identifier_pattern" => {
            out.push(text(node, bytes).to_string());
        }
        "attribute" | "subscript" | "member_expression" => {}
        _ => {
            let mut cursor = node.walk();
            let children: Vec<Node> = node.named_children(&mut cursor).collect();
            for child in children {
                // Skip default values in `{ a = 1 }` and keys in `{ key: alias }`.
                if matches!(child.kind(), "property_identifier" | "number" | "string") {
                    continue;
                }
                collect_pattern_names(child, bytes, out);
            }
        }
    }
}
