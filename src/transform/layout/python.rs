// src/transform/layout/python.rs
//! Python: parts are sibling modules `<stem>_<part>.py`; the aggregator
//! imports every name they declare so `from big import x` keeps working.

use super::Layout;
use crate::model::FileOutput;
use crate::transform::split::{blocks, join_items, Split};

const MAX_LINE: usize = 88;

fn module_ref(layout: &Layout, module: &str) -> String {
    if layout.package {
        format!(".{module}")
    } else {
        module.to_string()
    }
}

fn from_import<S: AsRef<str>>(layout: &Layout, module: &str, names: &[S]) -> String {
    let source = module_ref(layout, module);
    if names.is_empty() {
        return if layout.package {
            format!("from . import {module}")
        } else {
            format!("import {module}")
        };
    }
    let names: Vec<&str> = names.iter().map(AsRef::as_ref).collect();
    let line = format!("from {source} import {}", names.join(", "));
    if line.len() <= MAX_LINE {
        return line;
    }
    let body: String = names.iter().map(|n| format!("    {n},\n")).collect();
    format!("from {source} import (\n{body})")
}

/// Renders parts then the aggregator.
#[must_use]
pub fn render(layout: &Layout, split: &Split) -> Vec<FileOutput> {
    let modules: Vec<String> = split.parts.iter().map(|p| layout.module_name(&p.name)).collect();
    let mut outputs = Vec::with_capacity(split.parts.len() + 1);

    for part in &split.parts {
        let preamble: Vec<&str> = part.imports.iter().map(|i| i.trimmed()).collect();
        let siblings: Vec<String> = part
            .siblings
            .iter()
            .filter_map(|(q, bindings)| {
                let names: Vec<&str> = bindings.iter().map(|b| b.name.as_str()).collect();
                modules.get(*q).map(|m| from_import(layout, m, &names))
            })
            .collect();
        let body = join_items(&part.items, &part.widen, None);
        outputs.push(FileOutput {
            path: layout.part_path(&part.name),
            content: blocks(&[preamble.join("\n"), siblings.join("\n"), body]),
        });
    }

    let agg = &split.aggregator;
    let headers: Vec<&str> = agg.headers.iter().map(|h| h.trimmed()).collect();
    let kept: Vec<&str> = agg.imports.iter().map(|i| i.trimmed()).collect();
    let reexports: Vec<String> = modules
        .iter()
        .zip(&agg.declared)
        .map(|(m, names)| from_import(layout, m, names))
        .collect();

    outputs.push(FileOutput {
        path: layout.source.clone(),
        content: blocks(&[
            headers.join("\n"),
            kept.join("\n"),
            reexports.join("\n"),
            join_items(&agg.pinned, &[], None),
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
    use std::path::{Path, PathBuf};

    const SRC: &str = "\"\"\"Orders.\"\"\"\nfrom __future__ import annotations\nimport json\n\n\ndef _encode(order):\n    return json.dumps(order)\n\n\ndef save(order):\n    return _encode(order)\n\n\nif __name__ == \"__main__\":\n    save({})\n";

    #[test]
    fn renders_sibling_modules() -> anyhow::Result<()> {
        let tree = SymbolTree::parse(Lang::Python, SRC)?;
        // 0 docstring, 1 future, 2 import json, 3 _encode, 4 save, 5 main guard
        let layout = Layout::new(Lang::Python, Path::new("/r/shop/orders.py")).in_package(true);
        let parts = vec![
            PartSpec { name: "part_1".into(), items: vec![3] },
            PartSpec { name: "part_2".into(), items: vec![4] },
        ];
        let split = Split::build(&tree, &parts, false);
        let out = render(&layout, &split);

        assert_eq!(out[0].path, PathBuf::from("/r/shop/orders_part_1.py"));
        assert_eq!(
            out[0].content,
            "from __future__ import annotations\nimport json\n\ndef _encode(order):\n    return json.dumps(order)\n"
        );
        assert_eq!(
            out[1].content,
            "from __future__ import annotations\n\nfrom .orders_part_1 import _encode\n\ndef save(order):\n    return _encode(order)\n"
        );
        assert_eq!(
            out[2].content,
            "\"\"\"Orders.\"\"\"\n\nfrom __future__ import annotations\n\nfrom .orders_part_1 import _encode\nfrom .orders_part_2 import save\n\nif __name__ == \"__main__\":\n    save({})\n"
        );
        Ok(())
    }

    #[test]
    fn long_import_lists_wrap() {
        let layout = Layout::new(Lang::Python, Path::new("/r/orders.py"));
        let names: Vec<String> = (0..12).map(|i| format!("function_number_{i}")).collect();
        let line = from_import(&layout, "orders_part_1", &names);
        assert!(line.starts_with("from orders_part_1 import (\n    function_number_0,\n"));
        assert!(line.ends_with("    function_number_11,\n)"));
        assert_eq!(from_import::<&str>(&layout, "orders_part_2", &[]), "import orders_part_2");
    }
}
