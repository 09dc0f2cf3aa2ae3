// tests/common/mod.rs - shared fixtures
#![allow(dead_code)]

use reforge_core::config::Config;
use reforge_core::utils::sha256_bytes;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

pub const TOTAL: &str = "export function total(items: number[]): number {\n  let sum = 0;\n  for (const item of items) {\n    sum += item;\n  }\n  return sum;\n}\n";

/// 250 lines: 25 ten-line functions.
pub fn long_module() -> String {
    let mut out = String::new();
    for n in 0..25 {
        out.push_str(&format!(
            "export function step{n}(input: number): number {{\n  const a = input + {n};\n  const b = a * 2;\n  const c = b - {n};\n  const d = c + a;\n  const e = d * b;\n  const f = e - c;\n  return f;\n}}\n\n"
        ));
    }
    out
}

pub fn write(root: &Path, rel: &str, content: &str) -> anyhow::Result<()> {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}

/// `src/A.ts` and `src/shared/B.ts` are identical, `src/C.ts` is oversized,
/// `src/app.ts` imports the duplicate.
pub fn scenario_tree(root: &Path) -> anyhow::Result<()> {
    write(root, "src/A.ts", TOTAL)?;
    write(root, "src/shared/B.ts", TOTAL)?;
    write(root, "src/C.ts", &long_module())?;
    write(
        root,
        "src/app.ts",
        "import { total } from './shared/B';\n\nconsole.log(total([1, 2, 3]));\n",
    )?;
    Ok(())
}

pub fn config(root: &Path) -> anyhow::Result<Config> {
    let mut c = Config::defaults_for(root)?;
    c.thresholds.size = 150;
    c.validate = false;
    Ok(c)
}

/// Content hash of every file outside `.reforge`, keyed by relative path.
pub fn tree_hashes(root: &Path) -> anyhow::Result<BTreeMap<String, String>> {
    let mut out = BTreeMap::new();
    let walker = WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| e.file_name() != ".reforge");
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(root)?
            .to_string_lossy()
            .replace('\\', "/");
        out.insert(rel, sha256_bytes(&fs::read(entry.path())?));
    }
    Ok(out)
}
