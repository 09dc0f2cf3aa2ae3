// src/transform/layout/mod.rs
//! Where the parts of a split file live and how each language names them.

pub mod python;
pub mod rust;
pub mod script;

use crate::lang::{Lang, LangFamily};
use std::path::{Path, PathBuf};

/// Directories whose `.rs` files are crate roots rather than modules.
const RUST_ROOT_DIRS: &[&str] = &["bin", "tests", "examples", "benches"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub lang: Lang,
    pub source: PathBuf,
    /// Directory receiving the parts.
    pub dir: PathBuf,
    pub stem: String,
    pub ext: String,
    /// Rust: part modules need an explicit `#[path]`.
    pub path_attr: bool,
    /// Python: the source directory is a package (`__init__.py`).
    pub package: bool,
}

impl Layout {
    #[must_use]
    pub fn new(lang: Lang, source: &Path) -> Self {
        let parent = source.parent().map_or_else(PathBuf::new, Path::to_path_buf);
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let ext = source
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_default();

        let (dir, path_attr) = match lang.family() {
            LangFamily::Script => (parent.join(&stem), false),
            LangFamily::Python => (parent.clone(), false),
            LangFamily::Rust => {
                if matches!(stem.as_str(), "lib" | "main" | "mod") {
                    (parent.clone(), false)
                } else {
                    let root_like = stem == "build"
                        || parent
                            .file_name()
                            .is_some_and(|n| RUST_ROOT_DIRS.contains(&n.to_string_lossy().as_ref()));
                    (parent.join(&stem), root_like)
                }
            }
        };

        Self {
            lang,
            source: source.to_path_buf(),
            dir,
            stem,
            ext,
            path_attr,
            package: false,
        }
    }

    #[must_use]
    pub fn in_package(mut self, package: bool) -> Self {
        self.package = package;
        self
    }

    /// Module name a part is imported by.
    #[must_use]
    pub fn module_name(&self, part: &str) -> String {
        match self.lang.family() {
            LangFamily::Script => part.to_string(),
            LangFamily::Rust => part.replace('-', "_"),
            LangFamily::Python => {
                let base = if self.stem == "__init__" {
                    self.dir
                        .file_name()
                        .map_or_else(|| "package".to_string(), |n| n.to_string_lossy().to_string())
                } else {
                    self.stem.clone()
                };
                format!("{base}_{part}").replace('-', "_")
            }
        }
    }

    #[must_use]
    pub fn part_path(&self, part: &str) -> PathBuf {
        let module = self.module_name(part);
        match self.lang.family() {
            LangFamily::Script => self.dir.join(format!("{module}.{}", self.ext)),
            LangFamily::Rust => self.dir.join(format!("{module}.rs")),
            LangFamily::Python => self.dir.join(format!("{module}.py")),
        }
    }

    /// Every file a split into `parts` writes, aggregator last.
    #[must_use]
    pub fn planned_outputs(&self, parts: &[String]) -> Vec<PathBuf> {
        let mut out: Vec<PathBuf> = parts.iter().map(|p| self.part_path(p)).collect();
        out.push(self.source.clone());
        out
    }
}

/// Part names for a chunked split: `part_1` .. `part_n`.
#[must_use]
pub fn chunk_names(n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("part_{i}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_parts_go_under_the_stem() {
        let l = Layout::new(Lang::TypeScript, Path::new("/r/src/big.ts"));
        assert_eq!(l.part_path("use-cases"), PathBuf::from("/r/src/big/use-cases.ts"));
        assert_eq!(l.planned_outputs(&chunk_names(2)).last(), Some(&PathBuf::from("/r/src/big.ts")));
    }

    #[test]
    fn rust_module_roots_keep_their_directory() {
        let lib = Layout::new(Lang::Rust, Path::new("/r/src/lib.rs"));
        assert_eq!(lib.part_path("part_1"), PathBuf::from("/r/src/part_1.rs"));
        let m = Layout::new(Lang::Rust, Path::new("/r/src/net/codec.rs"));
        assert_eq!(m.part_path("use-cases"), PathBuf::from("/r/src/net/codec/use_cases.rs"));
        assert!(!m.path_attr);
        let bin = Layout::new(Lang::Rust, Path::new("/r/src/bin/tool.rs"));
        assert!(bin.path_attr);
        assert_eq!(bin.part_path("part_1"), PathBuf::from("/r/src/bin/tool/part_1.rs"));
    }

    #[test]
    fn python_parts_are_siblings() {
        let l = Layout::new(Lang::Python, Path::new("/r/pkg/orders.py"));
        assert_eq!(l.part_path("use-cases"), PathBuf::from("/r/pkg/orders_use_cases.py"));
        let init = Layout::new(Lang::Python, Path::new("/r/pkg/__init__.py"));
        assert_eq!(init.module_name("part_1"), "pkg_part_1");
    }
}
