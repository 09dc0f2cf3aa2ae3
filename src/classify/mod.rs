// src/classify/mod.rs
pub mod metrics;
pub mod roles;

use crate::config::Thresholds;
use crate::lang::Lang;
use crate::model::FileRecord;
use crate::syntax::SymbolTree;
use crate::utils::{compute_sha256, line_count, normalize_path};
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

const BINARY_SNIFF_BYTES: usize = 8192;

/// True if the file exceeds either threshold.
#[must_use]
pub fn is_oversized(record: &FileRecord, thresholds: &Thresholds) -> bool {
    !record.is_unknown()
        && (record.line_count > thresholds.size || record.complexity > thresholds.complexity)
}

/// Reads and classifies one file. Never fails: unreadable or binary-looking
/// files come back with role `unknown`.
#[must_use]
pub fn classify_file(path: &Path, root: &Path, thresholds: &Thresholds) -> FileRecord {
    let relative = path
        .strip_prefix(root)
        .map_or_else(|_| normalize_path(path), normalize_path);
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "unreadable file");
            return FileRecord::unknown(path.to_path_buf(), relative);
        }
    };
    let sniff = &bytes[..bytes.len().min(BINARY_SNIFF_BYTES)];
    if sniff.contains(&0) {
        tracing::debug!(path = %path.display(), "binary content");
        return FileRecord::unknown(path.to_path_buf(), relative);
    }
    let Ok(content) = String::from_utf8(bytes) else {
        tracing::debug!(path = %path.display(), "not valid UTF-8");
        return FileRecord::unknown(path.to_path_buf(), relative);
    };
    classify_text(path.to_path_buf(), relative, &content, thresholds)
}

/// Classifies already-loaded text.
#[must_use]
pub fn classify_text(
    path: PathBuf,
    relative: String,
    content: &str,
    thresholds: &Thresholds,
) -> FileRecord {
    let lang = Lang::from_path(&path);
    let subject = roles::Subject::new(Path::new(&relative), content);
    let role = roles::classify_role(&subject);
    let references = lang
        .and_then(|l| SymbolTree::parse(l, content).ok())
        .map(|tree| tree.specifiers().into_iter().collect())
        .unwrap_or_else(BTreeSet::new);

    let mut record = FileRecord {
        lang,
        line_count: line_count(content),
        complexity: metrics::complexity(content, lang),
        role,
        references,
        duplicate_group: None,
        needs_transform: false,
        content_hash: compute_sha256(content),
        relative,
        path,
    };
    record.needs_transform = is_oversized(&record, thresholds);
    tracing::debug!(
        file = %record.relative,
        lines = record.line_count,
        complexity = record.complexity,
        role = %record.role,
        rule = roles::matching_rule(&subject).unwrap_or("-"),
        "classified"
    );
    record
}

/// Classifies every path in parallel. Output order matches input order.
#[must_use]
pub fn classify_all(paths: &[PathBuf], root: &Path, thresholds: &Thresholds) -> Vec<FileRecord> {
    paths
        .par_iter()
        .map(|p| classify_file(p, root, thresholds))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Role;
    use tempfile::TempDir;

    fn thresholds(size: usize, complexity: usize) -> Thresholds {
        Thresholds { size, complexity }
    }

    #[test]
    fn oversized_by_lines_or_complexity() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let long = dir.path().join("long.ts");
        fs::write(&long, "let a = 1;\n".repeat(20))?;
        let branchy = dir.path().join("branchy.ts");
        fs::write(&branchy, "if (a && b || c) {}\n")?;

        let t = thresholds(10, 3);
        let recs = classify_all(&[long, branchy], dir.path(), &t);
        assert!(recs[0].needs_transform);
        assert_eq!(recs[0].line_count, 20);
        assert!(recs[1].needs_transform);
        assert_eq!(recs[1].complexity, 4);
        assert_eq!(recs[0].relative, "long.ts");
        Ok(())
    }

    #[test]
    fn binary_and_missing_files_are_unknown() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let bin = dir.path().join("blob.ts");
        fs::write(&bin, [0u8, 159, 146, 150])?;
        let missing = dir.path().join("gone.ts");

        let t = thresholds(0, 0);
        for rec in classify_all(&[bin, missing], dir.path(), &t) {
            assert_eq!(rec.role, Role::Unknown);
            assert!(!rec.needs_transform);
        }
        Ok(())
    }

    #[test]
    fn references_come_from_the_symbol_tree() {
        let rec = classify_text(
            PathBuf::from("/r/src/a.ts"),
            "src/a.ts".into(),
            "import { b } from './b';\nexport * from './c';\n",
            &thresholds(100, 100),
        );
        let refs: Vec<&str> = rec.references.iter().map(String::as_str).collect();
        assert_eq!(refs, vec!["./b", "./c"]);
        assert!(!rec.needs_transform);
    }

    #[test]
    fn unparseable_source_has_no_references() {
        let rec = classify_text(
            PathBuf::from("/r/a.ts"),
            "a.ts".into(),
            "import { from ;;; {{",
            &thresholds(100, 100),
        );
        assert!(rec.references.is_empty());
        assert_eq!(rec.role, Role::Generic);
    }
}
