// src/discovery.rs
use crate::config::{Config, PathFilter};
use crate::constants::{is_ignored_file, should_prune, BIN_EXT_PATTERN};
use crate::utils::normalize_path;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use walkdir::{DirEntry, WalkDir};

static BIN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(BIN_EXT_PATTERN).unwrap_or_else(|_| panic!("Invalid Regex")));

/// Walks the configured roots. Every call to [`Scanner::iter`] starts a fresh
/// walk, so the sequence can be consumed more than once.
#[derive(Debug, Clone)]
pub struct Scanner {
    root: PathBuf,
    roots: Vec<PathBuf>,
    filter: PathFilter,
}

/// Files found plus the number of entries skipped because of walk errors.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub files: Vec<PathBuf>,
    pub errors: usize,
}

impl Scanner {
    #[must_use]
    pub fn new(root: &Path, roots: &[PathBuf], filter: PathFilter) -> Self {
        Self {
            root: root.to_path_buf(),
            roots: outermost(roots),
            filter,
        }
    }

    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.root, &config.scan_roots, config.filter.clone())
    }

    /// Lazy, sorted sequence of absolute candidate paths. Unreadable entries
    /// are logged and skipped.
    pub fn iter(&self) -> impl Iterator<Item = PathBuf> + '_ {
        self.roots.iter().flat_map(move |r| {
            self.walker(r).filter_map(move |item| match item {
                Ok(entry) => self.accept(&entry),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable entry");
                    None
                }
            })
        })
    }

    /// Eager walk that also counts skipped entries.
    #[must_use]
    pub fn scan(&self) -> ScanOutcome {
        let mut outcome = ScanOutcome::default();
        for r in &self.roots {
            let (paths, errors) = self.accumulate_walker(self.walker(r));
            outcome.files.extend(paths);
            outcome.errors += errors;
        }
        if outcome.errors > 0 {
            tracing::warn!(errors = outcome.errors, "encountered errors during file walk");
        }
        outcome
    }

    fn walker<'a>(
        &'a self,
        scan_root: &Path,
    ) -> impl Iterator<Item = walkdir::Result<DirEntry>> + 'a {
        WalkDir::new(scan_root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |e| !self.is_pruned(e))
    }

    fn accumulate_walker<I>(&self, walker: I) -> (Vec<PathBuf>, usize)
    where
        I: Iterator<Item = walkdir::Result<DirEntry>>,
    {
        let mut paths = Vec::new();
        let mut errors = 0;
        for item in walker {
            match item {
                Ok(entry) => {
                    if let Some(p) = self.accept(&entry) {
                        paths.push(p);
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable entry");
                    errors += 1;
                }
            }
        }
        (paths, errors)
    }

    fn is_pruned(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return false;
        }
        let name = entry.file_name().to_string_lossy();
        if should_prune(&name) {
            return true;
        }
        self.relative(entry.path())
            .is_some_and(|rel| self.filter.rejects_dir(&rel))
    }

    fn accept(&self, entry: &DirEntry) -> Option<PathBuf> {
        if !entry.file_type().is_file() {
            return None;
        }
        let name = entry.file_name().to_string_lossy();
        if is_ignored_file(&name) || BIN_RE.is_match(&name) {
            return None;
        }
        let rel = self.relative(entry.path())?;
        if !self.filter.accepts_file(&rel) {
            return None;
        }
        Some(entry.path().to_path_buf())
    }

    fn relative(&self, path: &Path) -> Option<String> {
        path.strip_prefix(&self.root).ok().map(normalize_path)
    }
}

/// Drops roots nested inside another root so no file is yielded twice.
fn outermost(roots: &[PathBuf]) -> Vec<PathBuf> {
    let mut sorted: Vec<PathBuf> = roots.to_vec();
    sorted.sort();
    sorted.dedup();
    let mut kept: Vec<PathBuf> = Vec::new();
    for r in sorted {
        if !kept.iter().any(|k| r.starts_with(k)) {
            kept.push(r);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) -> std::io::Result<()> {
        let p = root.join(rel);
        if let Some(parent) = p.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(p, "x\n")
    }

    fn rels(root: &Path, files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .filter_map(|f| f.strip_prefix(root).ok().map(normalize_path))
            .collect()
    }

    #[test]
    fn prunes_caches_and_skips_binaries() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let root = dir.path();
        touch(root, "src/a.ts")?;
        touch(root, "node_modules/pkg/index.js")?;
        touch(root, ".git/HEAD")?;
        touch(root, "logo.png")?;
        touch(root, ".reforge/backups/x/a.ts")?;

        let scanner = Scanner::new(root, &[root.to_path_buf()], PathFilter::default());
        let found = rels(root, &scanner.scan().files);
        assert_eq!(found, vec!["src/a.ts"]);
        Ok(())
    }

    #[test]
    fn iteration_is_restartable_and_sorted() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let root = dir.path();
        touch(root, "b.py")?;
        touch(root, "a.py")?;
        touch(root, "sub/c.rs")?;

        let scanner = Scanner::new(root, &[root.to_path_buf()], PathFilter::default());
        let first: Vec<_> = scanner.iter().collect();
        let second: Vec<_> = scanner.iter().collect();
        assert_eq!(first, second);
        assert_eq!(rels(root, &first), vec!["a.py", "b.py", "sub/c.rs"]);
        Ok(())
    }

    #[test]
    fn user_globs_apply() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let root = dir.path();
        touch(root, "src/keep.ts")?;
        touch(root, "src/gen/skip.ts")?;
        touch(root, "docs/readme.md")?;

        let filter = PathFilter::new(&["src/**".to_string()], &["src/gen/**".to_string()])?;
        let scanner = Scanner::new(root, &[root.to_path_buf()], filter);
        assert_eq!(rels(root, &scanner.scan().files), vec!["src/keep.ts"]);
        Ok(())
    }

    #[test]
    fn nested_roots_do_not_duplicate() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let root = dir.path();
        touch(root, "src/a.ts")?;
        let scanner = Scanner::new(
            root,
            &[root.join("src"), root.to_path_buf()],
            PathFilter::default(),
        );
        assert_eq!(scanner.iter().count(), 1);
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn symlink_cycles_are_not_followed() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let root = dir.path();
        touch(root, "src/a.ts")?;
        std::os::unix::fs::symlink(root, root.join("src/loop"))?;
        let scanner = Scanner::new(root, &[root.to_path_buf()], PathFilter::default());
        assert_eq!(rels(root, &scanner.scan().files), vec!["src/a.ts"]);
        Ok(())
    }
}
