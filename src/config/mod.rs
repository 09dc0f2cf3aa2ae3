// src/config/mod.rs
pub mod io;
pub mod types;

pub use self::io::CONFIG_FILE;
pub use self::types::{
    BackupSection, DuplicateSection, ReforgeToml, ReportSection, ScanSection, SchedulerSection,
    Thresholds, ValidationSection,
};

use crate::error::{ReforgeError, Result};
use glob::Pattern;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Compiled include/exclude globs. Patterns without a `/` also match a bare
/// file or directory name anywhere in the tree.
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
    exclude_dirs: Vec<Pattern>,
}

impl PathFilter {
    /// # Errors
    /// Returns `ReforgeError::Pattern` on the first malformed glob.
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self> {
        let include = compile_all(include)?;
        let exclude = compile_all(exclude)?;
        let mut exclude_dirs = Vec::new();
        for p in &exclude {
            if let Some(stem) = p.as_str().strip_suffix("/**") {
                exclude_dirs.push(compile(stem)?);
            }
        }
        exclude_dirs.extend(exclude.iter().cloned());
        Ok(Self {
            include,
            exclude,
            exclude_dirs,
        })
    }

    /// True if a file at `rel` (forward-slash, relative to the root) is in scope.
    #[must_use]
    pub fn accepts_file(&self, rel: &str) -> bool {
        if any_match(&self.exclude, rel) {
            return false;
        }
        self.include.is_empty() || any_match(&self.include, rel)
    }

    /// True if the walker should not descend into directory `rel`.
    #[must_use]
    pub fn rejects_dir(&self, rel: &str) -> bool {
        any_match(&self.exclude_dirs, rel)
    }
}

fn any_match(patterns: &[Pattern], rel: &str) -> bool {
    let name = rel.rsplit('/').next().unwrap_or(rel);
    patterns.iter().any(|p| {
        p.matches(rel) || (!p.as_str().contains('/') && p.matches(name))
    })
}

fn compile(raw: &str) -> Result<Pattern> {
    Pattern::new(raw).map_err(|e| ReforgeError::Pattern {
        pattern: raw.to_string(),
        reason: e.to_string(),
    })
}

fn compile_all(raw: &[String]) -> Result<Vec<Pattern>> {
    raw.iter().map(|s| compile(s)).collect()
}

/// Resolved settings for one run: `reforge.toml` merged with CLI flags.
#[derive(Debug, Clone)]
pub struct Config {
    /// Working-tree root. Snapshots, reports and the journal live under it.
    pub root: PathBuf,
    pub scan_roots: Vec<PathBuf>,
    pub filter: PathFilter,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub thresholds: Thresholds,
    pub scheduler: SchedulerSection,
    pub duplicates: DuplicateSection,
    pub validation: ValidationSection,
    pub backup: BackupSection,
    pub report: ReportSection,
    pub dry_run: bool,
    pub validate: bool,
    pub report_path: Option<PathBuf>,
}

impl Config {
    /// Builds a config from the parsed file.
    ///
    /// # Errors
    /// Returns error if any glob fails to compile.
    pub fn from_toml(root: &Path, toml: ReforgeToml) -> Result<Self> {
        let filter = PathFilter::new(&toml.scan.include, &toml.scan.exclude)?;
        let scan_roots = toml
            .scan
            .roots
            .iter()
            .map(|r| if r == "." { root.to_path_buf() } else { root.join(r) })
            .collect();
        Ok(Self {
            root: root.to_path_buf(),
            scan_roots,
            filter,
            include: toml.scan.include,
            exclude: toml.scan.exclude,
            thresholds: toml.thresholds,
            scheduler: toml.scheduler,
            duplicates: toml.duplicates,
            validation: toml.validation,
            backup: toml.backup,
            report: toml.report,
            dry_run: false,
            validate: true,
            report_path: None,
        })
    }

    /// Loads `reforge.toml` (or `explicit`) relative to `root`.
    ///
    /// # Errors
    /// Returns error if the file is malformed or a glob is invalid.
    pub fn load(root: &Path, explicit: Option<&Path>) -> anyhow::Result<Self> {
        let path = explicit.map_or_else(|| root.join(CONFIG_FILE), Path::to_path_buf);
        let toml = io::load_toml(&path)?;
        Ok(Self::from_toml(root, toml)?)
    }

    /// Defaults only, no file lookup. Used by tests and library callers.
    ///
    /// # Errors
    /// Never fails for the default pattern set; kept fallible for symmetry.
    pub fn defaults_for(root: &Path) -> Result<Self> {
        Self::from_toml(root, ReforgeToml::default())
    }

    /// Adds CLI globs on top of the file's and recompiles the filter.
    ///
    /// # Errors
    /// Returns error if a new glob is malformed.
    pub fn extend_patterns(&mut self, include: &[String], exclude: &[String]) -> Result<()> {
        self.include.extend(include.iter().cloned());
        self.exclude.extend(exclude.iter().cloned());
        self.filter = PathFilter::new(&self.include, &self.exclude)?;
        Ok(())
    }

    #[must_use]
    pub fn jobs(&self) -> usize {
        self.scheduler.jobs.max(1)
    }

    #[must_use]
    pub fn plan_timeout(&self) -> Duration {
        Duration::from_secs(self.scheduler.plan_timeout_secs)
    }

    #[must_use]
    pub fn validation_timeout(&self) -> Duration {
        Duration::from_secs(self.validation.timeout_secs)
    }

    #[must_use]
    pub fn state_dir(&self) -> PathBuf {
        self.root.join(crate::constants::STATE_DIR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn empty_include_accepts_everything_not_excluded() -> Result<()> {
        let f = PathFilter::new(&[], &strings(&["legacy/**", "*.gen.ts"]))?;
        assert!(f.accepts_file("src/a.ts"));
        assert!(!f.accepts_file("legacy/old.ts"));
        assert!(!f.accepts_file("src/api/client.gen.ts"));
        Ok(())
    }

    #[test]
    fn include_narrows_scope() -> Result<()> {
        let f = PathFilter::new(&strings(&["src/**/*.ts"]), &[])?;
        assert!(f.accepts_file("src/deep/x.ts"));
        assert!(!f.accepts_file("scripts/x.ts"));
        Ok(())
    }

    #[test]
    fn excluded_dir_is_pruned() -> Result<()> {
        let f = PathFilter::new(&[], &strings(&["legacy/**", "fixtures"]))?;
        assert!(f.rejects_dir("legacy"));
        assert!(f.rejects_dir("tests/fixtures"));
        assert!(!f.rejects_dir("src"));
        Ok(())
    }

    #[test]
    fn bad_glob_is_reported() {
        let err = PathFilter::new(&strings(&["src/[a"]), &[]);
        assert!(matches!(err, Err(ReforgeError::Pattern { .. })));
    }

    #[test]
    fn cli_patterns_extend_file_patterns() -> Result<()> {
        let mut cfg = Config::defaults_for(Path::new("/tmp/x"))?;
        cfg.extend_patterns(&[], &strings(&["gen/**"]))?;
        assert!(!cfg.filter.accepts_file("gen/a.ts"));
        assert_eq!(cfg.scan_roots, vec![PathBuf::from("/tmp/x")]);
        Ok(())
    }
}
