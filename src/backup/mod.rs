// src/backup/mod.rs
//! Whole-tree snapshots taken before mutation, and byte-identical restore.
//!
//! Layout under `.reforge/backups/`:
//! `<id>/manifest.json` plus `<id>/tree/<relative path>` per file. A snapshot
//! is built in `<id>.partial` and renamed once complete, so a directory
//! without the suffix is always whole.

pub mod restore;
pub mod snapshot;

use crate::constants::{is_ignored_file, should_prune, STATE_DIR};
use crate::error::{ReforgeError, Result};
use crate::model::BackupSnapshot;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

pub const BACKUP_DIR: &str = "backups";
pub const MANIFEST_FILE: &str = "manifest.json";
pub const TREE_DIR: &str = "tree";
const PARTIAL_SUFFIX: &str = ".partial";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Root-relative, forward slashes.
    pub path: String,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub id: String,
    pub created_at: String,
    pub files: Vec<ManifestEntry>,
    /// Every directory present at snapshot time, including empty ones.
    pub dirs: Vec<String>,
}

/// Snapshot storage for one working tree.
#[derive(Debug, Clone)]
pub struct BackupStore {
    root: PathBuf,
    dir: PathBuf,
}

impl BackupStore {
    #[must_use]
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            dir: root.join(STATE_DIR).join(BACKUP_DIR),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn snapshot_dir(&self, id: &str) -> PathBuf {
        self.dir.join(id)
    }

    fn partial_dir(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}{PARTIAL_SUFFIX}"))
    }

    /// `base`, or `base-2`, `base-3`, .. if a snapshot already uses it.
    #[must_use]
    pub fn unique_id(&self, base: &str) -> String {
        let taken = |id: &str| self.snapshot_dir(id).exists() || self.partial_dir(id).exists();
        if !taken(base) {
            return base.to_string();
        }
        (2..)
            .map(|n| format!("{base}-{n}"))
            .find(|id| !taken(id))
            .unwrap_or_else(|| base.to_string())
    }

    fn read_manifest(&self, id: &str) -> Result<Manifest> {
        let path = self.snapshot_dir(id).join(MANIFEST_FILE);
        let raw = fs::read_to_string(&path).map_err(|e| ReforgeError::io(e, &path))?;
        serde_json::from_str(&raw)
            .map_err(|e| ReforgeError::Rollback(format!("corrupt manifest {}: {e}", path.display())))
    }

    /// Complete snapshots, oldest first.
    ///
    /// # Errors
    /// Returns error if the backup directory exists but cannot be read.
    pub fn list(&self) -> Result<Vec<BackupSnapshot>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&self.dir).map_err(|e| ReforgeError::io(e, &self.dir))?;
        let mut out: Vec<BackupSnapshot> = Vec::new();
        for entry in entries.filter_map(std::result::Result::ok) {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.ends_with(PARTIAL_SUFFIX) || !entry.path().is_dir() {
                continue;
            }
            match self.read_manifest(&name) {
                Ok(m) => out.push(BackupSnapshot {
                    root: self.snapshot_dir(&m.id).join(TREE_DIR),
                    file_count: m.files.len(),
                    created_at: m.created_at,
                    id: m.id,
                }),
                Err(e) => tracing::warn!(snapshot = %name, error = %e, "skipping unreadable snapshot"),
            }
        }
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(out)
    }

    /// Most recent complete snapshot.
    ///
    /// # Errors
    /// Returns error if the backup directory cannot be read.
    pub fn latest(&self) -> Result<Option<BackupSnapshot>> {
        Ok(self.list()?.pop())
    }

    /// Deletes all but the newest `retention` snapshots. Returns how many went.
    ///
    /// # Errors
    /// Returns error if the backup directory cannot be read.
    pub fn prune(&self, retention: usize) -> Result<usize> {
        let all = self.list()?;
        let excess = all.len().saturating_sub(retention);
        let mut removed = 0;
        for snap in all.into_iter().take(excess) {
            match fs::remove_dir_all(self.snapshot_dir(&snap.id)) {
                Ok(()) => removed += 1,
                Err(e) => tracing::warn!(snapshot = %snap.id, error = %e, "could not prune snapshot"),
            }
        }
        if removed > 0 {
            tracing::info!(removed, retention, "pruned old snapshots");
        }
        Ok(removed)
    }

    /// Removes `.partial` leftovers of interrupted snapshots.
    pub fn cleanup_partials(&self) {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return;
        };
        for entry in entries.flatten() {
            if entry.file_name().to_string_lossy().ends_with(PARTIAL_SUFFIX) {
                tracing::debug!(path = %entry.path().display(), "removing stale partial snapshot");
                let _ = fs::remove_dir_all(entry.path());
            }
        }
    }
}

fn keep(entry: &DirEntry) -> bool {
    if entry.depth() == 0 {
        return true;
    }
    let name = entry.file_name().to_string_lossy();
    if entry.file_type().is_dir() {
        !should_prune(&name)
    } else {
        !is_ignored_file(&name)
    }
}

/// Files and directories a snapshot covers: everything under `root` except
/// pruned directories, ignored files and symlinks. Sorted.
pub(crate) fn tree_entries(root: &Path) -> impl Iterator<Item = DirEntry> {
    WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(keep)
        .filter_map(|e| match e {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::warn!(error = %err, "skipping unreadable entry");
                None
            }
        })
        .filter(|e| e.depth() > 0 && !e.file_type().is_symlink())
}

pub(crate) fn relative(root: &Path, path: &Path) -> String {
    crate::utils::normalize_path(path.strip_prefix(root).unwrap_or(path))
}

/// Copies `src` over `dest` through a temp sibling so a reader never sees a
/// half-written file.
pub(crate) fn copy_atomic(src: &Path, dest: &Path) -> std::io::Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let tmp = dest.with_file_name(format!(".{name}.reforge-restore-{}", std::process::id()));
    if let Err(e) = fs::copy(src, &tmp).and_then(|_| fs::rename(&tmp, dest)) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(())
}
