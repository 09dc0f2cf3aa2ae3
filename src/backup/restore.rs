// src/backup/restore.rs
use super::{copy_atomic, relative, tree_entries, BackupStore, TREE_DIR};
use crate::error::{ReforgeError, Result};
use crate::utils::sha256_bytes;
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreSummary {
    pub restored: usize,
    pub deleted: usize,
    pub dirs_removed: usize,
}

impl BackupStore {
    /// Puts the working tree back exactly as snapshot `id` recorded it.
    ///
    /// # Errors
    /// `ReforgeError::Rollback` if the snapshot is missing or damaged, or a
    /// file cannot be restored.
    pub fn restore(&self, id: &str) -> Result<RestoreSummary> {
        let manifest = self.read_manifest(id)?;
        let tree = self.snapshot_dir(id).join(TREE_DIR);
        let root = self.root().to_path_buf();
        let expected: HashMap<&str, &str> = manifest
            .files
            .iter()
            .map(|f| (f.path.as_str(), f.sha256.as_str()))
            .collect();
        let kept_dirs: BTreeSet<&str> = manifest.dirs.iter().map(String::as_str).collect();
        let mut summary = RestoreSummary::default();

        let mut present_dirs: Vec<PathBuf> = Vec::new();
        for entry in tree_entries(&root) {
            let rel = relative(&root, entry.path());
            if entry.file_type().is_dir() {
                if !kept_dirs.contains(rel.as_str()) {
                    present_dirs.push(entry.path().to_path_buf());
                }
                continue;
            }
            if !expected.contains_key(rel.as_str()) {
                fs::remove_file(entry.path()).map_err(|e| rollback_err(&rel, &e))?;
                summary.deleted += 1;
            }
        }

        for dir in &manifest.dirs {
            fs::create_dir_all(root.join(dir)).map_err(|e| rollback_err(dir, &e))?;
        }
        for file in &manifest.files {
            let target = root.join(&file.path);
            let current = fs::read(&target).ok().map(|b| sha256_bytes(&b));
            if current.as_deref() == Some(file.sha256.as_str()) {
                continue;
            }
            let source = tree.join(&file.path);
            let saved = fs::read(&source).map_err(|e| rollback_err(&file.path, &e))?;
            if sha256_bytes(&saved) != file.sha256 {
                return Err(ReforgeError::Rollback(format!(
                    "snapshot copy of {} does not match its manifest hash",
                    file.path
                )));
            }
            copy_atomic(&source, &target).map_err(|e| rollback_err(&file.path, &e))?;
            summary.restored += 1;
        }

        // Deepest first so parents empty out after their children.
        present_dirs.sort_by(|a, b| b.components().count().cmp(&a.components().count()));
        for dir in present_dirs {
            if fs::remove_dir(&dir).is_ok() {
                summary.dirs_removed += 1;
            }
        }

        tracing::info!(
            id,
            restored = summary.restored,
            deleted = summary.deleted,
            dirs_removed = summary.dirs_removed,
            "rollback complete"
        );
        Ok(summary)
    }
}

fn rollback_err(path: &str, e: &std::io::Error) -> ReforgeError {
    ReforgeError::Rollback(format!("{path}: {e}"))
}
