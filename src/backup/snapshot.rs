// src/backup/snapshot.rs
use super::{relative, tree_entries, BackupStore, Manifest, ManifestEntry, MANIFEST_FILE, TREE_DIR};
use crate::error::{ReforgeError, Result};
use crate::model::BackupSnapshot;
use crate::utils::sha256_bytes;
use std::fs;
use std::path::Path;

impl BackupStore {
    /// Copies the working tree into a new snapshot `id`. On failure the
    /// partial directory is removed and nothing else changes.
    ///
    /// # Errors
    /// `ReforgeError::Snapshot` describing the first failure.
    pub fn create(&self, id: &str) -> Result<BackupSnapshot> {
        self.cleanup_partials();
        let partial = self.partial_dir(id);
        let final_dir = self.snapshot_dir(id);
        if final_dir.exists() {
            return Err(ReforgeError::Snapshot(format!("snapshot {id} already exists")));
        }

        match self.fill(id, &partial) {
            Ok(manifest) => {
                fs::rename(&partial, &final_dir).map_err(|e| {
                    let _ = fs::remove_dir_all(&partial);
                    ReforgeError::Snapshot(format!("cannot finalise {}: {e}", final_dir.display()))
                })?;
                tracing::info!(id, files = manifest.files.len(), "snapshot created");
                Ok(BackupSnapshot {
                    id: manifest.id,
                    root: final_dir.join(TREE_DIR),
                    file_count: manifest.files.len(),
                    created_at: manifest.created_at,
                })
            }
            Err(e) => {
                let _ = fs::remove_dir_all(&partial);
                Err(e)
            }
        }
    }

    fn fill(&self, id: &str, partial: &Path) -> Result<Manifest> {
        let tree = partial.join(TREE_DIR);
        fs::create_dir_all(&tree).map_err(|e| snapshot_err(partial, &e))?;

        let mut files = Vec::new();
        let mut dirs = Vec::new();
        for entry in tree_entries(self.root()) {
            let rel = relative(self.root(), entry.path());
            if entry.file_type().is_dir() {
                fs::create_dir_all(tree.join(&rel)).map_err(|e| snapshot_err(entry.path(), &e))?;
                dirs.push(rel);
                continue;
            }
            let bytes = fs::read(entry.path()).map_err(|e| snapshot_err(entry.path(), &e))?;
            let dest = tree.join(&rel);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent).map_err(|e| snapshot_err(parent, &e))?;
            }
            fs::copy(entry.path(), &dest).map_err(|e| snapshot_err(entry.path(), &e))?;
            files.push(ManifestEntry {
                path: rel,
                sha256: sha256_bytes(&bytes),
            });
        }

        let manifest = Manifest {
            id: id.to_string(),
            created_at: chrono::Local::now().to_rfc3339(),
            files,
            dirs,
        };
        let json = serde_json::to_string_pretty(&manifest)?;
        fs::write(partial.join(MANIFEST_FILE), json).map_err(|e| snapshot_err(partial, &e))?;
        Ok(manifest)
    }
}

fn snapshot_err(path: &Path, e: &std::io::Error) -> ReforgeError {
    ReforgeError::Snapshot(format!("{}: {e}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::super::BACKUP_DIR;
    use super::*;
    use crate::constants::STATE_DIR;
    use tempfile::TempDir;

    #[test]
    fn copies_tree_and_skips_pruned_dirs() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let root = dir.path();
        fs::create_dir_all(root.join("src/empty"))?;
        fs::create_dir_all(root.join("node_modules/x"))?;
        fs::write(root.join("src/a.ts"), "a")?;
        fs::write(root.join("node_modules/x/i.js"), "dep")?;
        fs::write(root.join(".DS_Store"), "junk")?;

        let store = BackupStore::new(root);
        let snap = store.create("run-1")?;
        assert_eq!(snap.file_count, 1);
        assert_eq!(fs::read_to_string(snap.root.join("src/a.ts"))?, "a");
        assert!(!snap.root.join("node_modules").exists());
        assert!(snap.root.join("src/empty").is_dir());
        assert!(!root.join(STATE_DIR).join(BACKUP_DIR).join("run-1.partial").exists());
        Ok(())
    }

    #[test]
    fn second_snapshot_does_not_copy_the_first() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        fs::write(dir.path().join("a.py"), "x = 1\n")?;
        let store = BackupStore::new(dir.path());
        store.create("one")?;
        let two = store.create("two")?;
        assert_eq!(two.file_count, 1);
        assert!(store.create("two").is_err());
        Ok(())
    }

    #[test]
    fn unique_ids_get_a_suffix() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let store = BackupStore::new(dir.path());
        assert_eq!(store.unique_id("r"), "r");
        store.create("r")?;
        assert_eq!(store.unique_id("r"), "r-2");
        Ok(())
    }
}
