// src/transform/writer.rs
//! All-or-nothing flush of one plan's outputs.

use crate::error::ReforgeError;
use crate::model::FileOutput;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Destination for prepared outputs. The filesystem in production; tests
/// substitute sinks that fail on demand.
pub trait OutputSink: Send + Sync {
    /// Writes `content` to `path`, creating parent directories.
    ///
    /// # Errors
    /// Returns the underlying I/O error.
    fn write(&self, path: &Path, content: &str) -> io::Result<()>;
}

/// Writes through a temp sibling and renames into place.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsSink;

impl OutputSink for FsSink {
    fn write(&self, path: &Path, content: &str) -> io::Result<()> {
        write_atomic(path, content.as_bytes())
    }
}

/// Writes `bytes` to a temp file next to `path`, then renames it over `path`.
///
/// # Errors
/// Returns the underlying I/O error; the temp file is removed on failure.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = temp_sibling(path);
    if let Err(e) = fs::write(&tmp, bytes).and_then(|()| fs::rename(&tmp, path)) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.reforge-tmp-{}", std::process::id()))
}

/// Prior state of a path about to be overwritten.
struct Undo {
    path: PathBuf,
    original: Option<Vec<u8>>,
    created_dirs: Vec<PathBuf>,
}

fn missing_ancestors(path: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let mut cur = path.parent();
    while let Some(dir) = cur {
        if dir.as_os_str().is_empty() || dir.exists() {
            break;
        }
        out.push(dir.to_path_buf());
        cur = dir.parent();
    }
    out
}

/// Writes every output through `sink`. If any write fails, outputs already
/// written are put back the way they were and the failure is fatal.
///
/// # Errors
/// `ReforgeError::Fatal` naming the path that failed.
pub fn flush(sink: &dyn OutputSink, outputs: &[FileOutput]) -> Result<(), ReforgeError> {
    let mut done: Vec<Undo> = Vec::with_capacity(outputs.len());
    for out in outputs {
        let undo = Undo {
            path: out.path.clone(),
            original: fs::read(&out.path).ok(),
            created_dirs: missing_ancestors(&out.path),
        };
        if let Err(e) = sink.write(&out.path, &out.content) {
            tracing::error!(path = %out.path.display(), error = %e, "write failed, restoring plan outputs");
            done.push(undo);
            restore(&done);
            return Err(ReforgeError::Fatal {
                path: out.path.clone(),
                reason: e.to_string(),
            });
        }
        done.push(undo);
    }
    Ok(())
}

fn restore(done: &[Undo]) {
    for undo in done.iter().rev() {
        let result = match &undo.original {
            Some(bytes) => write_atomic(&undo.path, bytes),
            None => match fs::remove_file(&undo.path) {
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                other => other,
            },
        };
        if let Err(e) = result {
            tracing::warn!(path = %undo.path.display(), error = %e, "could not restore");
        }
        // Innermost first; `remove_dir` refuses non-empty directories.
        for dir in &undo.created_dirs {
            let _ = fs::remove_dir(dir);
        }
    }
}
