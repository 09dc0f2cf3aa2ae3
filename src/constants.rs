// src/constants.rs
//! Directory and file-name patterns shared by the scanner and the snapshot
//! copier. Both must agree, otherwise a rollback could resurrect or miss
//! files.

/// Tool state directory (snapshots, reports, journal).
pub const STATE_DIR: &str = ".reforge";

/// Directories pruned during scanning and excluded from snapshots.
pub const PRUNE_DIRS: &[&str] = &[
    STATE_DIR,
    ".git",
    ".hg",
    ".svn",
    "node_modules",
    "bower_components",
    "dist",
    "build",
    "out",
    "target",
    ".next",
    ".nuxt",
    ".turbo",
    ".cache",
    "coverage",
    "__pycache__",
    ".venv",
    "venv",
    ".tox",
    ".mypy_cache",
    ".pytest_cache",
    "vendor",
];

/// Files never copied into a snapshot and never scanned.
pub const IGNORED_FILES: &[&str] = &[".DS_Store", "Thumbs.db", "desktop.ini"];

pub const BIN_EXT_PATTERN: &str = r"(?i)\.(png|jpe?g|gif|svg|ico|icns|webp|woff2?|ttf|otf|eot|pdf|mp4|mov|mkv|avi|mp3|wav|flac|zip|gz|bz2|xz|7z|rar|jar|war|parquet|sqlite|db|bin|exe|dll|so|dylib|o|a|class|pyc|wasm|pkl|onnx|tgz|zst|lock)$";

/// Returns true if a directory entry with this name must not be descended into.
#[must_use]
pub fn should_prune(name: &str) -> bool {
    PRUNE_DIRS.contains(&name)
}

/// Returns true if a file with this name is noise that neither scan nor
/// snapshot should touch.
#[must_use]
pub fn is_ignored_file(name: &str) -> bool {
    IGNORED_FILES.contains(&name)
}
