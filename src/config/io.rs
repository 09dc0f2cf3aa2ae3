// src/config/io.rs
use super::types::ReforgeToml;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

pub const CONFIG_FILE: &str = "reforge.toml";

/// Reads `reforge.toml` from `path`. A missing file yields the defaults; a
/// malformed one is an error so a typo never silently loosens thresholds.
///
/// # Errors
/// Returns error if the file exists but cannot be read or parsed.
pub fn load_toml(path: &Path) -> Result<ReforgeToml> {
    if !path.exists() {
        return Ok(ReforgeToml::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    parse_toml(&content).with_context(|| format!("Failed to parse config {}", path.display()))
}

/// Parses config text.
///
/// # Errors
/// Returns error on invalid TOML or mistyped fields.
pub fn parse_toml(content: &str) -> Result<ReforgeToml> {
    Ok(toml::from_str(content)?)
}

/// Writes a config file with every default spelled out.
///
/// # Errors
/// Returns error if serialization or the write fails.
pub fn save_to_file(path: &Path, cfg: &ReforgeToml) -> Result<()> {
    let content = toml::to_string_pretty(cfg)?;
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_gets_defaults() -> Result<()> {
        let cfg = parse_toml("")?;
        assert_eq!(cfg.thresholds.size, 300);
        assert_eq!(cfg.scheduler.jobs, 4);
        assert_eq!(cfg.backup.retention, 5);
        assert!(!cfg.duplicates.structural);
        Ok(())
    }

    #[test]
    fn partial_sections_keep_other_defaults() -> Result<()> {
        let cfg = parse_toml("[thresholds]\nsize = 150\n[validation]\nchecker = \"npx tsc --noEmit\"")?;
        assert_eq!(cfg.thresholds.size, 150);
        assert_eq!(cfg.thresholds.complexity, 60);
        assert_eq!(cfg.validation.checker.as_deref(), Some("npx tsc --noEmit"));
        assert_eq!(cfg.validation.timeout_secs, 300);
        Ok(())
    }

    #[test]
    fn mistyped_field_is_an_error() {
        assert!(parse_toml("[thresholds]\nsize = \"big\"").is_err());
    }

    #[test]
    fn missing_file_is_default() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let cfg = load_toml(&dir.path().join(CONFIG_FILE))?;
        assert_eq!(cfg.report.top_n, 10);
        Ok(())
    }

    #[test]
    fn save_then_load_preserves_values() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join(CONFIG_FILE);
        let mut cfg = ReforgeToml::default();
        cfg.thresholds.complexity = 12;
        save_to_file(&path, &cfg)?;
        assert_eq!(load_toml(&path)?.thresholds.complexity, 12);
        Ok(())
    }
}
