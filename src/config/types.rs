use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thresholds {
    /// Files with more lines than this are oversized.
    #[serde(default = "default_size")]
    pub size: usize,
    /// Files whose textual complexity score exceeds this are oversized.
    #[serde(default = "default_complexity")]
    pub complexity: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            size: default_size(),
            complexity: default_complexity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSection {
    /// Directories to walk, relative to the working-tree root.
    #[serde(default = "default_roots")]
    pub roots: Vec<String>,
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl Default for ScanSection {
    fn default() -> Self {
        Self {
            roots: default_roots(),
            include: Vec::new(),
            exclude: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSection {
    #[serde(default = "default_jobs")]
    pub jobs: usize,
    #[serde(default = "default_plan_timeout")]
    pub plan_timeout_secs: u64,
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            jobs: default_jobs(),
            plan_timeout_secs: default_plan_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateSection {
    /// Files with fewer significant lines never form a duplicate group.
    #[serde(default = "default_min_lines")]
    pub min_lines: usize,
    /// Window size (normalized lines) for the partial-duplication pass.
    /// Zero disables the pass.
    #[serde(default = "default_block_window")]
    pub block_window: usize,
    /// Report identifier-insensitive near duplicates. Never consolidated.
    #[serde(default)]
    pub structural: bool,
}

impl Default for DuplicateSection {
    fn default() -> Self {
        Self {
            min_lines: default_min_lines(),
            block_window: default_block_window(),
            structural: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationSection {
    #[serde(default)]
    pub formatter: Option<String>,
    #[serde(default)]
    pub checker: Option<String>,
    #[serde(default)]
    pub tests: Option<String>,
    #[serde(default = "default_validation_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupSection {
    #[serde(default = "default_retention")]
    pub retention: usize,
}

impl Default for BackupSection {
    fn default() -> Self {
        Self {
            retention: default_retention(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSection {
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

impl Default for ReportSection {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
        }
    }
}

/// On-disk shape of `reforge.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReforgeToml {
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default)]
    pub scan: ScanSection,
    #[serde(default)]
    pub scheduler: SchedulerSection,
    #[serde(default)]
    pub duplicates: DuplicateSection,
    #[serde(default)]
    pub validation: ValidationSection,
    #[serde(default)]
    pub backup: BackupSection,
    #[serde(default)]
    pub report: ReportSection,
}

const fn default_size() -> usize { 300 }
const fn default_complexity() -> usize { 60 }
const fn default_jobs() -> usize { 4 }
const fn default_plan_timeout() -> u64 { 30 }
const fn default_min_lines() -> usize { 5 }
const fn default_block_window() -> usize { 8 }
const fn default_validation_timeout() -> u64 { 300 }
const fn default_retention() -> usize { 5 }
const fn default_top_n() -> usize { 10 }

fn default_roots() -> Vec<String> {
    vec![".".into()]
}
