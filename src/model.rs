// src/model.rs
//! Records passed between pipeline phases.

use crate::lang::Lang;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;

/// Role tag assigned by the classifier. Closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Service,
    Controller,
    Repository,
    Component,
    Util,
    Test,
    Generic,
    Unknown,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Service => "service",
            Self::Controller => "controller",
            Self::Repository => "repository",
            Self::Component => "component",
            Self::Util => "util",
            Self::Test => "test",
            Self::Generic => "generic",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One scanned file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: PathBuf,
    /// Root-relative, forward slashes.
    pub relative: String,
    pub lang: Option<Lang>,
    pub line_count: usize,
    pub complexity: usize,
    pub role: Role,
    /// Outbound import specifiers as written in the source.
    pub references: BTreeSet<String>,
    pub duplicate_group: Option<String>,
    pub needs_transform: bool,
    /// Hash of the raw content. Empty for unreadable files.
    pub content_hash: String,
}

impl FileRecord {
    /// Record for a file that could not be read as text.
    #[must_use]
    pub fn unknown(path: PathBuf, relative: String) -> Self {
        Self {
            lang: Lang::from_path(&path),
            path,
            relative,
            line_count: 0,
            complexity: 0,
            role: Role::Unknown,
            references: BTreeSet::new(),
            duplicate_group: None,
            needs_transform: false,
            content_hash: String::new(),
        }
    }

    #[must_use]
    pub fn is_unknown(&self) -> bool {
        self.role == Role::Unknown
    }
}

/// Files whose normalized content hashes equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub id: String,
    pub hash: String,
    /// Root-relative member paths, sorted.
    pub members: Vec<String>,
    pub canonical: String,
}

impl DuplicateGroup {
    #[must_use]
    pub fn is_canonical(&self, relative: &str) -> bool {
        self.canonical == relative
    }

    pub fn non_canonical(&self) -> impl Iterator<Item = &String> {
        self.members.iter().filter(move |m| **m != self.canonical)
    }
}

/// Contiguous normalized-line window repeated elsewhere in the corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialDuplicate {
    pub file: String,
    /// 1-based, inclusive source lines.
    pub start_line: usize,
    pub end_line: usize,
    /// Other locations of the same window (`path:line`).
    pub also_in: Vec<String>,
}

/// Identifier-insensitive match. Reported only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NearDuplicateGroup {
    pub fingerprint: String,
    pub members: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    Consolidate,
    Service,
    Controller,
    Repository,
    Component,
    SplitByChunk,
}

impl Strategy {
    /// Role strategy for a role with a fixed sub-structure.
    #[must_use]
    pub fn for_role(role: Role) -> Option<Self> {
        match role {
            Role::Service => Some(Self::Service),
            Role::Controller => Some(Self::Controller),
            Role::Repository => Some(Self::Repository),
            Role::Component => Some(Self::Component),
            _ => None,
        }
    }

    /// Sub-structure of a role strategy, in emission order.
    #[must_use]
    pub fn parts(self) -> &'static [&'static str] {
        match self {
            Self::Service => &["entities", "use-cases", "repository"],
            Self::Controller => &["dto", "validation", "handlers"],
            Self::Repository => &["entities", "queries"],
            Self::Component => &["types", "hooks", "utils", "view"],
            Self::Consolidate | Self::SplitByChunk => &[],
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Consolidate => "consolidate",
            Self::Service => "service",
            Self::Controller => "controller",
            Self::Repository => "repository",
            Self::Component => "component",
            Self::SplitByChunk => "split-by-chunk",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanParams {
    pub chunk_count: Option<usize>,
    /// Directory receiving the parts.
    pub layout_dir: Option<PathBuf>,
    /// Part names, in order.
    pub parts: Vec<String>,
    pub canonical: Option<PathBuf>,
    /// Files whose imports this plan rewrites.
    pub dependents: Vec<PathBuf>,
    /// Non-canonical path -> canonical path, for the dependents' rewrites.
    pub redirects: BTreeMap<PathBuf, PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformationPlan {
    pub path: PathBuf,
    pub relative: String,
    pub lang: Option<Lang>,
    pub strategy: Strategy,
    pub params: PlanParams,
    pub planned_outputs: Vec<PathBuf>,
}

/// Per-plan lifecycle. Terminal states never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlanState {
    Pending,
    InProgress,
    Succeeded,
    Failed,
}

impl PlanState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Returns the next state if `to` is a legal transition from `self`.
    #[must_use]
    pub fn advance(self, to: Self) -> Option<Self> {
        match (self, to) {
            (Self::Pending, Self::InProgress)
            | (Self::InProgress, Self::Succeeded | Self::Failed)
            // Aborted plans fail without ever starting.
            | (Self::Pending, Self::Failed) => Some(to),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutput {
    pub path: PathBuf,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct TransformationResult {
    pub path: PathBuf,
    pub relative: String,
    pub strategy: Strategy,
    pub state: PlanState,
    pub outputs: Vec<FileOutput>,
    pub written: bool,
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl TransformationResult {
    #[must_use]
    pub fn failed(plan: &TransformationPlan, error: impl fmt::Display, duration_ms: u64) -> Self {
        Self {
            path: plan.path.clone(),
            relative: plan.relative.clone(),
            strategy: plan.strategy,
            state: PlanState::Failed,
            outputs: Vec::new(),
            written: false,
            error: Some(error.to_string()),
            duration_ms,
        }
    }

    #[must_use]
    pub fn succeeded(plan: &TransformationPlan, outputs: Vec<FileOutput>, written: bool, duration_ms: u64) -> Self {
        Self {
            path: plan.path.clone(),
            relative: plan.relative.clone(),
            strategy: plan.strategy,
            state: PlanState::Succeeded,
            outputs,
            written,
            error: None,
            duration_ms,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.state == PlanState::Succeeded
    }
}

/// Full copy of the working tree taken before mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupSnapshot {
    pub id: String,
    /// Directory holding the copied tree.
    pub root: PathBuf,
    pub file_count: usize,
    pub created_at: String,
}
