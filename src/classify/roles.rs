// src/classify/roles.rs
//! Role tagging as an ordered rule table. The first matching rule wins, so
//! filename rules always beat content heuristics.

use crate::model::Role;
use std::path::Path;

/// What a rule gets to look at.
#[derive(Debug)]
pub struct Subject<'a> {
    /// Lowercased tokens of the file stem (`UserService.spec.ts` -> user, service, spec).
    pub tokens: Vec<String>,
    /// Lowercased names of the parent directories.
    pub dirs: Vec<String>,
    pub ext: String,
    pub content: &'a str,
}

impl<'a> Subject<'a> {
    #[must_use]
    pub fn new(path: &Path, content: &'a str) -> Self {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let stem = file_name
            .strip_suffix(&format!(".{ext}"))
            .unwrap_or(&file_name)
            .to_string();
        let dirs = path
            .parent()
            .map(|p| {
                p.components()
                    .map(|c| c.as_os_str().to_string_lossy().to_lowercase())
                    .collect()
            })
            .unwrap_or_default();
        Self {
            tokens: tokenize(&stem),
            dirs,
            ext,
            content,
        }
    }

    fn has_token(&self, wanted: &[&str]) -> bool {
        self.tokens.iter().any(|t| wanted.contains(&t.as_str()))
    }

    fn contains_any(&self, needles: &[&str]) -> bool {
        needles.iter().any(|n| self.content.contains(n))
    }
}

/// Splits on punctuation and lower-to-upper camel-case transitions.
#[must_use]
pub fn tokenize(stem: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;
    for c in stem.chars() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower && !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

pub struct Rule {
    pub name: &'static str,
    pub role: Role,
    pub matches: fn(&Subject) -> bool,
}

pub static RULES: &[Rule] = &[
    // Filename conventions.
    Rule {
        name: "test-name",
        role: Role::Test,
        matches: |s| {
            s.has_token(&["test", "tests", "spec"])
                || s.dirs.iter().any(|d| d == "__tests__" || d == "tests")
        },
    },
    Rule {
        name: "controller-name",
        role: Role::Controller,
        matches: |s| s.has_token(&["controller", "controllers", "handler", "handlers", "routes", "router"]),
    },
    Rule {
        name: "service-name",
        role: Role::Service,
        matches: |s| s.has_token(&["service", "services"]),
    },
    Rule {
        name: "repository-name",
        role: Role::Repository,
        matches: |s| s.has_token(&["repository", "repositories", "repo", "dao"]),
    },
    Rule {
        name: "component-name",
        role: Role::Component,
        matches: |s| s.has_token(&["component", "components"]) || s.ext == "tsx" || s.ext == "jsx",
    },
    Rule {
        name: "util-name",
        role: Role::Util,
        matches: |s| s.has_token(&["util", "utils", "helper", "helpers"]),
    },
    // Content markers.
    Rule {
        name: "test-content",
        role: Role::Test,
        matches: |s| {
            s.contains_any(&["describe(", "import pytest", "unittest.TestCase"])
                || (s.content.contains("#[test]") && !s.content.contains("#[cfg(test)]"))
        },
    },
    Rule {
        name: "controller-content",
        role: Role::Controller,
        matches: |s| {
            s.contains_any(&[
                "@Controller(",
                "@RestController",
                "APIRouter(",
                "@app.route(",
                "express.Router(",
                "#[get(",
                "#[post(",
            ])
        },
    },
    Rule {
        name: "repository-content",
        role: Role::Repository,
        matches: |s| s.contains_any(&["@Entity(", "@Repository", "EntityRepository", "getRepository("]),
    },
    Rule {
        name: "service-content",
        role: Role::Service,
        matches: |s| s.contains_any(&["@Injectable(", "@Service("]),
    },
    Rule {
        name: "component-content",
        role: Role::Component,
        matches: |s| {
            s.contains_any(&["from 'react'", "from \"react\"", "React.FC", "useState("])
        },
    },
];

/// Role of a text file. Unmatched files are `generic`.
#[must_use]
pub fn classify_role(subject: &Subject) -> Role {
    RULES
        .iter()
        .find(|r| (r.matches)(subject))
        .map_or(Role::Generic, |r| r.role)
}

/// Name of the rule that fired, for debug logging.
#[must_use]
pub fn matching_rule(subject: &Subject) -> Option<&'static str> {
    RULES.iter().find(|r| (r.matches)(subject)).map(|r| r.name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn role(path: &str, content: &str) -> Role {
        classify_role(&Subject::new(Path::new(path), content))
    }

    #[test]
    fn tokenizes_camel_and_punctuation() {
        assert_eq!(tokenize("UserService.spec"), vec!["user", "service", "spec"]);
        assert_eq!(tokenize("order_repo"), vec!["order", "repo"]);
        assert_eq!(tokenize("HTTPClient"), vec!["httpclient"]);
    }

    #[test]
    fn filename_rules() {
        assert_eq!(role("src/user.service.ts", ""), Role::Service);
        assert_eq!(role("src/UserController.ts", ""), Role::Controller);
        assert_eq!(role("src/orderRepository.ts", ""), Role::Repository);
        assert_eq!(role("src/Button.tsx", ""), Role::Component);
        assert_eq!(role("src/string_utils.py", ""), Role::Util);
        assert_eq!(role("tests/integration.rs", ""), Role::Test);
    }

    #[test]
    fn filename_beats_content() {
        assert_eq!(role("src/user.service.spec.ts", "@Injectable()"), Role::Test);
        assert_eq!(role("src/helpers.ts", "@Controller('x')"), Role::Util);
    }

    #[test]
    fn content_rules() {
        assert_eq!(role("src/users.ts", "@Controller('users')\nclass X {}"), Role::Controller);
        assert_eq!(role("src/x.ts", "import React from 'react';"), Role::Component);
        assert_eq!(role("src/x.py", "import pytest\n"), Role::Test);
        assert_eq!(role("src/lib.rs", "#[cfg(test)]\nmod tests { #[test] fn a() {} }"), Role::Generic);
    }

    #[test]
    fn unmatched_is_generic() {
        assert_eq!(role("src/report.ts", "export const x = 1;"), Role::Generic);
        assert_eq!(matching_rule(&Subject::new(Path::new("a.ts"), "")), None);
    }
}
