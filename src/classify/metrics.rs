// src/classify/metrics.rs
//! Textual complexity score. Counts branch and boolean-operator tokens after
//! comments and string contents are removed. Cheap and approximate; it is not
//! a control-flow-graph metric.

use crate::duplicates::normalize::strip;
use crate::lang::Lang;
use regex::Regex;
use std::sync::LazyLock;

static SCRIPT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:if|for|while|case|catch)\b|&&|\|\||\s\?\s")
        .unwrap_or_else(|_| panic!("Invalid Regex"))
});

static RUST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:if|for|while|loop)\b|=>|&&|\|\|").unwrap_or_else(|_| panic!("Invalid Regex"))
});

static PYTHON_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:if|elif|for|while|except|case|and|or)\b")
        .unwrap_or_else(|_| panic!("Invalid Regex"))
});

/// Complexity of `source`: 1 plus one per branching, looping or logical token.
#[must_use]
pub fn complexity(source: &str, lang: Option<Lang>) -> usize {
    let code = strip(source, lang, true);
    let re: &Regex = match lang {
        Some(Lang::Rust) => &RUST_RE,
        Some(Lang::Python) => &PYTHON_RE,
        Some(Lang::TypeScript | Lang::Tsx) | None => &SCRIPT_RE,
    };
    1 + re.find_iter(&code).count()
}
