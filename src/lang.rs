// src/lang.rs
use serde::{Deserialize, Serialize};
use tree_sitter::Language;

/// Languages the tool understands. JavaScript is parsed with the TypeScript
/// grammar; JSX/TSX files use the TSX dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    Rust,
    Python,
    TypeScript,
    Tsx,
}

/// Coarse family used for duplicate grouping: a `.ts` and a `.js` file with
/// identical text are duplicates, a `.ts` and a `.py` file never are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LangFamily {
    Rust,
    Python,
    Script,
}

impl LangFamily {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rust => "rust",
            Self::Python => "python",
            Self::Script => "script",
        }
    }
}

impl Lang {
    #[must_use]
    pub fn from_ext(ext: &str) -> Option<Self> {
        match ext {
            "rs" => Some(Self::Rust),
            "py" => Some(Self::Python),
            "ts" | "js" | "mjs" | "cjs" | "mts" | "cts" => Some(Self::TypeScript),
            "tsx" | "jsx" => Some(Self::Tsx),
            _ => None,
        }
    }

    #[must_use]
    pub fn from_path(path: &std::path::Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_ext)
    }

    #[must_use]
    pub fn grammar(self) -> Language {
        match self {
            Self::Rust => tree_sitter_rust::language(),
            Self::Python => tree_sitter_python::language(),
            Self::TypeScript => tree_sitter_typescript::language_typescript(),
            Self::Tsx => tree_sitter_typescript::language_tsx(),
        }
    }

    #[must_use]
    pub fn family(self) -> LangFamily {
        match self {
            Self::Rust => LangFamily::Rust,
            Self::Python => LangFamily::Python,
            Self::TypeScript | Self::Tsx => LangFamily::Script,
        }
    }

    #[must_use]
    pub fn is_script(self) -> bool {
        self.family() == LangFamily::Script
    }

    #[must_use]
    pub fn line_comment(self) -> &'static str {
        match self {
            Self::Python => "#",
            _ => "//",
        }
    }
}
