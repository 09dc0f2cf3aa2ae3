// src/duplicates/normalize.rs
//! Comment and string stripping. Not a parser: a small lexer that knows just
//! enough about each language's literals to never mistake `"//"` for a comment.

use crate::lang::Lang;

/// Normalized text with the source line each kept line came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Normalized {
    pub lines: Vec<NormalizedLine>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedLine {
    /// 1-based line in the original source.
    pub source_line: usize,
    pub text: String,
}

impl Normalized {
    #[must_use]
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[must_use]
    pub fn significant_lines(&self) -> usize {
        self.lines.len()
    }
}

/// Strips comments, collapses whitespace, drops blank lines.
#[must_use]
pub fn normalize(source: &str, lang: Option<Lang>) -> Normalized {
    let stripped = strip(source, lang, false);
    let lines = stripped
        .lines()
        .enumerate()
        .filter_map(|(idx, line)| {
            let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
            (!collapsed.is_empty()).then_some(NormalizedLine {
                source_line: idx + 1,
                text: collapsed,
            })
        })
        .collect();
    Normalized { lines }
}

/// Removes comments (and string contents when `strip_strings`), keeping every
/// newline so line numbers survive.
#[must_use]
pub fn strip(source: &str, lang: Option<Lang>, strip_strings: bool) -> String {
    Lexer {
        chars: source.chars().collect(),
        pos: 0,
        out: String::with_capacity(source.len()),
        lang,
        strip_strings,
    }
    .run()
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    out: String,
    lang: Option<Lang>,
    strip_strings: bool,
}

impl Lexer {
    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn run(mut self) -> String {
        while let Some(c) = self.peek(0) {
            let next = self.peek(1);
            match (c, next) {
                ('/', Some('/')) if self.lang != Some(Lang::Python) => self.line_comment(),
                ('/', Some('*')) if self.lang != Some(Lang::Python) => self.block_comment(),
                ('#', _) if self.lang == Some(Lang::Python) => self.line_comment(),
                ('r', Some('"' | '#')) if self.lang == Some(Lang::Rust) && self.raw_string_start() => {
                    self.rust_raw_string();
                }
                ('\'', _) if self.lang == Some(Lang::Rust) => self.rust_quote(),
                ('"' | '\'', _) if self.lang == Some(Lang::Python) && self.triple(c) => {
                    self.python_triple(c);
                }
                ('"' | '\'', _) => self.string(c),
                ('`', _) if self.lang.map_or(true, Lang::is_script) => self.string('`'),
                _ => {
                    self.out.push(c);
                    self.pos += 1;
                }
            }
        }
        self.out
    }

    fn line_comment(&mut self) {
        while let Some(c) = self.peek(0) {
            if c == '\n' {
                break;
            }
            self.pos += 1;
        }
    }

    fn block_comment(&mut self) {
        let nests = self.lang == Some(Lang::Rust);
        let mut depth = 0usize;
        while let Some(c) = self.peek(0) {
            match (c, self.peek(1)) {
                ('/', Some('*')) if depth == 0 || nests => {
                    depth += 1;
                    self.pos += 2;
                }
                ('*', Some('/')) => {
                    depth = depth.saturating_sub(1);
                    self.pos += 2;
                    if depth == 0 {
                        return;
                    }
                }
                ('\n', _) => {
                    self.out.push('\n');
                    self.pos += 1;
                }
                _ => self.pos += 1,
            }
        }
    }

    fn emit_literal_char(&mut self, c: char) {
        if !self.strip_strings || c == '\n' {
            self.out.push(c);
        }
    }

    fn string(&mut self, quote: char) {
        self.out.push(quote);
        self.pos += 1;
        while let Some(c) = self.peek(0) {
            self.pos += 1;
            if c == '\\' {
                self.emit_literal_char(c);
                if let Some(escaped) = self.peek(0) {
                    self.emit_literal_char(escaped);
                    self.pos += 1;
                }
                continue;
            }
            if c == quote {
                self.out.push(quote);
                return;
            }
            // Unterminated single-line strings end at the newline.
            if c == '\n' && quote != '`' && self.lang != Some(Lang::Rust) {
                self.out.push('\n');
                return;
            }
            self.emit_literal_char(c);
        }
    }

    fn triple(&self, q: char) -> bool {
        self.peek(1) == Some(q) && self.peek(2) == Some(q)
    }

    fn python_triple(&mut self, q: char) {
        for _ in 0..3 {
            self.out.push(q);
        }
        self.pos += 3;
        while let Some(c) = self.peek(0) {
            if c == '\\' {
                self.emit_literal_char(c);
                self.pos += 1;
                if let Some(e) = self.peek(0) {
                    self.emit_literal_char(e);
                    self.pos += 1;
                }
                continue;
            }
            if c == q && self.triple(q) {
                for _ in 0..3 {
                    self.out.push(q);
                }
                self.pos += 3;
                return;
            }
            self.emit_literal_char(c);
            self.pos += 1;
        }
    }

    fn raw_string_start(&self) -> bool {
        let prev_is_ident = self.pos > 0
            && self
                .chars
                .get(self.pos - 1)
                .is_some_and(|c| c.is_alphanumeric() || *c == '_');
        if prev_is_ident {
            return false;
        }
        let mut i = 1;
        while self.peek(i) == Some('#') {
            i += 1;
        }
        self.peek(i) == Some('"')
    }

    fn rust_raw_string(&mut self) {
        self.pos += 1;
        let mut hashes = 0;
        while self.peek(0) == Some('#') {
            hashes += 1;
            self.pos += 1;
        }
        self.pos += 1;
        self.out.push('"');
        while let Some(c) = self.peek(0) {
            if c == '"' && (1..=hashes).all(|k| self.peek(k) == Some('#')) {
                self.pos += 1 + hashes;
                self.out.push('"');
                return;
            }
            self.emit_literal_char(c);
            self.pos += 1;
        }
    }

    /// `'a'` and `'\n'` are char literals; `'a` alone is a lifetime.
    fn rust_quote(&mut self) {
        let is_char = match (self.peek(1), self.peek(2)) {
            (Some('\\'), _) => true,
            (Some(_), Some('\'')) => true,
            _ => false,
        };
        if is_char {
            self.string('\'');
        } else {
            self.out.push('\'');
            self.pos += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_script_comments_but_not_strings() {
        let src = "const url = \"http://x\"; // note\n/* block\n comment */ let a = 1;\n";
        let out = strip(src, Some(Lang::TypeScript), false);
        assert_eq!(out, "const url = \"http://x\"; \n\n let a = 1;\n");
    }

    #[test]
    fn strips_string_contents_on_request() {
        let out = strip("if (s == 'a && b') {}", Some(Lang::TypeScript), true);
        assert_eq!(out, "if (s == '') {}");
    }

    #[test]
    fn python_hash_and_triple_quotes() {
        let src = "x = '#not'  # real\ns = \"\"\"doc # still doc\n\"\"\"\n";
        let out = strip(src, Some(Lang::Python), false);
        assert_eq!(out, "x = '#not'  \ns = \"\"\"doc # still doc\n\"\"\"\n");
    }

    #[test]
    fn rust_lifetimes_raw_strings_and_nested_comments() {
        let src = "fn f<'a>(x: &'a str) -> char { /* a /* b */ c */ let r = r#\"//\"#; 'x' }";
        let out = strip(src, Some(Lang::Rust), true);
        assert_eq!(out, "fn f<'a>(x: &'a str) -> char {  let r = \"\"; '' }");
    }

    #[test]
    fn normalize_collapses_whitespace_and_tracks_lines() {
        let n = normalize("a  =  1;\n\n   // gone\nb=2;\n", Some(Lang::TypeScript));
        assert_eq!(n.text(), "a = 1;\nb=2;");
        assert_eq!(n.lines[1].source_line, 4);
        assert_eq!(n.significant_lines(), 2);
    }

    #[test]
    fn unterminated_literals_do_not_panic() {
        let _ = normalize("let s = \"abc\n/* open", Some(Lang::Rust));
        let _ = normalize("s = '''never closed", Some(Lang::Python));
        let _ = normalize("`tmpl ${", None);
    }
}
