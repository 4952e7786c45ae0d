//! Statement splitting for T-SQL scripts.
//!
//! A script is divided into batches on standalone `GO` lines, and each batch
//! into statements on `;` terminators that fall outside quoted strings.
//! The same depth-tracking [`Scanner`] is reused by the converters to split
//! column definitions and VALUES tuples.

use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

/// A `GO` keyword occupying its own line
static BATCH_SEPARATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^[ \t]*GO[ \t]*\r?$").unwrap());

static CREATE_TABLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)CREATE\s+TABLE\b").unwrap());

static INSERT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bINSERT\b").unwrap());

static USE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^USE\b").unwrap());

static SET_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^SET\b").unwrap());

/// Kind of a raw statement, decided before any conversion happens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    CreateTable,
    Insert,
    /// `USE [database]`
    UseDatabase,
    /// `SET ANSI_NULLS ON`, `SET IDENTITY_INSERT ... ON`, etc.
    SessionOption,
    /// Anything else; passed through with normalized identifiers
    Other,
}

impl StatementKind {
    /// Classify a statement whose leading comments were already stripped.
    pub fn classify(stmt: &str) -> Self {
        if CREATE_TABLE_RE.is_match(stmt) {
            StatementKind::CreateTable
        } else if INSERT_RE.is_match(stmt) {
            StatementKind::Insert
        } else if USE_RE.is_match(stmt) {
            StatementKind::UseDatabase
        } else if SET_RE.is_match(stmt) {
            StatementKind::SessionOption
        } else {
            StatementKind::Other
        }
    }
}

impl std::fmt::Display for StatementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatementKind::CreateTable => write!(f, "CREATE TABLE"),
            StatementKind::Insert => write!(f, "INSERT"),
            StatementKind::UseDatabase => write!(f, "USE"),
            StatementKind::SessionOption => write!(f, "SET"),
            StatementKind::Other => write!(f, "other"),
        }
    }
}

/// Quote- and bracket-aware character scanner.
///
/// A separator only counts when it is outside any quoted string and, if
/// parentheses are tracked, at nesting depth zero. Quotes do not nest: once a
/// string is opened by one quote character, only that character closes it.
/// Doubled quotes (`'it''s'`) close and reopen the string, which leaves the
/// state unchanged.
#[derive(Debug, Clone, Copy)]
pub struct Scanner {
    quotes: &'static [char],
    track_parens: bool,
}

#[derive(Debug, Default, Clone, Copy)]
struct ScanState {
    depth: usize,
    quote: Option<char>,
}

impl ScanState {
    /// Advance over `c`. Returns true if `c` sits at the top level
    /// (outside strings and, for separators, at depth zero before the update).
    fn step(&mut self, c: char, scanner: &Scanner) -> bool {
        if let Some(q) = self.quote {
            if c == q {
                self.quote = None;
            }
            return false;
        }
        if scanner.quotes.contains(&c) {
            self.quote = Some(c);
            return false;
        }
        let top = self.depth == 0;
        if scanner.track_parens {
            match c {
                '(' => self.depth += 1,
                ')' => self.depth = self.depth.saturating_sub(1),
                _ => {}
            }
        }
        top
    }
}

impl Scanner {
    /// Quote-aware only; used for statement terminators.
    pub const fn statements() -> Self {
        Self {
            quotes: &['\'', '"'],
            track_parens: false,
        }
    }

    /// Quote-aware and parenthesis-aware; used for definition and value lists.
    pub const fn nested() -> Self {
        Self {
            quotes: &['\'', '"'],
            track_parens: true,
        }
    }

    /// Split `text` on top-level occurrences of `sep`.
    ///
    /// Pieces are trimmed; empty pieces are dropped. Unterminated trailing text
    /// is still returned as the final piece.
    pub fn split<'a>(&self, text: &'a str, sep: char) -> Vec<&'a str> {
        let mut pieces = Vec::new();
        let mut state = ScanState::default();
        let mut start = 0;

        for (i, c) in text.char_indices() {
            if state.step(c, self) && c == sep {
                push_trimmed(&mut pieces, &text[start..i]);
                start = i + c.len_utf8();
            }
        }
        push_trimmed(&mut pieces, &text[start..]);
        pieces
    }

    /// Byte ranges of the contents of each top-level `( ... )` group.
    ///
    /// The ranges exclude the enclosing parentheses. An unclosed final group
    /// is not reported. Always tracks parentheses, regardless of preset.
    pub fn groups(&self, text: &str) -> Vec<Range<usize>> {
        let scanner = Scanner {
            track_parens: true,
            ..*self
        };
        let mut groups = Vec::new();
        let mut state = ScanState::default();
        let mut open_at = None;

        for (i, c) in text.char_indices() {
            let before = state.depth;
            state.step(c, &scanner);
            if before == 0 && state.depth == 1 {
                open_at = Some(i + 1);
            } else if before == 1 && state.depth == 0 {
                if let Some(start) = open_at.take() {
                    groups.push(start..i);
                }
            }
        }
        groups
    }

    /// Byte offset of the first top-level occurrence of `word` as a whole
    /// word, compared ASCII case-insensitively.
    pub fn find_word(&self, text: &str, word: &str) -> Option<usize> {
        let bytes = text.as_bytes();
        let needle = word.as_bytes();
        let mut state = ScanState::default();

        for (i, c) in text.char_indices() {
            if !state.step(c, self) || state.depth != 0 {
                continue;
            }
            let end = i + needle.len();
            if end <= bytes.len()
                && bytes[i..end].eq_ignore_ascii_case(needle)
                && (i == 0 || !is_word_byte(bytes[i - 1]))
                && bytes.get(end).map_or(true, |&b| !is_word_byte(b))
            {
                return Some(i);
            }
        }
        None
    }
}

#[inline]
fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

#[inline]
fn push_trimmed<'a>(pieces: &mut Vec<&'a str>, piece: &'a str) {
    let piece = piece.trim();
    if !piece.is_empty() {
        pieces.push(piece);
    }
}

/// Split a script into batches on standalone `GO` lines.
///
/// The separator lines are not part of any batch. Blank batches are dropped.
pub fn split_batches(script: &str) -> Vec<&str> {
    BATCH_SEPARATOR_RE
        .split(script)
        .filter(|batch| !batch.trim().is_empty())
        .collect()
}

/// Split a batch into statements on `;` outside quoted strings.
pub fn split_statements(batch: &str) -> Vec<&str> {
    Scanner::statements().split(batch, ';')
}

/// Strip leading `--` and `/* */` comments from a statement.
///
/// Returns an empty string if the statement is only comments.
pub fn strip_leading_comments(stmt: &str) -> &str {
    let mut rest = stmt.trim_start();
    loop {
        if rest.starts_with("--") {
            match rest.find('\n') {
                Some(pos) => rest = rest[pos + 1..].trim_start(),
                None => return "",
            }
        } else if rest.starts_with("/*") {
            match rest.find("*/") {
                Some(pos) => rest = rest[pos + 2..].trim_start(),
                None => return "",
            }
        } else {
            return rest;
        }
    }
}
