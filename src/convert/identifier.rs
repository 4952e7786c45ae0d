//! Identifier normalization.
//!
//! SQL Server scripts quote names with brackets and qualify them with the
//! default `dbo` schema: `[dbo].[Users]`. PostgreSQL folds unquoted names to
//! lowercase, so the brackets and the default schema are dropped and the name
//! is lowercased.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Default schema qualifier, bracketed or bare: `[dbo].`, `dbo.`
static DEFAULT_SCHEMA_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:\[dbo\]|\bdbo)\s*\.\s*").unwrap());

/// One layer of bracket delimiters: `[Name]`
static BRACKETED_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\]]+)\]").unwrap());

/// Remove default-schema qualifiers and bracket delimiters, trim and lowercase.
///
/// `[dbo].[Users]` becomes `users`, `[Id]` becomes `id`. Text without brackets
/// is only trimmed and lowercased.
pub fn normalize_identifier(raw: &str) -> String {
    let unqualified = DEFAULT_SCHEMA_RE.replace_all(raw, "");
    let unbracketed = BRACKETED_RE.replace_all(&unqualified, "$1");
    unbracketed.trim().to_lowercase()
}

/// Like [`normalize_identifier`], but only bracketed names are lowercased.
///
/// Used on column definitions so type names and keywords keep their case:
/// `[Name] NVARCHAR(50) NOT NULL` becomes `name NVARCHAR(50) NOT NULL`.
pub fn normalize_brackets(text: &str) -> String {
    let unqualified = DEFAULT_SCHEMA_RE.replace_all(text, "");
    BRACKETED_RE
        .replace_all(&unqualified, |caps: &Captures| caps[1].to_lowercase())
        .trim()
        .to_string()
}
