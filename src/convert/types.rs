//! Data type mapping from SQL Server to PostgreSQL.
//!
//! The mapping table is fixed. A [`TypeMap`] is built once per conversion
//! run and shared by reference with the CREATE TABLE and INSERT converters.

use once_cell::sync::Lazy;
use regex::Regex;

/// SQL Server type → PostgreSQL type signature, in lookup priority order.
///
/// `TIMESTAMP` is SQL Server's row-version pseudo-type (an 8-byte binary
/// counter), not a date/time type, hence `BYTEA`.
pub const TYPE_MAPPING: &[(&str, &str)] = &[
    ("NVARCHAR", "VARCHAR"),
    ("NTEXT", "TEXT"),
    ("DATETIME", "TIMESTAMP"),
    ("SMALLDATETIME", "TIMESTAMP"),
    ("UNIQUEIDENTIFIER", "UUID"),
    ("MONEY", "DECIMAL(19,4)"),
    ("SMALLMONEY", "DECIMAL(10,4)"),
    ("IMAGE", "BYTEA"),
    ("BIT", "BOOLEAN"),
    ("TINYINT", "SMALLINT"),
    ("REAL", "REAL"),
    ("FLOAT", "DOUBLE PRECISION"),
    ("VARBINARY", "BYTEA"),
    ("BINARY", "BYTEA"),
    ("TIMESTAMP", "BYTEA"),
];

/// Base type name with an optional `(size)` or `(precision, scale)` suffix
static TYPE_SIZE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\w+)\s*\(\s*(\d+(?:\s*,\s*\d+)?)\s*\)").unwrap());

/// `(MAX)` length marker on a column type, which has no PostgreSQL size
static MAX_SIZE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(\w+)\s*\(\s*MAX\s*\)$").unwrap());

/// Whole-word matcher per [`TYPE_MAPPING`] entry, size suffix included
static TYPE_FINDERS: Lazy<Vec<Regex>> = Lazy::new(|| {
    TYPE_MAPPING
        .iter()
        .map(|(source, _)| {
            Regex::new(&format!(
                r"(?i)\b{}\b(?:\s*\(\s*(?:\d+(?:\s*,\s*\d+)?|MAX)\s*\))?",
                regex::escape(source)
            ))
            .unwrap()
        })
        .collect()
});

/// A mapped type occurrence inside a column definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeMatch {
    /// Byte range of the original type text, size suffix included
    pub start: usize,
    pub end: usize,
    /// Target signature for that text
    pub mapped: String,
}

/// Immutable lookup structure over [`TYPE_MAPPING`].
#[derive(Debug)]
pub struct TypeMap {
    entries: Vec<(&'static str, &'static str)>,
    /// Whole-word finders, one per entry, same order as `entries`
    finders: &'static [Regex],
}

impl TypeMap {
    /// Build the SQL Server → PostgreSQL map.
    pub fn new() -> Self {
        Self {
            entries: TYPE_MAPPING.to_vec(),
            finders: &TYPE_FINDERS,
        }
    }

    /// Look up the target signature for an uppercase base type.
    pub fn lookup(&self, base_type: &str) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(source, _)| *source == base_type)
            .map(|(_, target)| *target)
    }

    /// Map a raw type token such as `NVARCHAR(50)` to its target signature.
    ///
    /// - Mapped, and the target already has its own size or no size was given:
    ///   the target as-is (`MONEY` → `DECIMAL(19,4)`).
    /// - Mapped, bare target and a size was given: size reattached
    ///   (`NVARCHAR(50)` → `VARCHAR(50)`).
    /// - Not mapped but sized: lowercased base with size (`DECIMAL(18, 2)` →
    ///   `decimal(18, 2)`).
    /// - Otherwise the lowercased token (`INT` → `int`, `NVARCHAR(MAX)` →
    ///   `nvarchar(max)`).
    pub fn map(&self, token: &str) -> String {
        let token = token.trim();
        let (base_type, size) = match TYPE_SIZE_RE.captures(token) {
            Some(caps) => (caps[1].to_uppercase(), Some(caps[2].to_string())),
            None => (token.to_uppercase(), None),
        };

        match (self.lookup(&base_type), size) {
            (Some(target), None) => target.to_string(),
            (Some(target), Some(_)) if target.contains('(') => target.to_string(),
            (Some(target), Some(size)) => format!("{}({})", target, size),
            (None, Some(size)) => format!("{}({})", base_type.to_lowercase(), size),
            (None, None) => token.to_lowercase(),
        }
    }

    /// Find the first mapped type in `text`, trying entries in table order.
    ///
    /// Only one match is returned even if several type names occur. A
    /// `(MAX)` length is dropped and the bare type mapped:
    /// `nvarchar(max)` → `VARCHAR`.
    pub fn find_in(&self, text: &str) -> Option<TypeMatch> {
        self.finders.iter().find_map(|re| {
            re.find(text).map(|m| {
                let token = m.as_str();
                let base = MAX_SIZE_RE
                    .captures(token)
                    .and_then(|caps| caps.get(1))
                    .map_or(token, |base| base.as_str());
                TypeMatch {
                    start: m.start(),
                    end: m.end(),
                    mapped: self.map(base),
                }
            })
        })
    }
}

impl Default for TypeMap {
    fn default() -> Self {
        Self::new()
    }
}
