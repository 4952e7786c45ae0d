//! CREATE TABLE conversion.
//!
//! Extracts the table name and the column list body, splits the body into
//! top-level definitions, converts column types and identity columns, collects
//! primary-key constraints into a trailing `PRIMARY KEY (...)` clause, and
//! drops storage options that have no PostgreSQL counterpart.

use super::identifier::{normalize_brackets, normalize_identifier};
use super::types::TypeMap;
use super::warnings::{ConvertWarning, WarningCollector};
use super::{terminated, Converted};
use crate::parser::Scanner;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static USE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^\s*USE\b").unwrap());

/// Table name (optionally schema-qualified and bracketed) right before the
/// opening parenthesis of the column list
static TABLE_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)CREATE\s+TABLE\s+((?:\[[^\]]+\]|[\w#]+)(?:\s*\.\s*(?:\[[^\]]+\]|[\w#]+))*)\s*\(")
        .unwrap()
});

/// Column list followed by a trailing storage clause:
/// `(...) ON [PRIMARY] TEXTIMAGE_ON [PRIMARY]`
static BODY_WITH_STORAGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?is)^\((.*)\)\s*ON\s*(?:\[[^\]]+\]|\w+)(?:\s*\w+_ON\s*(?:\[[^\]]+\]|\w+))*\s*$",
    )
    .unwrap()
});

/// Column list ending the statement
static BODY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)^\((.*)\)\s*$").unwrap());

/// `PRIMARY KEY CLUSTERED ([Id] ASC)`
static CLUSTERED_PK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)\bPRIMARY\s+KEY\s+CLUSTERED\s*\(([^)]*)\)").unwrap());

/// `CONSTRAINT [PK_Users] PRIMARY KEY ([Id])`
static CONSTRAINT_PK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)\bCONSTRAINT\b.*?\bPRIMARY\s+KEY\s*\(([^)]*)\)").unwrap()
});

/// Index/storage options: `WITH (PAD_INDEX = OFF, ...)`
static STORAGE_OPTION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bWITH\s*\(").unwrap());

/// Leading column name, bracketed, quoted or bare, and the rest of the definition
static COLUMN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)^(\[[^\]]+\]|"[^"]+"|\S+)\s*(.*)$"#).unwrap());

/// `INT IDENTITY(1,1)` or `NUMERIC(18, 0) IDENTITY(1,1)`; the integer or
/// zero-scale numeric type is absorbed into the serial type
static IDENTITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:\b(BIGINT|SMALLINT|INTEGER|INT|NUMERIC|DECIMAL)(?:\s*\(\s*\d+\s*(?:,\s*0\s*)?\))?\s+)?\bIDENTITY\s*\(\s*-?\d+\s*,\s*-?\d+\s*\)",
    )
    .unwrap()
});

/// Type signature at the start of a converted definition
static LEADING_TYPE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(\w+(?:\s+PRECISION)?(?:\s*\([^)]*\))?)").unwrap()
});

static SORT_ORDER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\s+(?:ASC|DESC)\s*$").unwrap());

/// One column of a CREATE TABLE statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    /// Definition text as it appeared in the source
    pub raw_text: String,
    pub normalized_name: String,
    /// Target type signature, e.g. `VARCHAR(50)` or `SERIAL`
    pub resolved_type: String,
    /// Converted text following the column name (type, nullability, defaults)
    pub definition: String,
}

impl ColumnDefinition {
    /// Convert a single column definition fragment.
    pub fn parse(raw: &str, types: &TypeMap) -> Option<Self> {
        let caps = COLUMN_RE.captures(raw.trim())?;
        let normalized_name = normalize_identifier(&caps[1]);
        let mut definition = normalize_brackets(&caps[2]);

        if let Some(m) = types.find_in(&definition) {
            definition.replace_range(m.start..m.end, &m.mapped);
        }

        definition = IDENTITY_RE
            .replace(&definition, |caps: &Captures| {
                match caps.get(1).map(|m| m.as_str().to_uppercase()).as_deref() {
                    Some("BIGINT" | "NUMERIC" | "DECIMAL") => "BIGSERIAL",
                    Some("SMALLINT") => "SMALLSERIAL",
                    _ => "SERIAL",
                }
            })
            .into_owned();

        let resolved_type = LEADING_TYPE_RE
            .captures(&definition)
            .map(|c| c[1].to_string())
            .unwrap_or_default();

        Some(Self {
            raw_text: raw.trim().to_string(),
            normalized_name,
            resolved_type,
            definition,
        })
    }
}

impl std::fmt::Display for ColumnDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.definition.is_empty() {
            write!(f, "{}", self.normalized_name)
        } else {
            write!(f, "{} {}", self.normalized_name, self.definition)
        }
    }
}

/// A top-level entry of the column list body
#[derive(Debug, Clone, PartialEq, Eq)]
enum Definition {
    PrimaryKey(Vec<String>),
    StorageOption,
    Column(ColumnDefinition),
}

impl Definition {
    fn classify(raw: &str, types: &TypeMap) -> Option<Self> {
        if let Some(caps) = CLUSTERED_PK_RE.captures(raw) {
            return Some(Definition::PrimaryKey(parse_key_columns(&caps[1])));
        }
        if let Some(caps) = CONSTRAINT_PK_RE.captures(raw) {
            return Some(Definition::PrimaryKey(parse_key_columns(&caps[1])));
        }
        if STORAGE_OPTION_RE.is_match(raw) {
            return Some(Definition::StorageOption);
        }
        ColumnDefinition::parse(raw, types).map(Definition::Column)
    }
}

/// `[Id] ASC, [Code] DESC` → `["id", "code"]`
fn parse_key_columns(list: &str) -> Vec<String> {
    list.split(',')
        .map(|col| SORT_ORDER_RE.replace(col.trim(), ""))
        .map(|col| normalize_identifier(&col))
        .filter(|col| !col.is_empty())
        .collect()
}

/// A parsed and converted CREATE TABLE statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDefinition {
    pub name: String,
    pub columns: Vec<ColumnDefinition>,
    pub primary_key: Option<Vec<String>>,
}

impl TableDefinition {
    pub fn parse(stmt: &str, types: &TypeMap) -> Result<Self, ConvertWarning> {
        let stmt = stmt.trim().trim_end_matches(';').trim_end();

        let name_match = TABLE_NAME_RE
            .captures(stmt)
            .ok_or_else(|| ConvertWarning::unparsed("table name in CREATE TABLE", stmt))?;
        let name = normalize_identifier(&name_match[1]);

        // Start at the opening parenthesis that ended the name match
        let open = name_match.get(0).map(|m| m.end() - 1).unwrap_or(0);
        let rest = &stmt[open..];
        let body = BODY_WITH_STORAGE_RE
            .captures(rest)
            .or_else(|| BODY_RE.captures(rest))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
            .ok_or_else(|| ConvertWarning::unparsed("column list in CREATE TABLE", stmt))?;

        let mut columns = Vec::new();
        let mut primary_key: Vec<String> = Vec::new();

        for raw in Scanner::nested().split(body, ',') {
            match Definition::classify(raw, types) {
                Some(Definition::PrimaryKey(cols)) => {
                    for col in cols {
                        if !primary_key.contains(&col) {
                            primary_key.push(col);
                        }
                    }
                }
                Some(Definition::StorageOption) => {
                    tracing::debug!(table = %name, "dropped storage option: {}", raw);
                }
                Some(Definition::Column(column)) => columns.push(column),
                None => {}
            }
        }

        Ok(Self {
            name,
            columns,
            primary_key: if primary_key.is_empty() {
                None
            } else {
                Some(primary_key)
            },
        })
    }

    /// Render as a PostgreSQL statement, one definition per line.
    pub fn to_sql(&self) -> String {
        let mut parts: Vec<String> = self.columns.iter().map(|c| c.to_string()).collect();
        if let Some(pk) = &self.primary_key {
            parts.push(format!("PRIMARY KEY ({})", pk.join(", ")));
        }
        format!("CREATE TABLE {} (\n    {}\n);", self.name, parts.join(",\n    "))
    }
}

/// Convert a CREATE TABLE statement.
///
/// Statements starting with `USE` are dropped. If the table name or column
/// list cannot be found, a warning is recorded and the statement is passed
/// through unchanged.
pub fn convert_create_table(
    stmt: &str,
    types: &TypeMap,
    warnings: &mut WarningCollector,
) -> Converted {
    if USE_RE.is_match(stmt) {
        return Converted::Dropped;
    }

    match TableDefinition::parse(stmt, types) {
        Ok(table) => {
            tracing::debug!(
                table = %table.name,
                columns = table.columns.len(),
                "converted CREATE TABLE"
            );
            Converted::Statements(vec![table.to_sql()])
        }
        Err(warning) => {
            warnings.add(warning);
            Converted::Passthrough(terminated(stmt))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convert(stmt: &str) -> (Converted, WarningCollector) {
        let types = TypeMap::new();
        let mut warnings = WarningCollector::new();
        let out = convert_create_table(stmt, &types, &mut warnings);
        (out, warnings)
    }

    #[test]
    fn test_users_table() {
        let (out, warnings) = convert(
            "CREATE TABLE [dbo].[Users] ( [Id] INT IDENTITY(1,1), [Name] NVARCHAR(50), \
             PRIMARY KEY CLUSTERED ([Id] ASC) ) ON [PRIMARY];",
        );
        assert_eq!(
            out,
            Converted::Statements(vec![
                "CREATE TABLE users (\n    id SERIAL,\n    name VARCHAR(50),\n    PRIMARY KEY (id)\n);"
                    .to_string()
            ])
        );
        assert!(!warnings.has_warnings());
    }

    #[test]
    fn test_column_fields() {
        let types = TypeMap::new();
        let col = ColumnDefinition::parse("[Price] [money] NOT NULL", &types).unwrap();
        assert_eq!(col.raw_text, "[Price] [money] NOT NULL");
        assert_eq!(col.normalized_name, "price");
        assert_eq!(col.resolved_type, "DECIMAL(19,4)");
        assert_eq!(col.to_string(), "price DECIMAL(19,4) NOT NULL");
    }

    #[test]
    fn test_column_named_like_a_type() {
        let types = TypeMap::new();
        let col = ColumnDefinition::parse("[Image] [image] NULL", &types).unwrap();
        assert_eq!(col.to_string(), "image BYTEA NULL");
    }

    #[test]
    fn test_identity_variants() {
        let types = TypeMap::new();
        let big = ColumnDefinition::parse("[Id] [bigint] IDENTITY(1,1) NOT NULL", &types).unwrap();
        assert_eq!(big.to_string(), "id BIGSERIAL NOT NULL");
        assert_eq!(big.resolved_type, "BIGSERIAL");

        let tiny = ColumnDefinition::parse("[Id] TINYINT IDENTITY(1, 1)", &types).unwrap();
        assert_eq!(tiny.to_string(), "id SMALLSERIAL");
    }

    #[test]
    fn test_numeric_identity_absorbed() {
        let types = TypeMap::new();
        let col =
            ColumnDefinition::parse("[Id] [numeric](18, 0) IDENTITY(1,1) NOT NULL", &types).unwrap();
        assert_eq!(col.to_string(), "id BIGSERIAL NOT NULL");

        let col = ColumnDefinition::parse("[Id] DECIMAL(10) IDENTITY(1, 1)", &types).unwrap();
        assert_eq!(col.to_string(), "id BIGSERIAL");
    }

    #[test]
    fn test_composite_key() {
        let key = parse_key_columns("\n\t[OrderId] ASC,\n\t[LineNo] DESC\n");
        assert_eq!(key, vec!["orderid", "lineno"]);
    }

    #[test]
    fn test_missing_name_passes_through() {
        let (out, warnings) = convert("CREATE TABLE");
        assert_eq!(out, Converted::Passthrough("CREATE TABLE;".to_string()));
        assert_eq!(warnings.count(), 1);
    }

    #[test]
    fn test_use_prefix_is_dropped() {
        let (out, _) = convert("USE [Shop]\nCREATE TABLE [t] ([id] INT)");
        assert_eq!(out, Converted::Dropped);
    }
}
