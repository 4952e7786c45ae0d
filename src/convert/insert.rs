//! INSERT conversion.
//!
//! A single raw statement may hold several INSERTs (SSMS scripts separate
//! them with newlines rather than `;`). Each physical INSERT is parsed into an
//! [`InsertRecord`]: normalized table and column names plus one or more value
//! tuples, with T-SQL literals rewritten for PostgreSQL. Every output row has
//! exactly one value per column unless a malformed CAST was dropped from it.

use super::identifier::normalize_identifier;
use super::types::TypeMap;
use super::warnings::{ConvertWarning, WarningCollector};
use super::{terminated, Converted};
use crate::parser::Scanner;
use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

static INSERT_LINE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^\s*INSERT\s+").unwrap());

/// `SET IDENTITY_INSERT [dbo].[Users] ON`
static IDENTITY_INSERT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*SET\s+IDENTITY_INSERT\b").unwrap());

static TABLE_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)INSERT\s+(?:INTO\s+)?((?:\[[^\]]+\]|[\w#]+)(?:\s*\.\s*(?:\[[^\]]+\]|[\w#]+))*)\s*\(",
    )
    .unwrap()
});

/// Column list up to the VALUES keyword, starting at its opening parenthesis
static COLUMNS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)^\((.*?)\)\s*VALUES\b").unwrap());

static NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?\d+(?:\.\d+)?$").unwrap());

static CAST_PREFIX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^CAST\s*\(").unwrap());

/// A single value of an INSERT row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Null,
    Number(String),
    /// Quoted text including its quotes, without any `N` prefix
    StringLiteral(String),
    /// `CAST(value AS type)`, rendered as `value::type`
    CastExpression {
        value: Box<Literal>,
        target_type: String,
    },
    /// Anything else, passed through unchanged
    Raw(String),
}

impl Literal {
    /// Convert one value field.
    ///
    /// Returns `None` for a CAST expression that does not have the
    /// `CAST(value AS type)` shape.
    pub fn parse(field: &str, types: &TypeMap) -> Option<Self> {
        let field = field.trim();

        if field.eq_ignore_ascii_case("NULL") {
            return Some(Literal::Null);
        }
        if NUMBER_RE.is_match(field) {
            return Some(Literal::Number(field.to_string()));
        }
        if field.starts_with("N'") || field.starts_with("n'") {
            return Some(Literal::StringLiteral(field[1..].to_string()));
        }
        if field.starts_with('\'') {
            return Some(Literal::StringLiteral(field.to_string()));
        }
        if let Some(prefix) = CAST_PREFIX_RE.find(field) {
            return Self::parse_cast(field, prefix.end(), types);
        }
        Some(Literal::Raw(field.to_string()))
    }

    fn parse_cast(field: &str, inner_start: usize, types: &TypeMap) -> Option<Self> {
        let scanner = Scanner::nested();

        // The CAST parenthesis must close at the very end of the field
        let inner = scanner
            .groups(field)
            .into_iter()
            .next()
            .filter(|r| r.start == inner_start && r.end + 1 == field.len())
            .map(|r| &field[r])?;

        let as_pos = scanner.find_word(inner, "AS")?;
        let value = inner[..as_pos].trim();
        let target_type = inner[as_pos + 2..].trim();
        if value.is_empty() || target_type.is_empty() {
            return None;
        }

        Some(Literal::CastExpression {
            value: Box::new(Self::parse(value, types)?),
            target_type: types.map(target_type),
        })
    }
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::Null => write!(f, "NULL"),
            Literal::Number(text) | Literal::StringLiteral(text) | Literal::Raw(text) => {
                write!(f, "{}", text)
            }
            Literal::CastExpression { value, target_type } => {
                write!(f, "{}::{}", value, target_type)
            }
        }
    }
}

/// One row of values
pub type ValueTuple = Vec<Literal>;

/// A parsed and converted INSERT statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertRecord {
    pub table: String,
    pub columns: Vec<String>,
    pub tuples: Vec<ValueTuple>,
}

impl InsertRecord {
    /// Parse one physical INSERT statement.
    ///
    /// Count mismatches are repaired and malformed CASTs dropped, with
    /// warnings recorded. An `Err` means the statement could not be parsed.
    pub fn parse(
        stmt: &str,
        types: &TypeMap,
        warnings: &mut WarningCollector,
    ) -> Result<Self, ConvertWarning> {
        let name_match = TABLE_NAME_RE
            .captures(stmt)
            .ok_or_else(|| ConvertWarning::unparsed("table name in INSERT", stmt))?;
        let table = normalize_identifier(&name_match[1]);

        let open = name_match.get(0).map(|m| m.end() - 1).unwrap_or(0);
        let rest = &stmt[open..];
        let columns_match = COLUMNS_RE
            .captures(rest)
            .ok_or_else(|| ConvertWarning::unparsed("columns in INSERT", stmt))?;
        let columns: Vec<String> = columns_match[1]
            .split(',')
            .map(normalize_identifier)
            .filter(|col| !col.is_empty())
            .collect();

        let after_values = columns_match.get(0).map(|m| m.end()).unwrap_or(0);
        let tail = &rest[after_values..];
        let groups = value_groups(tail);
        if groups.is_empty() {
            return Err(ConvertWarning::unparsed("VALUES in INSERT", stmt));
        }

        let mut record = InsertRecord {
            table,
            columns,
            tuples: Vec::new(),
        };

        if groups.len() > 1 {
            for group in &groups {
                let fields = Scanner::nested().split(&tail[group.clone()], ',');
                let tuple = record.convert_fields(&fields, types, warnings);
                if tuple.len() == record.columns.len() {
                    record.tuples.push(tuple);
                } else {
                    tracing::debug!(
                        table = %record.table,
                        expected = record.columns.len(),
                        found = tuple.len(),
                        "dropped row with wrong value count"
                    );
                }
            }
            if !record.tuples.is_empty() {
                return Ok(record);
            }
        }

        let fields = Scanner::nested().split(&tail[groups[0].clone()], ',');
        let fields = record.repair_count(fields, warnings);
        let tuple = record.convert_fields(&fields, types, warnings);
        record.tuples.push(tuple);
        Ok(record)
    }

    /// Pad with `NULL` or truncate so there is one field per column.
    fn repair_count<'a>(
        &self,
        mut fields: Vec<&'a str>,
        warnings: &mut WarningCollector,
    ) -> Vec<&'a str> {
        if fields.len() != self.columns.len() {
            warnings.add(ConvertWarning::CountMismatch {
                table: self.table.clone(),
                columns: self.columns.len(),
                values: fields.len(),
            });
            fields.resize(self.columns.len(), "NULL");
        }
        fields
    }

    fn convert_fields(
        &self,
        fields: &[&str],
        types: &TypeMap,
        warnings: &mut WarningCollector,
    ) -> ValueTuple {
        fields
            .iter()
            .filter_map(|field| {
                let literal = Literal::parse(field, types);
                if literal.is_none() {
                    warnings.add(ConvertWarning::MalformedExpression {
                        table: self.table.clone(),
                        expression: field.to_string(),
                    });
                }
                literal
            })
            .collect()
    }

    /// One PostgreSQL INSERT per tuple.
    pub fn to_sql(&self) -> Vec<String> {
        let columns = self.columns.join(", ");
        self.tuples
            .iter()
            .map(|tuple| {
                let values: Vec<String> = tuple.iter().map(|v| v.to_string()).collect();
                format!(
                    "INSERT INTO {} ({}) VALUES ({});",
                    self.table,
                    columns,
                    values.join(", ")
                )
            })
            .collect()
    }
}

/// Contents of the parenthesized tuples following a VALUES keyword.
///
/// Tuples may be separated by commas (`VALUES (1), (2)`) or by repeated
/// VALUES keywords (`VALUES (1) VALUES (2)`). Anything else ends the list.
fn value_groups(tail: &str) -> Vec<Range<usize>> {
    let mut groups = Vec::new();
    let mut last_end = 0;

    for group in Scanner::nested().groups(tail) {
        // Gap between the previous closing paren (or VALUES) and this opening paren
        let gap = tail[last_end..group.start - 1].trim();
        let gap = if groups.is_empty() {
            gap
        } else {
            gap.strip_prefix(',').unwrap_or(gap).trim()
        };
        if !(gap.is_empty() || (!groups.is_empty() && gap.eq_ignore_ascii_case("VALUES"))) {
            break;
        }
        last_end = group.end + 1;
        groups.push(group);
    }
    groups
}

/// Split a raw statement into physical INSERT statements, one per line that
/// starts with `INSERT`; following lines belong to the most recent INSERT.
///
/// `SET IDENTITY_INSERT` lines are dropped and end the current INSERT. Lines
/// before the first INSERT are ignored.
fn split_inserts(stmt: &str) -> Vec<String> {
    let mut inserts = Vec::new();
    let mut current: Option<String> = None;

    for line in stmt.lines() {
        if IDENTITY_INSERT_RE.is_match(line) {
            inserts.extend(current.take());
        } else if INSERT_LINE_RE.is_match(line) {
            inserts.extend(current.replace(line.to_string()));
        } else if let Some(cur) = current.as_mut() {
            cur.push('\n');
            cur.push_str(line);
        }
    }
    inserts.extend(current);
    inserts
}

/// Convert a raw statement containing one or more INSERTs.
///
/// A statement that only toggles `IDENTITY_INSERT` is dropped. Physical
/// INSERTs that cannot be parsed are skipped with a warning.
pub fn convert_insert(stmt: &str, types: &TypeMap, warnings: &mut WarningCollector) -> Converted {
    let inserts = split_inserts(stmt);

    if inserts.is_empty() {
        if stmt.lines().any(|line| IDENTITY_INSERT_RE.is_match(line)) {
            return Converted::Dropped;
        }
        warnings.add(ConvertWarning::unparsed("INSERT statements", stmt));
        return Converted::Passthrough(terminated(&normalize_identifier(stmt)));
    }

    let mut statements = Vec::new();
    for insert in &inserts {
        match InsertRecord::parse(insert, types, warnings) {
            Ok(record) => statements.extend(record.to_sql()),
            Err(warning) => warnings.add(warning),
        }
    }

    if statements.is_empty() {
        Converted::Dropped
    } else {
        Converted::Statements(statements)
    }
}
