//! Warning system for the converter.
//!
//! Converter-level problems never abort a run. Each one degrades to
//! best-effort output and is recorded here, and logged when it is recorded.

use serde::Serialize;

/// Number of characters of a statement kept in warning previews
const PREVIEW_CHARS: usize = 100;

/// Non-fatal problems found while converting a statement
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConvertWarning {
    /// An expected part of the statement (table name, column list, VALUES
    /// body) was not found; the statement was passed through or skipped
    UnparsedStatement {
        reason: String,
        statement_preview: String,
    },
    /// Column and value counts disagree; values were padded or truncated
    CountMismatch {
        table: String,
        columns: usize,
        values: usize,
    },
    /// A CAST-like value did not have the `CAST(value AS type)` shape and was
    /// left out of the row
    MalformedExpression { table: String, expression: String },
}

impl ConvertWarning {
    pub fn unparsed(reason: &str, stmt: &str) -> Self {
        ConvertWarning::UnparsedStatement {
            reason: reason.to_string(),
            statement_preview: preview(stmt),
        }
    }
}

/// First characters of a statement on a single line
pub fn preview(stmt: &str) -> String {
    let flat: String = stmt
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if flat.chars().count() > PREVIEW_CHARS {
        let mut cut: String = flat.chars().take(PREVIEW_CHARS).collect();
        cut.push_str("...");
        cut
    } else {
        flat
    }
}

impl std::fmt::Display for ConvertWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConvertWarning::UnparsedStatement {
                reason,
                statement_preview,
            } => {
                write!(f, "Could not parse {}: {}", reason, statement_preview)
            }
            ConvertWarning::CountMismatch {
                table,
                columns,
                values,
            } => {
                write!(
                    f,
                    "Column count ({}) does not match values count ({}) in table {}",
                    columns, values, table
                )
            }
            ConvertWarning::MalformedExpression { table, expression } => {
                write!(
                    f,
                    "Malformed expression dropped in table {}: {}",
                    table, expression
                )
            }
        }
    }
}

/// Collects warnings during conversion
#[derive(Debug)]
pub struct WarningCollector {
    warnings: Vec<ConvertWarning>,
    max_warnings: usize,
    total: usize,
}

impl Default for WarningCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl WarningCollector {
    pub fn new() -> Self {
        Self::with_limit(100)
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            warnings: Vec::new(),
            max_warnings: limit,
            total: 0,
        }
    }

    /// Record a warning and log it.
    ///
    /// Every warning is counted and logged; only the first `max_warnings`
    /// are retained.
    pub fn add(&mut self, warning: ConvertWarning) {
        tracing::warn!("{}", warning);
        self.total += 1;
        if self.warnings.len() < self.max_warnings {
            self.warnings.push(warning);
        }
    }

    /// Retained warnings, in the order they were recorded
    pub fn warnings(&self) -> &[ConvertWarning] {
        &self.warnings
    }

    pub fn has_warnings(&self) -> bool {
        self.total > 0
    }

    /// Total number of warnings recorded, including ones not retained
    pub fn count(&self) -> usize {
        self.total
    }

    /// Take the retained warnings, leaving the collector empty
    pub fn take(&mut self) -> Vec<ConvertWarning> {
        self.total = 0;
        std::mem::take(&mut self.warnings)
    }
}

/// Print retained warnings to stderr, noting how many were not retained.
pub fn print_warning_summary(warnings: &[ConvertWarning], total: usize) {
    if warnings.is_empty() {
        return;
    }

    eprintln!();
    eprintln!("Warnings ({}):", total);
    for warning in warnings {
        eprintln!("  ⚠ {}", warning);
    }

    if total > warnings.len() {
        eprintln!(
            "  ... ({} additional warnings truncated)",
            total - warnings.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_keeps_count() {
        let mut collector = WarningCollector::with_limit(2);
        for i in 0..5 {
            collector.add(ConvertWarning::CountMismatch {
                table: "t".to_string(),
                columns: 2,
                values: i,
            });
        }
        assert_eq!(collector.warnings().len(), 2);
        assert_eq!(collector.count(), 5);
    }

    #[test]
    fn test_preview_is_single_line_and_bounded() {
        let long = format!("INSERT INTO t\n  VALUES ({})", "1, ".repeat(100));
        let p = preview(&long);
        assert!(!p.contains('\n'));
        assert!(p.ends_with("..."));
        assert_eq!(p.chars().count(), PREVIEW_CHARS + 3);
    }
}
