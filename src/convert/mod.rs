//! Conversion of SQL Server scripts into PostgreSQL statements.
//!
//! The script is split into `GO` batches and `;`-terminated statements, each
//! statement is classified, and then:
//! - CREATE TABLE: types mapped, identity columns turned into serials,
//!   primary-key constraints collected, storage options dropped
//! - INSERT: one statement per row, literals rewritten (`N'..'`, `CAST`)
//! - USE / SET session commands: dropped
//! - anything else: passed through with normalized identifiers

mod create_table;
mod identifier;
mod insert;
mod types;
mod warnings;

pub use create_table::{convert_create_table, ColumnDefinition, TableDefinition};
pub use identifier::{normalize_brackets, normalize_identifier};
pub use insert::{convert_insert, InsertRecord, Literal, ValueTuple};
pub use types::{TypeMap, TypeMatch, TYPE_MAPPING};
pub use warnings::{print_warning_summary, ConvertWarning, WarningCollector};

use crate::input::read_sql_file;
use crate::parser::{split_batches, split_statements, strip_leading_comments, StatementKind};
use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::{debug, info};

/// Configuration for a conversion run
#[derive(Debug, Default)]
pub struct ConvertConfig {
    /// Input SQL Server script (optionally compressed)
    pub input: PathBuf,
    /// Output PostgreSQL script
    pub output: PathBuf,
    /// Convert without writing output
    pub dry_run: bool,
    /// Show a spinner while converting
    pub progress: bool,
}

/// Statistics from a conversion run
#[derive(Debug, Default, Serialize)]
pub struct ConvertStats {
    /// Encoding the input was decoded with
    pub encoding: String,
    pub batches: u64,
    /// Total statements processed
    pub statements_processed: u64,
    /// CREATE TABLE / INSERT statements rewritten
    pub statements_converted: u64,
    /// Other statements passed through with normalized identifiers
    pub statements_passed_through: u64,
    /// Session commands and statements that produced no output
    pub statements_skipped: u64,
    /// Statements written to the output
    pub statements_emitted: u64,
    /// Total warnings, including ones not retained in `warnings`
    pub warning_count: usize,
    pub warnings: Vec<ConvertWarning>,
}

impl ConvertStats {
    fn record(&mut self, converted: &Converted) {
        match converted {
            Converted::Statements(stmts) => {
                self.statements_converted += 1;
                self.statements_emitted += stmts.len() as u64;
            }
            Converted::Passthrough(_) => {
                self.statements_passed_through += 1;
                self.statements_emitted += 1;
            }
            Converted::Dropped => self.statements_skipped += 1,
        }
    }
}

/// Result of converting one raw statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Converted {
    /// Rewritten statements, each terminated with `;`
    Statements(Vec<String>),
    /// The statement emitted without structural rewriting
    Passthrough(String),
    /// Nothing to emit
    Dropped,
}

impl Converted {
    /// Output block for this statement, if any
    pub fn into_block(self) -> Option<String> {
        match self {
            Converted::Statements(stmts) => Some(stmts.join("\n")),
            Converted::Passthrough(stmt) => Some(stmt),
            Converted::Dropped => None,
        }
    }
}

/// Statement text with exactly one trailing `;`
pub fn terminated(stmt: &str) -> String {
    let mut out = stmt.trim().trim_end_matches(';').trim_end().to_string();
    out.push(';');
    out
}

/// Converts SQL Server statements to PostgreSQL
#[derive(Debug, Default)]
pub struct Converter {
    types: TypeMap,
    warnings: WarningCollector,
}

impl Converter {
    pub fn new() -> Self {
        Self {
            types: TypeMap::new(),
            warnings: WarningCollector::new(),
        }
    }

    /// Convert a single raw statement (no `GO` separators, no `;` splitting).
    pub fn convert_statement(&mut self, stmt: &str) -> Converted {
        let stmt = strip_leading_comments(stmt);
        if stmt.is_empty() {
            return Converted::Dropped;
        }

        let kind = StatementKind::classify(stmt);
        debug!(%kind, "converting statement");

        match kind {
            StatementKind::CreateTable => {
                convert_create_table(stmt, &self.types, &mut self.warnings)
            }
            StatementKind::Insert => convert_insert(stmt, &self.types, &mut self.warnings),
            StatementKind::UseDatabase | StatementKind::SessionOption => {
                debug!("dropped session command: {}", warnings::preview(stmt));
                Converted::Dropped
            }
            StatementKind::Other => Converted::Passthrough(terminated(&normalize_identifier(stmt))),
        }
    }

    /// Convert a whole script into output blocks, one per emitting statement.
    pub fn convert_script(&mut self, script: &str, stats: &mut ConvertStats) -> Vec<String> {
        self.convert_script_with(script, stats, |_| {})
    }

    /// Like [`Converter::convert_script`], calling `on_statement` with the
    /// running statement count after each statement.
    pub fn convert_script_with<F>(
        &mut self,
        script: &str,
        stats: &mut ConvertStats,
        mut on_statement: F,
    ) -> Vec<String>
    where
        F: FnMut(u64),
    {
        let mut blocks = Vec::new();

        for batch in split_batches(script) {
            stats.batches += 1;
            for stmt in split_statements(batch) {
                stats.statements_processed += 1;
                let converted = self.convert_statement(stmt);
                stats.record(&converted);
                blocks.extend(converted.into_block());
                on_statement(stats.statements_processed);
            }
        }

        stats.warning_count = self.warnings.count();
        blocks
    }

    /// Get collected warnings
    pub fn warnings(&self) -> &[ConvertWarning] {
        self.warnings.warnings()
    }

    /// Take collected warnings, leaving the converter's collector empty
    pub fn take_warnings(&mut self) -> Vec<ConvertWarning> {
        self.warnings.take()
    }
}

/// Run a conversion: read, convert, write.
pub fn run(config: ConvertConfig) -> anyhow::Result<ConvertStats> {
    info!("Reading file {}", config.input.display());
    let source = read_sql_file(&config.input)?;
    info!("Decoded input as {}", source.encoding);

    let mut stats = ConvertStats {
        encoding: source.encoding.to_string(),
        ..Default::default()
    };

    let progress_bar = if config.progress {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .context("invalid progress template")?,
        );
        pb.set_message("Converting...");
        Some(pb)
    } else {
        None
    };

    let mut converter = Converter::new();
    let blocks = converter.convert_script_with(&source.text, &mut stats, |processed| {
        if let Some(ref pb) = progress_bar {
            if processed % 1000 == 0 {
                pb.set_message(format!("Processed {} statements...", processed));
            }
        }
    });

    if let Some(pb) = progress_bar {
        pb.finish_with_message(format!("Converted {} statements", stats.statements_processed));
    }

    if config.dry_run {
        info!("Dry run, not writing {}", config.output.display());
    } else {
        info!("Writing output to {}", config.output.display());
        write_blocks(&config.output, &blocks)?;
    }

    stats.warnings = converter.take_warnings();
    info!(
        statements = stats.statements_processed,
        emitted = stats.statements_emitted,
        warnings = stats.warning_count,
        "Conversion completed successfully"
    );

    Ok(stats)
}

/// Write each block followed by a blank line.
fn write_blocks(path: &std::path::Path, blocks: &[String]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let file = File::create(path)
        .with_context(|| format!("Failed to create output file {}", path.display()))?;
    let mut writer = BufWriter::with_capacity(256 * 1024, file);
    for block in blocks {
        writer.write_all(block.as_bytes())?;
        writer.write_all(b"\n\n")?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write output file {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminated() {
        assert_eq!(terminated("DROP TABLE t;;  "), "DROP TABLE t;");
        assert_eq!(terminated(" DROP TABLE t"), "DROP TABLE t;");
    }

    #[test]
    fn test_session_commands_dropped() {
        let mut converter = Converter::new();
        assert_eq!(converter.convert_statement("SET ANSI_NULLS ON"), Converted::Dropped);
        assert_eq!(converter.convert_statement("USE [Shop]"), Converted::Dropped);
        assert_eq!(converter.convert_statement("-- just a comment"), Converted::Dropped);
    }

    #[test]
    fn test_other_statement_normalized() {
        let mut converter = Converter::new();
        assert_eq!(
            converter.convert_statement("ALTER TABLE [dbo].[Users] ADD [Age] INT;"),
            Converted::Passthrough("alter table users add age int;".to_string())
        );
    }

    #[test]
    fn test_stats_counts() {
        let mut converter = Converter::new();
        let mut stats = ConvertStats::default();
        let script = "SET NOCOUNT ON\nGO\nCREATE TABLE [t] ([a] INT)\nGO\n\
                      INSERT [t] ([a]) VALUES (1), (2)\nGO\nDROP TABLE [x]\nGO\n";
        let blocks = converter.convert_script(script, &mut stats);
        assert_eq!(blocks.len(), 3);
        assert_eq!(stats.batches, 4);
        assert_eq!(stats.statements_processed, 4);
        assert_eq!(stats.statements_converted, 2);
        assert_eq!(stats.statements_passed_through, 1);
        assert_eq!(stats.statements_skipped, 1);
        assert_eq!(stats.statements_emitted, 4);
    }
}
