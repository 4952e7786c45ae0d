//! Convert command CLI handler.

use crate::convert::{self, ConvertConfig, ConvertStats};
use std::path::PathBuf;

pub fn run(
    input: PathBuf,
    output: PathBuf,
    dry_run: bool,
    progress: bool,
    strict: bool,
    json: bool,
) -> anyhow::Result<()> {
    let config = ConvertConfig {
        input,
        output: output.clone(),
        dry_run,
        progress,
    };

    let stats = convert::run(config)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print_stats(&stats, &output, dry_run);
    }

    if strict && stats.warning_count > 0 {
        anyhow::bail!("Strict mode: {} warnings generated", stats.warning_count);
    }

    Ok(())
}

fn print_stats(stats: &ConvertStats, output: &std::path::Path, dry_run: bool) {
    eprintln!();
    eprintln!("Conversion Statistics:");
    eprintln!("  Input encoding: {}", stats.encoding);
    eprintln!("  Batches: {}", stats.batches);
    eprintln!("  Statements processed: {}", stats.statements_processed);
    eprintln!("  Statements converted: {}", stats.statements_converted);
    eprintln!("  Statements passed through: {}", stats.statements_passed_through);
    eprintln!("  Statements skipped: {}", stats.statements_skipped);
    eprintln!("  Statements written: {}", stats.statements_emitted);

    convert::print_warning_summary(&stats.warnings, stats.warning_count);

    eprintln!();
    if dry_run {
        eprintln!("(Dry run - no output written)");
    } else {
        eprintln!("Output: {}", output.display());
    }
}
