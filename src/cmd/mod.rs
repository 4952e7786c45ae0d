//! Command-line interface: argument parsing, log setup and dispatch to the
//! convert handler.

mod convert;

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mssql2pg")]
#[command(version)]
#[command(
    about = "Convert SQL Server (SSMS) scripts to PostgreSQL",
    long_about = "Convert a SQL Server script (CREATE TABLE and INSERT statements as \
                  exported by SSMS) into a PostgreSQL script.\n\n\
                  Input may be UTF-8, UTF-16 with a BOM, or windows-1251, and may be \
                  compressed (.gz, .bz2, .xz, .zst)."
)]
pub struct Cli {
    /// Input SQL Server script
    pub input: PathBuf,

    /// Output PostgreSQL script
    pub output: PathBuf,

    /// Convert without writing the output file
    #[arg(long)]
    pub dry_run: bool,

    /// Show progress during conversion
    #[arg(short, long)]
    pub progress: bool,

    /// Fail if any warnings are generated
    #[arg(long)]
    pub strict: bool,

    /// Print statistics as JSON to stdout
    #[arg(long)]
    pub json: bool,

    /// Verbose logging (debug level)
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "warn"
        } else {
            "info"
        }
    }
}

/// Install the stderr log subscriber. `RUST_LOG` overrides the CLI level.
fn init_tracing(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .ok();
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    init_tracing(cli.log_level());

    convert::run(
        cli.input,
        cli.output,
        cli.dry_run,
        cli.progress,
        cli.strict,
        cli.json,
    )
}
