//! Darshan Agg CLI
//!
//! Aggregates a directory of Darshan logs into Parquet files:
//! one metadata table plus one file per module record table.

use anyhow::Result;
use clap::Parser;
use env_logger::Env;
use std::path::PathBuf;

use darshan_agg::commands::{execute_aggregate, validate_args, AggregateArgs};
use darshan_agg::utils::config::{DEFAULT_DARSHAN_PARSER, DEFAULT_DXT_PARSER, DEFAULT_OUTPUT_DIR};

/// Darshan Agg - aggregate Darshan logs into Parquet
#[derive(Parser, Debug)]
#[command(name = "darshan-agg")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Directory containing the darshan logs to parse and aggregate
    directory: PathBuf,

    /// Print additional debug messages during runtime
    #[arg(short, long, visible_alias = "verbose")]
    debug: bool,

    /// Where to write the parquet files
    #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
    output: PathBuf,

    /// darshan-parser executable
    #[arg(long, env = "DARSHAN_PARSER", default_value = DEFAULT_DARSHAN_PARSER)]
    darshan_parser: String,

    /// darshan-dxt-parser executable
    #[arg(long, env = "DARSHAN_DXT_PARSER", default_value = DEFAULT_DXT_PARSER)]
    dxt_parser: String,

    /// Do not load DXT modules (darshan-util crashes on them on some systems)
    #[arg(long)]
    skip_dxt: bool,
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    let args = AggregateArgs {
        input_dir: cli.directory,
        output_dir: cli.output,
        darshan_parser: cli.darshan_parser,
        dxt_parser: cli.dxt_parser,
        skip_dxt: cli.skip_dxt,
    };

    // Validate args first
    validate_args(&args)?;

    let summary = execute_aggregate(args)?;

    println!("✓ Metadata: {}", summary.metadata_path.display());
    println!("✓ Record files: {}", summary.record_files.len());

    Ok(())
}
