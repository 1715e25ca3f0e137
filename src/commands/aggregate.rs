//! Aggregate command implementation.
//!
//! The aggregate command:
//! 1. Scans the input directory for `.darshan` logs
//! 2. Reads every log into a job record
//! 3. Builds the combined metadata table
//! 4. Writes the metadata table and every record table as Parquet

use crate::aggregator::MetadataTable;
use crate::output::{write_archive, ArchiveSummary};
use crate::reader::{collect_logfiles, read_log, DarshanUtil, NamedJob, ReadOptions, TraceLibrary};
use crate::utils::config::{DEFAULT_DARSHAN_PARSER, DEFAULT_DXT_PARSER, DEFAULT_OUTPUT_DIR};
use anyhow::{Context, Result};
use log::{debug, info};
use std::path::PathBuf;
use std::time::Instant;

/// Arguments for the aggregate command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone)]
pub struct AggregateArgs {
    /// Directory containing the Darshan logs
    pub input_dir: PathBuf,

    /// Directory the Parquet files are written to
    pub output_dir: PathBuf,

    /// darshan-parser executable
    pub darshan_parser: String,

    /// darshan-dxt-parser executable
    pub dxt_parser: String,

    /// Skip the DXT modules entirely
    pub skip_dxt: bool,
}

impl Default for AggregateArgs {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::new(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            darshan_parser: DEFAULT_DARSHAN_PARSER.to_string(),
            dxt_parser: DEFAULT_DXT_PARSER.to_string(),
            skip_dxt: false,
        }
    }
}

/// Execute the aggregate command with the darshan-util tools
///
/// **Public** - main entry point called from main.rs
pub fn execute_aggregate(args: AggregateArgs) -> Result<ArchiveSummary> {
    let library = DarshanUtil::new(args.darshan_parser.clone(), args.dxt_parser.clone());
    aggregate_with(&library, &args)
}

/// Run the whole pipeline against any trace library
///
/// **Public** - lets callers (and tests) swap the library
///
/// # Errors
/// * Invalid input or output directory
/// * Any log that cannot be read or shaped
/// * Two logs with the same `<uid>_<jobid>` name
/// * Any write failure
pub fn aggregate_with<L: TraceLibrary>(library: &L, args: &AggregateArgs) -> Result<ArchiveSummary> {
    let start_time = Instant::now();

    info!("Aggregating darshan logs in {}", args.input_dir.display());

    // Step 1: Scan directory
    info!("Step 1/4: Collecting log files...");
    let files = collect_logfiles(&args.input_dir).context("Failed to collect log files")?;
    info!("Found {} log files", files.len());

    // Step 2: Read logs
    info!("Step 2/4: Reading logs...");
    let options = ReadOptions {
        skip_dxt: args.skip_dxt,
    };
    let mut jobs: Vec<NamedJob> = Vec::with_capacity(files.len());
    for file in &files {
        let path = args.input_dir.join(file);
        let record = read_log(library, &path, options)
            .with_context(|| format!("Failed to read darshan log {}", path.display()))?;

        let job = NamedJob::from(record);
        debug!(
            "{} -> {} (loaded: {})",
            file,
            job.name,
            job.record.loaded_modules().join(",")
        );
        jobs.push(job);
    }

    // Step 3: Build metadata table
    info!("Step 3/4: Collecting metadata...");
    let table = MetadataTable::from_jobs(&jobs).context("Failed to build metadata table")?;
    for row in table.rows() {
        debug!("{}", serde_json::to_string(row)?);
    }

    // Step 4: Write outputs
    info!("Step 4/4: Writing parquet files to {}...", args.output_dir.display());
    let summary = write_archive(&jobs, &table, &args.output_dir)
        .context("Failed to write parquet files")?;

    info!(
        "✓ Aggregated {} logs in {:.2}s",
        jobs.len(),
        start_time.elapsed().as_secs_f64()
    );

    Ok(summary)
}

/// Validate aggregate arguments
///
/// **Public** - can be called before execute_aggregate for early validation
pub fn validate_args(args: &AggregateArgs) -> Result<()> {
    if args.input_dir.as_os_str().is_empty() {
        anyhow::bail!("Input directory cannot be empty");
    }

    if args.output_dir.as_os_str().is_empty() {
        anyhow::bail!("Output directory cannot be empty");
    }

    if args.darshan_parser.trim().is_empty() {
        anyhow::bail!("darshan-parser path cannot be empty");
    }

    if !args.skip_dxt && args.dxt_parser.trim().is_empty() {
        anyhow::bail!("darshan-dxt-parser path cannot be empty (or pass --skip-dxt)");
    }

    Ok(())
}
