//! Reading Darshan logs.
//!
//! This module handles:
//! - The trace library boundary (open / modules / load / records)
//! - The darshan-util and in-memory library implementations
//! - Scanning a directory for logs
//! - Turning one opened log into a `JobRecord`

pub mod darshan_util;
pub mod library;
pub mod memory;
pub mod scan;
pub mod schema;

// Re-export main types
pub use darshan_util::DarshanUtil;
pub use library::{Loader, TraceLibrary, TraceReport};
pub use memory::{MemoryLibrary, MemoryReport};
pub use scan::collect_logfiles;
pub use schema::{JobMetadata, ModuleRecords};

use crate::aggregator::{CounterCollection, DxtCollection, ModuleCollection};
use crate::utils::config::KNOWN_MODULES;
use crate::utils::error::{AggregateError, ReadError};
use log::{debug, info, warn};
use std::path::Path;

/// Options controlling which modules get loaded
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOptions {
    /// Skip the DXT tracing modules (known to crash darshan-util on some systems)
    pub skip_dxt: bool,
}

/// Everything kept from one log after it has been closed
#[derive(Debug, Clone)]
pub struct JobRecord {
    metadata: JobMetadata,
    modules: Vec<String>,
    collections: Vec<ModuleCollection>,
}

impl JobRecord {
    pub fn metadata(&self) -> &JobMetadata {
        &self.metadata
    }

    /// Every module found in the log
    pub fn modules(&self) -> &[String] {
        &self.modules
    }

    /// Modules that made it into a collection, in load order
    pub fn loaded_modules(&self) -> Vec<&str> {
        self.collections.iter().map(ModuleCollection::module).collect()
    }

    pub fn collections(&self) -> &[ModuleCollection] {
        &self.collections
    }

    pub fn collection(&self, module: &str) -> Option<&ModuleCollection> {
        self.collections.iter().find(|c| c.module() == module)
    }

    /// `<uid>_<jobid>`, the name used for the job's row and file prefix
    pub fn generate_name(&self) -> String {
        format!("{}_{}", self.metadata.job.uid, self.metadata.job.jobid)
    }
}

/// A job record together with its generated name
#[derive(Debug, Clone)]
pub struct NamedJob {
    pub name: String,
    pub record: JobRecord,
}

impl From<JobRecord> for NamedJob {
    fn from(record: JobRecord) -> Self {
        Self {
            name: record.generate_name(),
            record,
        }
    }
}

/// Read one Darshan log into a `JobRecord`
///
/// **Public** - main entry point for reading
///
/// Opens the log, loads every known module through its own loader and
/// shapes the records into collections. HEATMAP is never loaded. MPI-IO
/// and DXT_MPIIO records are printed for inspection but not kept, and a
/// failure to load them only logs a warning.
/// The report is closed before returning.
///
/// # Errors
/// * `ReadError::InvalidPath` - path is missing or not a regular file
/// * `ReadError::Aggregate` - records could not be shaped (e.g. repeated DXT id)
/// * any error raised by the library while opening or loading
pub fn read_log<L: TraceLibrary>(
    library: &L,
    path: impl AsRef<Path>,
    options: ReadOptions,
) -> Result<JobRecord, ReadError> {
    let path = path.as_ref();

    debug!("Reading darshan log {}", path.display());

    if !path.exists() {
        return Err(ReadError::InvalidPath {
            path: path.to_path_buf(),
            reason: "path does not exist".to_string(),
        });
    }

    if !path.is_file() {
        return Err(ReadError::InvalidPath {
            path: path.to_path_buf(),
            reason: "path is not a regular file".to_string(),
        });
    }

    let mut report = library.open(path)?;
    let metadata = report.metadata().clone();
    let modules = report.modules().to_vec();

    debug!("Found modules: {}", modules.join(","));

    if let Some(start) = metadata.job.start_datetime() {
        debug!(
            "Job {} (uid {}) started {} on {} processes",
            metadata.job.jobid, metadata.job.uid, start, metadata.job.nprocs
        );
    }

    for module in &modules {
        if !KNOWN_MODULES.contains(&module.as_str()) {
            warn!("Unexpected module found in {}: {}", path.display(), module);
        }
    }

    let has = |name: &str| modules.iter().any(|m| m == name);
    let mut collections = Vec::new();

    if has("POSIX") {
        let records = load_counters(&mut report, "POSIX", Loader::Counters)?;
        collections.push(ModuleCollection::Counters(
            CounterCollection::with_fcounters("POSIX", records)?,
        ));
    }

    if has("LUSTRE") {
        let records = load_counters(&mut report, "LUSTRE", Loader::Lustre)?;
        collections.push(ModuleCollection::Counters(CounterCollection::counters(
            "LUSTRE", records,
        )));
    }

    if has("STDIO") {
        let records = load_counters(&mut report, "STDIO", Loader::Counters)?;
        collections.push(ModuleCollection::Counters(
            CounterCollection::with_fcounters("STDIO", records)?,
        ));
    }

    if has("DXT_POSIX") {
        if options.skip_dxt {
            info!("Skipping DXT_POSIX in {} (DXT loading disabled)", path.display());
        } else {
            report.load("DXT_POSIX", Loader::Dxt)?;
            let records = match report.records("DXT_POSIX") {
                Some(ModuleRecords::Dxt(records)) => records.as_slice(),
                Some(ModuleRecords::Counters(_)) => {
                    return Err(unexpected_shape("DXT_POSIX", "DXT records"))
                }
                None => &[][..],
            };
            collections.push(ModuleCollection::Dxt(DxtCollection::from_records(
                "DXT_POSIX", records,
            )?));
        }
    }

    // darshan-util cannot decode HEATMAP records
    if has("HEATMAP") {
        debug!("Skipping HEATMAP in {} (unsupported)", path.display());
    }

    if has("MPI-IO") {
        inspect(&mut report, path, "MPI-IO", Loader::Counters);
    }

    if has("DXT_MPIIO") {
        if options.skip_dxt {
            info!("Skipping DXT_MPIIO in {} (DXT loading disabled)", path.display());
        } else {
            inspect(&mut report, path, "DXT_MPIIO", Loader::Dxt);
        }
    }

    drop(report);

    let record = JobRecord {
        metadata,
        modules,
        collections,
    };

    debug!("Loaded modules: {}", record.loaded_modules().join(","));

    Ok(record)
}

/// Load a counter module and borrow its records
///
/// **Private** - internal helper for read_log
fn load_counters<'a, R: TraceReport>(
    report: &'a mut R,
    module: &str,
    loader: Loader,
) -> Result<&'a [schema::CounterRecord], ReadError> {
    report.load(module, loader)?;

    match report.records(module) {
        Some(ModuleRecords::Counters(records)) => Ok(records.as_slice()),
        Some(ModuleRecords::Dxt(_)) => Err(unexpected_shape(module, "counter records")),
        None => Ok(&[]),
    }
}

fn unexpected_shape(module: &str, expected: &'static str) -> ReadError {
    ReadError::Aggregate(AggregateError::UnexpectedRecordKind {
        module: module.to_string(),
        expected,
    })
}

/// Load a diagnostic-only module and print it
///
/// **Private** - a failure here is logged and never fails the log
fn inspect<R: TraceReport>(report: &mut R, path: &Path, module: &str, loader: Loader) {
    match report.load(module, loader) {
        Ok(()) => print_inspection(module, report.records(module)),
        Err(e) => warn!("Could not inspect {} in {}: {}", module, path.display(), e),
    }
}

/// Print a diagnostic-only module to stdout
///
/// **Private** - MPI-IO modules are inspected, never exported
fn print_inspection(module: &str, records: Option<&ModuleRecords>) {
    println!("############### {} ###############", module);

    match records {
        Some(ModuleRecords::Counters(records)) => {
            for record in records {
                println!(
                    "rank {:>6}  id {:>20}  {} counters, {} fcounters",
                    record.rank,
                    record.id,
                    record.counters.len(),
                    record.fcounters.as_ref().map_or(0, |f| f.len())
                );
            }
        }
        Some(ModuleRecords::Dxt(records)) => {
            for record in records {
                println!(
                    "rank {:>6}  id {:>20}  host {}  {} reads, {} writes",
                    record.rank,
                    record.id,
                    record.hostname,
                    record.read_segments.len(),
                    record.write_segments.len()
                );
            }
        }
        None => println!("(no records)"),
    }
}
