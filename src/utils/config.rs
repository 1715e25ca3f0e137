//! Configuration and constants for the CLI.

/// Extension of a complete Darshan log
pub const TRACE_EXTENSION: &str = "darshan";

/// Extension Darshan uses for logs that were not finalized (job killed, still running)
pub const PARTIAL_EXTENSION: &str = "darshan_partial";

/// Extension of every file we write
pub const PARQUET_EXTENSION: &str = "parquet";

/// File name of the combined per-job metadata table
pub const METADATA_FILE_NAME: &str = "metadata.parquet";

/// Default output directory (relative to the working directory)
pub const DEFAULT_OUTPUT_DIR: &str = "parquet/";

// darshan-util tools used to decode logs
pub const DEFAULT_DARSHAN_PARSER: &str = "darshan-parser";
pub const DEFAULT_DXT_PARSER: &str = "darshan-dxt-parser";

/// Module names we know how to handle (or deliberately skip)
pub const KNOWN_MODULES: &[&str] = &[
    "POSIX",
    "LUSTRE",
    "STDIO",
    "DXT_POSIX",
    "HEATMAP",
    "MPI-IO",
    "DXT_MPIIO",
];

/// Marker separating a module prefix from a float counter name,
/// e.g. `POSIX_F_READ_TIME`.
pub const FLOAT_COUNTER_MARKER: &str = "_F_";
