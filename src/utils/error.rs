//! Error types for the entire application.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs and commands.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while opening or decoding a single trace file
#[derive(Error, Debug)]
pub enum ReadError {
    #[error("Invalid trace path {path}: {reason}")]
    InvalidPath { path: PathBuf, reason: String },

    #[error("darshan-util tool not found: {0}")]
    ToolNotFound(String),

    #[error("Failed to run {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} exited with status {code:?}: {stderr}")]
    ToolFailed {
        tool: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Malformed log output at line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Module {0} is not present in the log")]
    ModuleNotFound(String),

    #[error(transparent)]
    Aggregate(#[from] AggregateError),
}

/// Errors that can occur while scanning a log directory
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Invalid directory {path}: {reason}")]
    InvalidDirectory { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur while shaping raw records into collections
#[derive(Error, Debug)]
pub enum AggregateError {
    #[error("{module} record id {id} is not unique within the log")]
    DuplicateIdentity { module: String, id: u64 },

    #[error("Job name {0} is not unique within the batch")]
    DuplicateKey(String),

    #[error("{module} record (rank {rank}, id {id}) has no float counters")]
    MissingFloatCounters { module: String, rank: i64, id: u64 },

    #[error("{module} records have the wrong shape: expected {expected}")]
    UnexpectedRecordKind {
        module: String,
        expected: &'static str,
    },
}

/// Errors that can occur during file output
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Invalid output directory {path}: {reason}")]
    InvalidDirectory { path: PathBuf, reason: String },

    #[error("Failed to write file: {0}")]
    WriteFailed(#[from] std::io::Error),

    #[error("Failed to build Arrow batch: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Failed to write Parquet: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Failed to serialize JSON: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}
