//! Output writers for aggregated log data.
//!
//! This module handles writing data to disk:
//! - Parquet serialization of counter, segment and metadata tables
//! - Output file naming
//! - The archive layout of a whole batch

pub mod archive;
pub mod parquet;
pub mod paths;

// Re-export main functions
pub use archive::{prepare_output_dir, write_archive, ArchiveSummary};
pub use paths::{record_file_name, TableKind};
