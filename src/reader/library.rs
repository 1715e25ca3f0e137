//! The trace library boundary.
//!
//! A library opens a log into a report. The report knows which modules
//! the log contains but holds no record data until a module is loaded
//! explicitly. Dropping the report closes it.

use super::schema::{JobMetadata, ModuleRecords};
use crate::utils::error::ReadError;
use std::path::Path;

/// How a module's records must be decoded.
///
/// Module formats differ, so each module family gets its own load path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Loader {
    /// Fixed counter set, integer and `_F_` float counters
    Counters,
    /// Variable-width integer counters (one entry per OST)
    Lustre,
    /// Per-operation read/write segments
    Dxt,
}

/// An opened log
pub trait TraceReport {
    fn metadata(&self) -> &JobMetadata;

    /// Names of all modules present in the log
    fn modules(&self) -> &[String];

    /// Decode the records of `module`, making them available via `records`
    fn load(&mut self, module: &str, loader: Loader) -> Result<(), ReadError>;

    /// Records of a previously loaded module
    fn records(&self, module: &str) -> Option<&ModuleRecords>;
}

/// Something that can open Darshan logs
pub trait TraceLibrary {
    type Report: TraceReport;

    fn open(&self, path: &Path) -> Result<Self::Report, ReadError>;
}
