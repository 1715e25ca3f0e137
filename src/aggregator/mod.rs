//! Shaping raw module records into exportable collections.
//!
//! This module handles:
//! - Counter collections keyed by (rank, id)
//! - DXT segment collections keyed by record id
//! - The combined per-job metadata table

pub mod counters;
pub mod dxt;
pub mod metadata;

// Re-export main types
pub use counters::{CounterCollection, RecordKey};
pub use dxt::{DxtCollection, DxtIdentity};
pub use metadata::{MetadataRow, MetadataTable};

use crate::utils::error::OutputError;
use std::path::{Path, PathBuf};

/// A loaded module's collection
#[derive(Debug, Clone)]
pub enum ModuleCollection {
    Counters(CounterCollection),
    Dxt(DxtCollection),
}

impl ModuleCollection {
    pub fn module(&self) -> &str {
        match self {
            ModuleCollection::Counters(c) => c.module(),
            ModuleCollection::Dxt(c) => c.module(),
        }
    }

    /// Number of records (not files) in the collection
    pub fn len(&self) -> usize {
        match self {
            ModuleCollection::Counters(c) => c.len(),
            ModuleCollection::Dxt(c) => c.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write every table of the collection under `directory`
    pub fn export(&self, directory: &Path, prefix: &str) -> Result<Vec<PathBuf>, OutputError> {
        match self {
            ModuleCollection::Counters(c) => c.export(directory, prefix),
            ModuleCollection::Dxt(c) => c.export(directory, prefix),
        }
    }
}
