//! In-memory trace library.
//!
//! Serves reports that were decoded elsewhere (or built by hand in tests).
//! Records stay pending until `load` is called, so callers see the same
//! open/load/records lifecycle as with darshan-util.

use super::library::{Loader, TraceLibrary, TraceReport};
use super::schema::{JobMetadata, ModuleRecords};
use crate::utils::error::ReadError;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

type LoadJournal = Rc<RefCell<Vec<(String, Loader)>>>;

/// A report registered with a [`MemoryLibrary`]
#[derive(Debug, Clone, Default)]
pub struct MemoryReport {
    metadata: JobMetadata,
    modules: Vec<String>,
    pending: HashMap<String, ModuleRecords>,
    records: HashMap<String, ModuleRecords>,
    journal: LoadJournal,
}

impl MemoryReport {
    pub fn new(metadata: JobMetadata) -> Self {
        Self {
            metadata,
            ..Default::default()
        }
    }

    /// Add a module and the records it will yield once loaded
    pub fn with_module(mut self, module: &str, records: ModuleRecords) -> Self {
        if !self.modules.iter().any(|m| m == module) {
            self.modules.push(module.to_string());
        }
        self.pending.insert(module.to_string(), records);
        self
    }
}

impl TraceReport for MemoryReport {
    fn metadata(&self) -> &JobMetadata {
        &self.metadata
    }

    fn modules(&self) -> &[String] {
        &self.modules
    }

    fn load(&mut self, module: &str, loader: Loader) -> Result<(), ReadError> {
        self.journal.borrow_mut().push((module.to_string(), loader));

        if self.records.contains_key(module) {
            return Ok(());
        }

        let records = self
            .pending
            .remove(module)
            .ok_or_else(|| ReadError::ModuleNotFound(module.to_string()))?;
        self.records.insert(module.to_string(), records);
        Ok(())
    }

    fn records(&self, module: &str) -> Option<&ModuleRecords> {
        self.records.get(module)
    }
}

/// Library serving pre-built reports keyed by path
#[derive(Debug, Default)]
pub struct MemoryLibrary {
    reports: HashMap<PathBuf, MemoryReport>,
    journal: LoadJournal,
}

impl MemoryLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, report: MemoryReport) {
        self.reports.insert(path.into(), report);
    }

    /// Every `load` call made against reports opened from this library
    pub fn load_calls(&self) -> Vec<(String, Loader)> {
        self.journal.borrow().clone()
    }
}

impl TraceLibrary for MemoryLibrary {
    type Report = MemoryReport;

    fn open(&self, path: &Path) -> Result<MemoryReport, ReadError> {
        let mut report = self
            .reports
            .get(path)
            .cloned()
            .ok_or_else(|| ReadError::InvalidPath {
                path: path.to_path_buf(),
                reason: "no report registered for this path".to_string(),
            })?;
        report.journal = Rc::clone(&self.journal);
        Ok(report)
    }
}
