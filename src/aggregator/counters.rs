//! Counter record collections (POSIX, STDIO, LUSTRE).
//!
//! One collection per module per log, keyed by `(rank, id)`. Modules
//! with float counters keep a second table per key.

use crate::output::parquet::{counter_batch, fcounter_batch, write_batch};
use crate::output::paths::{record_file_name, TableKind};
use crate::reader::schema::{CounterRecord, CounterTable};
use crate::utils::error::{AggregateError, OutputError};
use log::{debug, warn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Identity of a counter record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey {
    pub rank: i64,
    pub id: u64,
}

impl RecordKey {
    pub fn new(rank: i64, id: u64) -> Self {
        Self { rank, id }
    }

    /// `<rank>_<id>`, as used in output file names
    pub fn to_file_id(&self) -> String {
        format!("{}_{}", self.rank, self.id)
    }
}

/// Counter tables of one module, keyed by record identity
#[derive(Debug, Clone)]
pub struct CounterCollection {
    module: String,
    keys: Vec<RecordKey>,
    counters: HashMap<RecordKey, CounterTable<i64>>,
    fcounters: Option<HashMap<RecordKey, CounterTable<f64>>>,
}

impl CounterCollection {
    fn empty(module: &str, with_fcounters: bool) -> Self {
        Self {
            module: module.to_string(),
            keys: Vec::new(),
            counters: HashMap::new(),
            fcounters: with_fcounters.then(HashMap::new),
        }
    }

    /// Integer counters only (LUSTRE)
    pub fn counters(module: &str, records: &[CounterRecord]) -> Self {
        let mut collection = Self::empty(module, false);
        for record in records {
            let key = collection.track(record);
            collection.counters.insert(key, record.counters.clone());
        }

        debug!("{}: collected {} records", module, collection.len());
        collection
    }

    /// Integer and float counters (POSIX, STDIO)
    ///
    /// # Errors
    /// * `AggregateError::MissingFloatCounters` - a record has no float table
    pub fn with_fcounters(module: &str, records: &[CounterRecord]) -> Result<Self, AggregateError> {
        let mut collection = Self::empty(module, true);
        let mut fcounters = HashMap::with_capacity(records.len());

        for record in records {
            let Some(fcounter_table) = record.fcounters.as_ref() else {
                return Err(AggregateError::MissingFloatCounters {
                    module: module.to_string(),
                    rank: record.rank,
                    id: record.id,
                });
            };

            let key = collection.track(record);
            collection.counters.insert(key, record.counters.clone());
            fcounters.insert(key, fcounter_table.clone());
        }

        collection.fcounters = Some(fcounters);
        debug!("{}: collected {} records with float counters", module, collection.len());
        Ok(collection)
    }

    /// Register a record's key, keeping the first position of a repeated key
    ///
    /// **Private** - a repeated key means the later record's tables win
    fn track(&mut self, record: &CounterRecord) -> RecordKey {
        let key = RecordKey::new(record.rank, record.id);
        if self.counters.contains_key(&key) {
            warn!(
                "{}: record (rank {}, id {}) appears more than once, keeping the last one",
                self.module, key.rank, key.id
            );
        } else {
            self.keys.push(key);
        }
        key
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    /// Record keys in vendor enumeration order
    pub fn keys(&self) -> &[RecordKey] {
        &self.keys
    }

    pub fn counters_for(&self, key: &RecordKey) -> Option<&CounterTable<i64>> {
        self.counters.get(key)
    }

    pub fn fcounters_for(&self, key: &RecordKey) -> Option<&CounterTable<f64>> {
        self.fcounters.as_ref().and_then(|f| f.get(key))
    }

    pub fn has_fcounters(&self) -> bool {
        self.fcounters.is_some()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Write one counters file per record, plus one fcounters file when tracked
    ///
    /// Returns the written paths in key order.
    pub fn export(&self, directory: &Path, prefix: &str) -> Result<Vec<PathBuf>, OutputError> {
        let mut written = Vec::new();

        for key in &self.keys {
            let file_id = key.to_file_id();

            if let Some(table) = self.counters.get(key) {
                let path = directory.join(record_file_name(
                    &self.module,
                    prefix,
                    &file_id,
                    TableKind::Counters,
                ));
                write_batch(&path, &counter_batch(key.rank, key.id, table)?)?;
                written.push(path);
            }

            if let Some(table) = self.fcounters_for(key) {
                let path = directory.join(record_file_name(
                    &self.module,
                    prefix,
                    &file_id,
                    TableKind::FloatCounters,
                ));
                write_batch(&path, &fcounter_batch(key.rank, key.id, table)?)?;
                written.push(path);
            }
        }

        Ok(written)
    }
}
