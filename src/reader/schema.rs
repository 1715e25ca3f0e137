//! Raw record types handed back by a trace library.
//!
//! These mirror what darshan-util exposes for one log: job-level metadata,
//! counter records for the aggregate modules, and segment lists for the
//! DXT tracing modules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Job-level fields of a log (the `job` section of the log header)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobInfo {
    /// Wall-clock run time in seconds
    pub run_time: f64,

    pub start_time_sec: i64,
    pub start_time_nsec: i64,
    pub end_time_sec: i64,
    pub end_time_nsec: i64,

    /// Scheduler job id
    pub jobid: i64,

    /// Numeric user id of the job owner
    pub uid: i64,

    /// Darshan log format version, e.g. "3.41"
    pub log_ver: String,

    /// Free-form `key = value` pairs recorded by the runtime
    pub metadata: BTreeMap<String, String>,

    /// Number of MPI processes
    pub nprocs: i64,
}

impl JobInfo {
    pub fn start_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.start_time_sec, u32::try_from(self.start_time_nsec).ok()?)
    }

    pub fn end_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.end_time_sec, u32::try_from(self.end_time_nsec).ok()?)
    }
}

/// Full metadata of an opened log.
///
/// `exe` lives next to `job` rather than inside it, matching the
/// layout darshan-util reports.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobMetadata {
    pub job: JobInfo,

    /// Executable path and arguments
    pub exe: String,
}

/// A single-row table of named counters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CounterTable<T> {
    names: Vec<String>,
    values: Vec<T>,
}

impl<T: Copy> CounterTable<T> {
    pub fn new() -> Self {
        Self {
            names: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Append a counter. A repeated name replaces the earlier value in place.
    pub fn push(&mut self, name: impl Into<String>, value: T) {
        let name = name.into();
        match self.names.iter().position(|n| *n == name) {
            Some(idx) => self.values[idx] = value,
            None => {
                self.names.push(name);
                self.values.push(value);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<T> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|idx| self.values[idx])
    }

    /// Iterate `(name, value)` pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, T)> + '_ {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<T: Copy, S: Into<String>> FromIterator<(S, T)> for CounterTable<T> {
    fn from_iter<I: IntoIterator<Item = (S, T)>>(iter: I) -> Self {
        let mut table = CounterTable::new();
        for (name, value) in iter {
            table.push(name, value);
        }
        table
    }
}

/// One record of an aggregate-counter module (POSIX, STDIO, LUSTRE, MPI-IO)
#[derive(Debug, Clone, PartialEq)]
pub struct CounterRecord {
    pub rank: i64,
    pub id: u64,
    pub counters: CounterTable<i64>,

    /// Present only for modules that track float counters
    pub fcounters: Option<CounterTable<f64>>,
}

/// One traced read or write operation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub offset: i64,
    pub length: i64,
    pub start_time: f64,
    pub end_time: f64,
}

/// One record of a DXT tracing module
#[derive(Debug, Clone, PartialEq)]
pub struct DxtRecord {
    pub id: u64,
    pub rank: i64,
    pub hostname: String,
    pub write_count: i64,
    pub read_count: i64,
    pub read_segments: Vec<Segment>,
    pub write_segments: Vec<Segment>,
}

/// Records of one module, as loaded by the library
#[derive(Debug, Clone, PartialEq)]
pub enum ModuleRecords {
    Counters(Vec<CounterRecord>),
    Dxt(Vec<DxtRecord>),
}

impl ModuleRecords {
    pub fn len(&self) -> usize {
        match self {
            ModuleRecords::Counters(records) => records.len(),
            ModuleRecords::Dxt(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
