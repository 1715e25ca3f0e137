//! Combined per-job metadata table.

use crate::reader::schema::JobMetadata;
use crate::reader::NamedJob;
use crate::utils::error::AggregateError;
use log::debug;
use serde::Serialize;
use std::collections::HashSet;

/// Column order of metadata.parquet after the job name
pub const METADATA_COLUMNS: [&str; 11] = [
    "run_time",
    "start_time_nsec",
    "start_time_sec",
    "end_time_nsec",
    "end_time_sec",
    "jobid",
    "uid",
    "log_ver",
    "metadata",
    "nprocs",
    "exe",
];

/// One job's row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetadataRow {
    /// Generated job name (`<uid>_<jobid>`)
    pub name: String,
    pub run_time: f64,
    pub start_time_nsec: i64,
    pub start_time_sec: i64,
    pub end_time_nsec: i64,
    pub end_time_sec: i64,
    pub jobid: i64,
    pub uid: i64,
    pub log_ver: String,
    /// Free-form runtime metadata as a JSON object
    pub metadata: String,
    pub nprocs: i64,
    pub exe: String,
}

impl MetadataRow {
    fn from_metadata(name: &str, metadata: &JobMetadata) -> Self {
        let job = &metadata.job;
        let blob: serde_json::Map<String, serde_json::Value> = job
            .metadata
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect();

        Self {
            name: name.to_string(),
            run_time: job.run_time,
            start_time_nsec: job.start_time_nsec,
            start_time_sec: job.start_time_sec,
            end_time_nsec: job.end_time_nsec,
            end_time_sec: job.end_time_sec,
            jobid: job.jobid,
            uid: job.uid,
            log_ver: job.log_ver.clone(),
            metadata: serde_json::Value::Object(blob).to_string(),
            nprocs: job.nprocs,
            exe: metadata.exe.clone(),
        }
    }
}

/// Metadata of every job in a batch, one row per generated name
#[derive(Debug, Clone, Default)]
pub struct MetadataTable {
    rows: Vec<MetadataRow>,
    names: HashSet<String>,
}

impl MetadataTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the table for a whole batch
    ///
    /// # Errors
    /// * `AggregateError::DuplicateKey` - two jobs share a generated name
    pub fn from_jobs(jobs: &[NamedJob]) -> Result<Self, AggregateError> {
        let mut table = Self::new();
        for job in jobs {
            table.insert(&job.name, job.record.metadata())?;
        }

        debug!("Metadata table holds {} jobs", table.len());
        Ok(table)
    }

    /// Add one job's row
    ///
    /// # Errors
    /// * `AggregateError::DuplicateKey` - `name` already has a row
    pub fn insert(&mut self, name: &str, metadata: &JobMetadata) -> Result<(), AggregateError> {
        if !self.names.insert(name.to_string()) {
            return Err(AggregateError::DuplicateKey(name.to_string()));
        }

        self.rows.push(MetadataRow::from_metadata(name, metadata));
        Ok(())
    }

    pub fn rows(&self) -> &[MetadataRow] {
        &self.rows
    }

    pub fn get(&self, name: &str) -> Option<&MetadataRow> {
        self.rows.iter().find(|r| r.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
