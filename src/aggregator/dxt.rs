//! DXT segment collections.
//!
//! DXT records are keyed by their record id alone; rank and hostname only
//! feed the output file names. Ids must be unique within one log.

use crate::output::parquet::{segment_batch, write_batch};
use crate::output::paths::{record_file_name, TableKind};
use crate::reader::schema::{DxtRecord, Segment};
use crate::utils::error::{AggregateError, OutputError};
use log::debug;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Identity and operation counts of one DXT record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DxtIdentity {
    pub id: u64,
    pub rank: i64,
    pub hostname: String,
    pub write_count: i64,
    pub read_count: i64,
}

impl DxtIdentity {
    /// `<id>_<rank>_<hostname>`, as used in output file names
    ///
    /// Path separators in the hostname become `_` so the file stays in
    /// the output directory.
    pub fn to_file_id(&self) -> String {
        let hostname = self.hostname.replace(['/', '\\'], "_");
        format!("{}_{}_{}", self.id, self.rank, hostname)
    }
}

/// Read and write segment tables of one DXT module
#[derive(Debug, Clone)]
pub struct DxtCollection {
    module: String,
    identities: Vec<DxtIdentity>,
    read_segments: HashMap<u64, Vec<Segment>>,
    write_segments: HashMap<u64, Vec<Segment>>,
}

impl DxtCollection {
    /// # Errors
    /// * `AggregateError::DuplicateIdentity` - two records share an id
    pub fn from_records(module: &str, records: &[DxtRecord]) -> Result<Self, AggregateError> {
        let mut identities = Vec::with_capacity(records.len());
        let mut read_segments = HashMap::with_capacity(records.len());
        let mut write_segments = HashMap::with_capacity(records.len());

        for record in records {
            if read_segments.contains_key(&record.id) {
                return Err(AggregateError::DuplicateIdentity {
                    module: module.to_string(),
                    id: record.id,
                });
            }

            identities.push(DxtIdentity {
                id: record.id,
                rank: record.rank,
                hostname: record.hostname.clone(),
                write_count: record.write_count,
                read_count: record.read_count,
            });
            read_segments.insert(record.id, record.read_segments.clone());
            write_segments.insert(record.id, record.write_segments.clone());
        }

        debug!("{}: collected {} traced records", module, identities.len());

        Ok(Self {
            module: module.to_string(),
            identities,
            read_segments,
            write_segments,
        })
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    /// File name category: the module name without underscores (`DXTPOSIX`)
    pub fn category(&self) -> String {
        self.module.replace('_', "")
    }

    pub fn identities(&self) -> &[DxtIdentity] {
        &self.identities
    }

    pub fn read_segments(&self, id: u64) -> Option<&[Segment]> {
        self.read_segments.get(&id).map(Vec::as_slice)
    }

    pub fn write_segments(&self, id: u64) -> Option<&[Segment]> {
        self.write_segments.get(&id).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    /// Write a read-segments and a write-segments file per record
    pub fn export(&self, directory: &Path, prefix: &str) -> Result<Vec<PathBuf>, OutputError> {
        let category = self.category();
        let mut written = Vec::with_capacity(self.identities.len() * 2);

        for identity in &self.identities {
            let file_id = identity.to_file_id();
            let tables = [
                (TableKind::ReadSegments, self.read_segments(identity.id)),
                (TableKind::WriteSegments, self.write_segments(identity.id)),
            ];

            for (kind, segments) in tables {
                let path = directory.join(record_file_name(&category, prefix, &file_id, kind));
                write_batch(&path, &segment_batch(segments.unwrap_or_default())?)?;
                written.push(path);
            }
        }

        Ok(written)
    }
}
