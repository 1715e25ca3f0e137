//! Archive writer.
//!
//! Writes the metadata table and every loaded collection of a batch into
//! one output directory.

use super::parquet::{metadata_batch, write_batch};
use crate::aggregator::MetadataTable;
use crate::reader::NamedJob;
use crate::utils::config::METADATA_FILE_NAME;
use crate::utils::error::OutputError;
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};

/// What a call to `write_archive` produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub metadata_path: PathBuf,

    /// Per-record files, in write order
    pub record_files: Vec<PathBuf>,
}

/// Make sure `output_dir` is a usable directory, creating it when missing
///
/// # Errors
/// * `OutputError::InvalidDirectory` - path exists but is not a directory
/// * `OutputError::WriteFailed` - directory cannot be created
pub fn prepare_output_dir(output_dir: &Path) -> Result<(), OutputError> {
    if output_dir.as_os_str().is_empty() {
        return Err(OutputError::InvalidDirectory {
            path: output_dir.to_path_buf(),
            reason: "path is empty".to_string(),
        });
    }

    if output_dir.exists() {
        if !output_dir.is_dir() {
            return Err(OutputError::InvalidDirectory {
                path: output_dir.to_path_buf(),
                reason: "path exists and is not a directory".to_string(),
            });
        }
        debug!("Output directory {} exists", output_dir.display());
    } else {
        debug!("Creating output directory {}", output_dir.display());
        fs::create_dir_all(output_dir)?;
    }

    Ok(())
}

/// Write the metadata table and every job's collections
///
/// **Public** - last step of the aggregate command
///
/// Any failure aborts the batch; files written before the failure are
/// left in place.
pub fn write_archive(
    jobs: &[NamedJob],
    table: &MetadataTable,
    output_dir: impl AsRef<Path>,
) -> Result<ArchiveSummary, OutputError> {
    let output_dir = output_dir.as_ref();
    prepare_output_dir(output_dir)?;

    let metadata_path = output_dir.join(METADATA_FILE_NAME);
    write_batch(&metadata_path, &metadata_batch(table)?)?;
    info!("Metadata for {} jobs written to {}", table.len(), metadata_path.display());

    let mut record_files = Vec::new();
    for job in jobs {
        for collection in job.record.collections() {
            let written = collection.export(output_dir, &job.name)?;
            debug!(
                "{}: wrote {} {} files",
                job.name,
                written.len(),
                collection.module()
            );
            record_files.extend(written);
        }
    }

    info!("Wrote {} record files to {}", record_files.len(), output_dir.display());

    Ok(ArchiveSummary {
        metadata_path,
        record_files,
    })
}
