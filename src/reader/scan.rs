//! Log directory scanning.

use crate::utils::config::{PARTIAL_EXTENSION, TRACE_EXTENSION};
use crate::utils::error::ScanError;
use log::{debug, warn};
use std::fs;
use std::path::Path;

/// Collect the names of all complete Darshan logs in `directory`
///
/// **Public** - first step of the aggregate command
///
/// Only regular files whose extension is exactly `darshan` are kept, so
/// `.darshan_partial` logs from unfinished jobs are skipped. Names come
/// back in directory enumeration order. Logs whose names are not valid
/// UTF-8 are skipped with a warning.
///
/// # Errors
/// * `ScanError::InvalidDirectory` - path is missing or not a directory
/// * `ScanError::Io` - the directory cannot be listed
pub fn collect_logfiles(directory: impl AsRef<Path>) -> Result<Vec<String>, ScanError> {
    let directory = directory.as_ref();

    if !directory.exists() {
        return Err(ScanError::InvalidDirectory {
            path: directory.to_path_buf(),
            reason: "path does not exist".to_string(),
        });
    }

    if !directory.is_dir() {
        return Err(ScanError::InvalidDirectory {
            path: directory.to_path_buf(),
            reason: "path is not a directory".to_string(),
        });
    }

    debug!("Scanning {} for .{} logs", directory.display(), TRACE_EXTENSION);

    let mut logfiles = Vec::new();
    for entry in fs::read_dir(directory)? {
        let path = entry?.path();

        if !path.is_file() {
            continue;
        }

        match path.extension().and_then(|e| e.to_str()) {
            Some(TRACE_EXTENSION) => {}
            Some(PARTIAL_EXTENSION) => {
                debug!("Skipping unfinished log {}", path.display());
                continue;
            }
            _ => continue,
        }

        match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => logfiles.push(name.to_string()),
            None => warn!("Skipping log with a non UTF-8 name: {}", path.display()),
        }
    }

    debug!("Found {} .{} log files", logfiles.len(), TRACE_EXTENSION);

    Ok(logfiles)
}
