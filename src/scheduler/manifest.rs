//! Resume manifest for the disk tier
//!
//! The manifest is `active.json` inside the queue directory: a JSON array of
//! the priority levels that still held requests at the last clean close.

use serde_json::Value;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name of the manifest inside the queue directory
pub const MANIFEST_FILE: &str = "active.json";

/// Errors reading or writing persisted scheduler state
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed resume manifest {path}: {message}")]
    Malformed { path: PathBuf, message: String },
}

/// Path of the manifest for `queue_dir`
pub fn manifest_path(queue_dir: &Path) -> PathBuf {
    queue_dir.join(MANIFEST_FILE)
}

/// Reads the active priority levels recorded for `queue_dir`
///
/// # Returns
///
/// * `Ok(Vec<i32>)` - Recorded levels, or an empty list when no manifest exists
/// * `Err(StorageError)` - The manifest exists but cannot be read or parsed
pub fn read_active(queue_dir: &Path) -> Result<Vec<i32>, StorageError> {
    let path = manifest_path(queue_dir);
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => return Err(StorageError::Io { path, source }),
    };

    let malformed = |message: String| StorageError::Malformed {
        path: path.clone(),
        message,
    };

    let value: Value = serde_json::from_str(&content).map_err(|e| malformed(e.to_string()))?;
    let entries = value
        .as_array()
        .ok_or_else(|| malformed("expected a list of priority levels".to_string()))?;

    entries
        .iter()
        .map(|entry| {
            entry
                .as_i64()
                .and_then(|p| i32::try_from(p).ok())
                .ok_or_else(|| malformed(format!("{} is not a priority level", entry)))
        })
        .collect()
}

/// Writes the active priority levels for `queue_dir`
///
/// The list is written sorted, through a temporary file and a rename so a
/// crash never leaves a half-written manifest behind.
pub fn write_active(queue_dir: &Path, priorities: &[i32]) -> Result<(), StorageError> {
    let path = manifest_path(queue_dir);
    let io_err = |source: io::Error| StorageError::Io {
        path: path.clone(),
        source,
    };

    let mut sorted = priorities.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    fs::create_dir_all(queue_dir).map_err(io_err)?;

    let tmp_path = queue_dir.join(format!("{}.tmp", MANIFEST_FILE));
    let content = Value::from(sorted).to_string();
    fs::write(&tmp_path, content).map_err(io_err)?;
    fs::rename(&tmp_path, &path).map_err(io_err)?;
    Ok(())
}
