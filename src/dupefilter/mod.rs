//! Duplicate request filtering
//!
//! This module defines the `DupeFilter` capability consumed by the scheduler
//! and the implementations selectable from configuration:
//! - `MemoryDupeFilter`: fingerprints kept in memory for the current run
//! - `SqliteDupeFilter`: fingerprints persisted in the job directory

mod memory;
mod sqlite;

pub use memory::MemoryDupeFilter;
pub use sqlite::SqliteDupeFilter;

use crate::request::Request;
use std::path::Path;
use thiserror::Error;

/// File name of the persisted seen-set inside a job directory
pub const SEEN_DB_FILE: &str = "requests.seen.db";

/// Errors that can occur in a duplicate filter
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("Duplicate filter storage error: {0}")]
    Storage(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Duplicate filter is not open")]
    NotOpen,

    #[error("Unknown duplicate filter implementation: {0}")]
    UnknownKind(String),
}

/// Result type for duplicate filter operations
pub type FilterResult<T> = Result<T, FilterError>;

/// Duplicate request filter
///
/// What counts as "the same request" is up to the implementation; the
/// scheduler only relies on seen-set semantics.
pub trait DupeFilter: Send {
    /// Prepares the filter, loading any persisted state
    fn open(&mut self) -> FilterResult<()>;

    /// Returns whether the request was seen before, and marks it as seen
    ///
    /// Calling this twice with the same request returns `false` then `true`.
    fn request_seen(&mut self, request: &Request) -> FilterResult<bool>;

    /// Releases resources, persisting the seen-set where supported
    fn close(&mut self, reason: &str) -> FilterResult<()>;
}

/// Registry of duplicate filter implementations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DupeFilterKind {
    Memory,
    Sqlite,
}

impl DupeFilterKind {
    /// Names accepted in configuration
    pub const NAMES: &'static [&'static str] = &["memory", "sqlite"];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "memory" => Some(Self::Memory),
            "sqlite" => Some(Self::Sqlite),
            _ => None,
        }
    }

    /// Resolves a configured name, failing on unknown implementations
    pub fn resolve(name: &str) -> FilterResult<Self> {
        Self::from_name(name).ok_or_else(|| FilterError::UnknownKind(name.to_string()))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Sqlite => "sqlite",
        }
    }

    /// Builds an unopened filter of this kind
    ///
    /// The sqlite filter persists into `job_dir` when one is given and falls
    /// back to an in-memory database otherwise.
    pub fn build(&self, job_dir: Option<&Path>) -> Box<dyn DupeFilter> {
        match self {
            Self::Memory => Box::new(MemoryDupeFilter::new()),
            Self::Sqlite => match job_dir {
                Some(dir) => Box::new(SqliteDupeFilter::new(dir.join(SEEN_DB_FILE))),
                None => Box::new(SqliteDupeFilter::in_memory()),
            },
        }
    }
}
