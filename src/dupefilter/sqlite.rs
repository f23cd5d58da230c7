//! SQLite-backed duplicate filter
//!
//! Fingerprints are stored in a single table so the seen-set survives
//! process restarts together with the durable request queue.

use crate::dupefilter::{DupeFilter, FilterError, FilterResult};
use crate::request::Request;
use chrono::Utc;
use rusqlite::{params, Connection};
use std::path::PathBuf;

/// SQL schema for the seen-set
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS seen_requests (
    fingerprint TEXT PRIMARY KEY,
    url TEXT NOT NULL,
    first_seen_at TEXT NOT NULL
);
"#;

#[derive(Debug, Clone)]
enum Location {
    File(PathBuf),
    Memory,
}

/// Duplicate filter persisting request fingerprints in SQLite
#[derive(Debug)]
pub struct SqliteDupeFilter {
    location: Location,
    conn: Option<Connection>,
}

impl SqliteDupeFilter {
    /// Creates a filter persisting into the database file at `path`
    ///
    /// Nothing touches the filesystem until [`DupeFilter::open`].
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            location: Location::File(path.into()),
            conn: None,
        }
    }

    /// Creates a filter backed by an in-memory database
    pub fn in_memory() -> Self {
        Self {
            location: Location::Memory,
            conn: None,
        }
    }

    fn conn(&self) -> FilterResult<&Connection> {
        self.conn.as_ref().ok_or(FilterError::NotOpen)
    }

    /// Number of distinct requests recorded
    pub fn count(&self) -> FilterResult<u64> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM seen_requests", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn connect(&self) -> FilterResult<Connection> {
        let conn = match &self.location {
            Location::Memory => Connection::open_in_memory()?,
            Location::File(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                let conn = Connection::open(path).map_err(|e| unusable(path, e))?;
                conn.execute_batch(
                    "
                    PRAGMA journal_mode = WAL;
                    PRAGMA synchronous = NORMAL;
                    PRAGMA temp_store = MEMORY;
                ",
                )
                .map_err(|e| unusable(path, e))?;
                conn
            }
        };

        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| unusable_at(&self.location, e))?;

        // An existing table with a different layout is not ours to reuse
        conn.prepare("SELECT fingerprint, url, first_seen_at FROM seen_requests LIMIT 0")
            .map_err(|e| unusable_at(&self.location, e))?;

        Ok(conn)
    }
}

fn unusable(path: &std::path::Path, e: rusqlite::Error) -> FilterError {
    FilterError::Storage(format!("{} is not a usable seen-set: {}", path.display(), e))
}

fn unusable_at(location: &Location, e: rusqlite::Error) -> FilterError {
    match location {
        Location::File(path) => unusable(path, e),
        Location::Memory => FilterError::Sqlite(e),
    }
}

impl DupeFilter for SqliteDupeFilter {
    fn open(&mut self) -> FilterResult<()> {
        if self.conn.is_some() {
            return Ok(());
        }

        let conn = self.connect()?;
        self.conn = Some(conn);

        if let Location::File(path) = &self.location {
            tracing::debug!(
                "Opened seen-set {} ({} fingerprints)",
                path.display(),
                self.count()?
            );
        }
        Ok(())
    }

    fn request_seen(&mut self, request: &Request) -> FilterResult<bool> {
        let inserted = self.conn()?.execute(
            "INSERT OR IGNORE INTO seen_requests (fingerprint, url, first_seen_at) VALUES (?1, ?2, ?3)",
            params![request.fingerprint(), request.url, Utc::now().to_rfc3339()],
        )?;
        Ok(inserted == 0)
    }

    fn close(&mut self, reason: &str) -> FilterResult<()> {
        let conn = match self.conn.take() {
            Some(conn) => conn,
            None => return Ok(()),
        };

        tracing::debug!("Closing sqlite dupefilter (reason: {})", reason);
        conn.close().map_err(|(_, e)| FilterError::Sqlite(e))
    }
}
