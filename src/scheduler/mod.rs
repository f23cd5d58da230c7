//! Scheduler for pending crawl requests
//!
//! This module handles:
//! - Duplicate suppression through the configured `DupeFilter`
//! - Routing requests to the durable disk tier, falling back to memory
//! - Serving the memory tier first, then the disk backlog
//! - Persisting and resuming the disk tier through a manifest

mod manifest;

pub use manifest::{manifest_path, read_active, write_active, StorageError, MANIFEST_FILE};

use crate::config::SchedulerConfig;
use crate::dupefilter::{DupeFilter, DupeFilterKind, FilterError};
use crate::queue::{DiskQueue, DiskQueueKind, MemoryQueue, PriorityQueue, QueueError};
use crate::request::{Request, RequestRecord};
use crate::stats::{self, StatsCollector};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Directory inside the job directory holding the disk tier
pub const QUEUE_DIR: &str = "requests.queue";

/// Errors that can occur during scheduling
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Duplicate filter error: {0}")]
    Filter(#[from] FilterError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Unreadable request record: {0}")]
    Record(String),

    #[error("Scheduler is already open")]
    AlreadyOpen,

    #[error("Scheduler is not open")]
    NotOpen,
}

/// Result type for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Lifecycle state of a scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Closed,
    Open,
}

/// Queues that exist only while the scheduler is open
struct OpenQueues {
    memory: PriorityQueue<MemoryQueue<Request>>,
    disk: Option<PriorityQueue<DiskQueue>>,
}

/// Scheduler for one crawl job
///
/// The crawl loop drives it through `open`, `enqueue`, `dequeue`,
/// `has_pending` and `close`. Lower request priorities are served first.
pub struct Scheduler {
    dupefilter: Box<dyn DupeFilter>,
    queue_dir: Option<PathBuf>,
    disk_queue: DiskQueueKind,
    sync_writes: bool,
    stats: Arc<dyn StatsCollector>,
    queues: Option<OpenQueues>,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("queue_dir", &self.queue_dir)
            .field("disk_queue", &self.disk_queue)
            .field("state", &self.state())
            .finish()
    }
}

impl Scheduler {
    /// Creates a closed scheduler
    ///
    /// # Arguments
    ///
    /// * `dupefilter` - Duplicate filter, opened and closed with the scheduler
    /// * `job_dir` - Directory for durable state; `None` schedules in memory only
    /// * `stats` - Sink for scheduler statistics
    pub fn new(
        dupefilter: Box<dyn DupeFilter>,
        job_dir: Option<PathBuf>,
        stats: Arc<dyn StatsCollector>,
    ) -> Self {
        Self {
            dupefilter,
            queue_dir: job_dir.map(|dir| dir.join(QUEUE_DIR)),
            disk_queue: DiskQueueKind::Fifo,
            sync_writes: false,
            stats,
            queues: None,
        }
    }

    /// Selects the durable sub-queue implementation
    pub fn with_disk_queue(mut self, kind: DiskQueueKind) -> Self {
        self.disk_queue = kind;
        self
    }

    /// Syncs every disk push to stable storage before it returns
    pub fn with_sync_writes(mut self, sync_writes: bool) -> Self {
        self.sync_writes = sync_writes;
        self
    }

    /// Builds a scheduler from configuration, resolving registry names once
    pub fn from_config(
        config: &SchedulerConfig,
        stats: Arc<dyn StatsCollector>,
    ) -> SchedulerResult<Self> {
        let dupefilter = DupeFilterKind::resolve(&config.dupefilter)?.build(config.job_dir.as_deref());
        let disk_queue = DiskQueueKind::resolve(&config.disk_queue)?;

        Ok(Self::new(dupefilter, config.job_dir.clone(), stats)
            .with_disk_queue(disk_queue)
            .with_sync_writes(config.sync_writes))
    }

    pub fn state(&self) -> SchedulerState {
        if self.queues.is_some() {
            SchedulerState::Open
        } else {
            SchedulerState::Closed
        }
    }

    /// Directory holding the disk tier, if durable scheduling is configured
    pub fn queue_dir(&self) -> Option<&Path> {
        self.queue_dir.as_deref()
    }

    /// Opens the scheduler
    ///
    /// Creates the memory tier, resumes the disk tier from the manifest when
    /// a job directory is configured (a missing manifest is a cold start) and
    /// opens the duplicate filter.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Scheduler is open
    /// * `Err(SchedulerError::Storage)` - The manifest exists but is unreadable or malformed
    /// * `Err(SchedulerError::Filter)` - The duplicate filter could not be opened
    pub fn open(&mut self) -> SchedulerResult<()> {
        if self.queues.is_some() {
            return Err(SchedulerError::AlreadyOpen);
        }

        let memory = PriorityQueue::new(|_| Ok(MemoryQueue::new()));
        let mut disk = match &self.queue_dir {
            Some(dir) => Some(self.open_disk_tier(dir)?),
            None => None,
        };

        if let Err(e) = self.dupefilter.open() {
            if let Some(disk) = disk.as_mut() {
                if let Err(close_err) = disk.close() {
                    tracing::warn!("Failed to close disk queue after filter error: {}", close_err);
                }
            }
            return Err(e.into());
        }

        self.queues = Some(OpenQueues { memory, disk });
        Ok(())
    }

    fn open_disk_tier(&self, dir: &Path) -> SchedulerResult<PriorityQueue<DiskQueue>> {
        let priorities = read_active(dir)?;

        let kind = self.disk_queue;
        let sync_writes = self.sync_writes;
        let root = dir.to_path_buf();
        let factory = move |priority: i32| kind.open(&root.join(format!("p{}", priority)), sync_writes);

        let disk = PriorityQueue::with_start_priorities(factory, &priorities)?;
        if !disk.is_empty() {
            tracing::info!("Resuming crawl ({} requests scheduled)", disk.len());
        }
        Ok(disk)
    }

    /// Schedules a request
    ///
    /// Requests already seen by the duplicate filter are dropped unless they
    /// are marked `dont_filter`. Accepted requests go to the disk tier when
    /// one exists and the request can be serialized, otherwise to memory.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The request was queued
    /// * `Ok(false)` - The request was dropped as a duplicate
    /// * `Err(SchedulerError)` - The filter or the disk tier failed
    pub fn enqueue(&mut self, request: Request) -> SchedulerResult<bool> {
        let queues = self.queues.as_mut().ok_or(SchedulerError::NotOpen)?;

        if !request.dont_filter && self.dupefilter.request_seen(&request)? {
            tracing::debug!("Filtered duplicate request: {}", request.url);
            self.stats.inc_value(stats::DUPES_FILTERED, 1);
            return Ok(false);
        }

        if let Some(disk) = queues.disk.as_mut() {
            match encode(&request, self.disk_queue.max_record_len()) {
                Ok(bytes) => {
                    disk.push(bytes, request.priority)?;
                    self.stats.inc_value(stats::DISK_ENQUEUED, 1);
                    return Ok(true);
                }
                Err(reason) => {
                    tracing::debug!("Keeping {} in memory: {}", request.url, reason);
                }
            }
        }

        let priority = request.priority;
        queues.memory.push(request, priority)?;
        self.stats.inc_value(stats::MEMORY_ENQUEUED, 1);
        Ok(true)
    }

    /// Returns the next request to fetch
    ///
    /// The memory tier is drained before the disk backlog.
    pub fn dequeue(&mut self) -> SchedulerResult<Option<Request>> {
        let queues = self.queues.as_mut().ok_or(SchedulerError::NotOpen)?;

        if let Some(request) = queues.memory.pop()? {
            self.stats.inc_value(stats::MEMORY_DEQUEUED, 1);
            return Ok(Some(request));
        }

        let bytes = match queues.disk.as_mut() {
            Some(disk) => disk.pop()?,
            None => None,
        };

        match bytes {
            Some(bytes) => {
                let record = RequestRecord::from_bytes(&bytes)
                    .map_err(|e| SchedulerError::Record(e.to_string()))?;
                self.stats.inc_value(stats::DISK_DEQUEUED, 1);
                Ok(Some(Request::from_record(record)))
            }
            None => Ok(None),
        }
    }

    /// Number of requests waiting in both tiers
    pub fn pending_count(&self) -> usize {
        match &self.queues {
            Some(queues) => {
                queues.memory.len() + queues.disk.as_ref().map_or(0, PriorityQueue::len)
            }
            None => 0,
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending_count() > 0
    }

    /// Requests waiting in the memory tier
    pub fn memory_pending(&self) -> usize {
        self.queues.as_ref().map_or(0, |q| q.memory.len())
    }

    /// Requests waiting per disk priority level, ascending by priority
    pub fn disk_levels(&self) -> Vec<(i32, usize)> {
        self.queues
            .as_ref()
            .and_then(|q| q.disk.as_ref())
            .map(PriorityQueue::level_sizes)
            .unwrap_or_default()
    }

    /// Closes the scheduler
    ///
    /// Closes the disk tier and records its active priority levels in the
    /// manifest, then closes the duplicate filter. Requests still in the
    /// memory tier are discarded. Closing a closed scheduler does nothing.
    ///
    /// # Arguments
    ///
    /// * `reason` - Why the crawl is closing; only used for diagnostics
    pub fn close(&mut self, reason: &str) -> SchedulerResult<()> {
        let queues = match self.queues.take() {
            Some(queues) => queues,
            None => return Ok(()),
        };

        let mut result = Ok(());

        if let (Some(mut disk), Some(dir)) = (queues.disk, self.queue_dir.as_deref()) {
            match disk.close() {
                Ok(active) => match write_active(dir, &active) {
                    Ok(()) => tracing::info!(
                        "Persisted {} active priority levels to {}",
                        active.len(),
                        manifest_path(dir).display()
                    ),
                    Err(e) => result = Err(e.into()),
                },
                Err(e) => result = Err(e.into()),
            }
        }

        if !queues.memory.is_empty() {
            tracing::warn!(
                "Discarding {} in-memory requests on close",
                queues.memory.len()
            );
        }

        if let Err(e) = self.dupefilter.close(reason) {
            if result.is_ok() {
                result = Err(e.into());
            } else {
                tracing::error!("Failed to close duplicate filter: {}", e);
            }
        }

        tracing::info!("Scheduler closed ({})", reason);
        result
    }
}

/// Serializes a request for the disk tier
///
/// Fails when the request cannot be persisted: a live callback, an encoding
/// error or a record larger than `max_len` bytes.
fn encode(request: &Request, max_len: usize) -> Result<Vec<u8>, String> {
    let record = request.to_record().map_err(|e| e.to_string())?;
    let bytes = record.to_bytes().map_err(|e| e.to_string())?;
    if bytes.len() > max_len {
        return Err(format!(
            "record of {} bytes exceeds the {} byte limit",
            bytes.len(),
            max_len
        ));
    }
    Ok(bytes)
}
