//! Queue module for pending requests
//!
//! This module provides:
//! - The `FifoQueue` capability shared by every sub-queue
//! - `MemoryQueue`: in-process FIFO, lost on restart
//! - `FifoDiskQueue`: durable FIFO backed by an append-only file
//! - `PriorityQueue`: per-priority buckets of FIFOs behind one push/pop surface
//! - `DiskQueueKind`: registry of durable sub-queue implementations

mod disk;
mod memory;
mod priority;

pub use disk::{FifoDiskQueue, MAX_RECORD_LEN};
pub use memory::MemoryQueue;
pub use priority::PriorityQueue;

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during queue operations
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Queue IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt queue file {path}: {message}")]
    Corrupt { path: PathBuf, message: String },

    #[error("Record of {0} bytes exceeds the maximum frame size")]
    RecordTooLarge(usize),

    #[error("Queue is closed")]
    Closed,

    #[error("Unknown disk queue implementation: {0}")]
    UnknownKind(String),
}

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;

/// First-in first-out queue capability
///
/// Implemented by both the memory and the disk tier so a single
/// [`PriorityQueue`] can serve either.
pub trait FifoQueue {
    type Item;

    /// Appends an item at the back of the queue
    fn push(&mut self, item: Self::Item) -> QueueResult<()>;

    /// Removes and returns the oldest item, or `None` when empty
    fn pop(&mut self) -> QueueResult<Option<Self::Item>>;

    /// Number of items still queued
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Releases the queue's resources and returns how many items remain
    fn close(&mut self) -> QueueResult<usize>;
}

impl<Q: FifoQueue + ?Sized> FifoQueue for Box<Q> {
    type Item = Q::Item;

    fn push(&mut self, item: Self::Item) -> QueueResult<()> {
        (**self).push(item)
    }

    fn pop(&mut self) -> QueueResult<Option<Self::Item>> {
        (**self).pop()
    }

    fn len(&self) -> usize {
        (**self).len()
    }

    fn close(&mut self) -> QueueResult<usize> {
        (**self).close()
    }
}

/// A durable sub-queue holding serialized request records
pub type DiskQueue = Box<dyn FifoQueue<Item = Vec<u8>>>;

/// Registry of durable sub-queue implementations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskQueueKind {
    /// Length-prefixed frames appended to one file per priority level
    Fifo,
}

impl DiskQueueKind {
    /// Names accepted in configuration
    pub const NAMES: &'static [&'static str] = &["fifo"];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "fifo" => Some(Self::Fifo),
            _ => None,
        }
    }

    /// Resolves a configured name, failing on unknown implementations
    pub fn resolve(name: &str) -> QueueResult<Self> {
        Self::from_name(name).ok_or_else(|| QueueError::UnknownKind(name.to_string()))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Fifo => "fifo",
        }
    }

    /// Largest serialized record this implementation can store
    pub fn max_record_len(&self) -> usize {
        match self {
            Self::Fifo => MAX_RECORD_LEN,
        }
    }

    /// Opens (or resumes) the sub-queue stored at `path`
    pub fn open(&self, path: &Path, sync_writes: bool) -> QueueResult<DiskQueue> {
        match self {
            Self::Fifo => Ok(Box::new(FifoDiskQueue::open(path, sync_writes)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disk_queue_kind_names() {
        for name in DiskQueueKind::NAMES {
            let kind = DiskQueueKind::from_name(name).unwrap();
            assert_eq!(kind.name(), *name);
        }
    }

    #[test]
    fn test_resolve_unknown_kind() {
        let err = DiskQueueKind::resolve("marshal").unwrap_err();
        assert!(matches!(err, QueueError::UnknownKind(ref n) if n == "marshal"));
    }

    #[test]
    fn test_boxed_queue_delegates() {
        let mut queue: Box<dyn FifoQueue<Item = u32>> = Box::new(MemoryQueue::new());
        queue.push(1).unwrap();
        queue.push(2).unwrap();

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop().unwrap(), Some(1));
        assert_eq!(queue.close().unwrap(), 1);
    }
}
