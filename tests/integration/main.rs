//! Integration tests for Sumi-Frontier
//!
//! These drive the public API the way a crawl loop would: open a scheduler on
//! a job directory, feed it requests through the depth middleware, close it
//! and resume from what was persisted.

mod crawl_loop_tests;
mod resume_tests;

use std::sync::Arc;
use sumi_frontier::dupefilter::{MemoryDupeFilter, SqliteDupeFilter, SEEN_DB_FILE};
use sumi_frontier::{MemoryStats, Request, Scheduler};
use tempfile::TempDir;

/// Creates a scheduler persisting into `dir` with an in-memory seen-set
pub fn disk_scheduler(dir: &TempDir) -> (Scheduler, Arc<MemoryStats>) {
    let stats = Arc::new(MemoryStats::new());
    let scheduler = Scheduler::new(
        Box::new(MemoryDupeFilter::new()),
        Some(dir.path().to_path_buf()),
        stats.clone(),
    );
    (scheduler, stats)
}

/// Creates a scheduler persisting both queue and seen-set into `dir`
pub fn durable_scheduler(dir: &TempDir) -> (Scheduler, Arc<MemoryStats>) {
    let stats = Arc::new(MemoryStats::new());
    let scheduler = Scheduler::new(
        Box::new(SqliteDupeFilter::new(dir.path().join(SEEN_DB_FILE))),
        Some(dir.path().to_path_buf()),
        stats.clone(),
    );
    (scheduler, stats)
}

/// Dequeues everything still pending and returns the URLs in serve order
pub fn drain_urls(scheduler: &mut Scheduler) -> Vec<String> {
    let mut urls = Vec::new();
    while let Some(request) = scheduler.dequeue().expect("dequeue failed") {
        urls.push(request.url);
    }
    urls
}

pub fn page(path: &str) -> Request {
    Request::new(format!("https://example.com/{}", path))
}
