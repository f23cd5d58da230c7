//! Crash-free resume of a job directory across scheduler instances

use crate::{disk_scheduler, drain_urls, durable_scheduler, page};
use std::fs;
use std::sync::Arc;
use sumi_frontier::config::parse_config;
use sumi_frontier::scheduler::{read_active, SchedulerError, MANIFEST_FILE, QUEUE_DIR};
use sumi_frontier::stats::{DISK_DEQUEUED, DUPES_FILTERED};
use sumi_frontier::{MemoryStats, Scheduler, StatsCollector};
use tempfile::TempDir;

#[test]
fn test_resume_serves_persisted_requests_in_priority_order() {
    let dir = TempDir::new().unwrap();

    let (mut first, _) = disk_scheduler(&dir);
    first.open().unwrap();
    first.enqueue(page("four-a").with_priority(4)).unwrap();
    first.enqueue(page("two-a").with_priority(2)).unwrap();
    first.enqueue(page("four-b").with_priority(4)).unwrap();
    first.enqueue(page("two-b").with_priority(2)).unwrap();
    first.close("shutdown").unwrap();

    let queue_dir = dir.path().join(QUEUE_DIR);
    assert_eq!(read_active(&queue_dir).unwrap(), vec![2, 4]);

    let (mut second, stats) = disk_scheduler(&dir);
    second.open().unwrap();
    assert_eq!(second.pending_count(), 4);
    assert_eq!(second.disk_levels(), vec![(2, 2), (4, 2)]);

    assert_eq!(
        drain_urls(&mut second),
        vec![
            "https://example.com/two-a",
            "https://example.com/two-b",
            "https://example.com/four-a",
            "https://example.com/four-b",
        ]
    );
    assert_eq!(stats.get_value(DISK_DEQUEUED), Some(4));
    second.close("finished").unwrap();

    // Fully drained job leaves nothing to resume
    assert!(read_active(&queue_dir).unwrap().is_empty());
    let (mut third, _) = disk_scheduler(&dir);
    third.open().unwrap();
    assert!(!third.has_pending());
}

#[test]
fn test_partial_drain_resumes_remainder() {
    let dir = TempDir::new().unwrap();

    let (mut first, _) = disk_scheduler(&dir);
    first.open().unwrap();
    for i in 0..5 {
        first.enqueue(page(&format!("item/{}", i))).unwrap();
    }
    assert_eq!(first.dequeue().unwrap().unwrap().url, "https://example.com/item/0");
    assert_eq!(first.dequeue().unwrap().unwrap().url, "https://example.com/item/1");
    first.close("paused").unwrap();

    let (mut second, _) = disk_scheduler(&dir);
    second.open().unwrap();
    assert_eq!(
        drain_urls(&mut second),
        vec![
            "https://example.com/item/2",
            "https://example.com/item/3",
            "https://example.com/item/4",
        ]
    );
}

#[test]
fn test_request_fields_survive_resume() {
    let dir = TempDir::new().unwrap();

    let mut request = page("form")
        .with_method("POST")
        .with_body(b"q=rust".to_vec())
        .with_meta("source", "sitemap")
        .with_priority(-1)
        .dont_filter();
    request.set_depth(3);

    let (mut first, _) = disk_scheduler(&dir);
    first.open().unwrap();
    first.enqueue(request).unwrap();
    first.close("shutdown").unwrap();

    let (mut second, _) = disk_scheduler(&dir);
    second.open().unwrap();
    let restored = second.dequeue().unwrap().unwrap();

    assert_eq!(restored.url, "https://example.com/form");
    assert_eq!(restored.method, "POST");
    assert_eq!(restored.body, b"q=rust".to_vec());
    assert_eq!(restored.priority, -1);
    assert_eq!(restored.depth(), Some(3));
    assert!(restored.dont_filter);
    assert_eq!(
        restored.meta.get("source").and_then(|v| v.as_str()),
        Some("sitemap")
    );
}

#[test]
fn test_sqlite_seen_set_survives_resume() {
    let dir = TempDir::new().unwrap();

    let (mut first, _) = durable_scheduler(&dir);
    first.open().unwrap();
    assert!(first.enqueue(page("a")).unwrap());
    first.close("shutdown").unwrap();

    let (mut second, stats) = durable_scheduler(&dir);
    second.open().unwrap();
    assert!(!second.enqueue(page("a")).unwrap());
    assert!(second.enqueue(page("b")).unwrap());
    assert_eq!(stats.get_value(DUPES_FILTERED), Some(1));

    assert_eq!(
        drain_urls(&mut second),
        vec!["https://example.com/a", "https://example.com/b"]
    );
}

#[test]
fn test_malformed_manifest_refuses_to_open() {
    let dir = TempDir::new().unwrap();
    let queue_dir = dir.path().join(QUEUE_DIR);
    fs::create_dir_all(&queue_dir).unwrap();
    fs::write(queue_dir.join(MANIFEST_FILE), "{\"levels\": [1]}").unwrap();

    let (mut scheduler, _) = disk_scheduler(&dir);
    assert!(matches!(scheduler.open(), Err(SchedulerError::Storage(_))));
}

#[test]
fn test_scheduler_from_toml_config() {
    let dir = TempDir::new().unwrap();
    let toml = format!(
        r#"
[scheduler]
job-dir = "{}"
dupefilter = "sqlite"
sync-writes = true
"#,
        dir.path().display()
    );
    let config = parse_config(&toml).unwrap();

    let stats = Arc::new(MemoryStats::new());
    let mut scheduler = Scheduler::from_config(&config.scheduler, stats.clone()).unwrap();
    scheduler.open().unwrap();
    scheduler.enqueue(page("configured").with_priority(1)).unwrap();
    scheduler.close("shutdown").unwrap();

    assert!(dir.path().join("requests.seen.db").exists());
    assert_eq!(read_active(&dir.path().join(QUEUE_DIR)).unwrap(), vec![1]);

    let mut resumed = Scheduler::from_config(&config.scheduler, stats).unwrap();
    resumed.open().unwrap();
    assert!(!resumed.enqueue(page("configured")).unwrap());
    assert_eq!(drain_urls(&mut resumed), vec!["https://example.com/configured"]);
}
