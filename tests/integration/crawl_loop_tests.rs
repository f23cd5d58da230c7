//! Depth middleware feeding the scheduler, as a crawl loop would wire them

use crate::{disk_scheduler, drain_urls, page};
use serde_json::json;
use std::sync::Arc;
use sumi_frontier::config::DepthConfig;
use sumi_frontier::stats::{depth_count_key, DEPTH_MAX};
use sumi_frontier::{DepthMiddleware, MemoryStats, Request, Response, SpiderOutput, StatsCollector};
use tempfile::TempDir;

fn depth_config(limit: u32, priority: i32) -> DepthConfig {
    DepthConfig {
        limit,
        priority,
        stats: true,
        stats_verbose: true,
    }
}

/// Runs the middleware over `children` of `parent` and enqueues the survivors
fn follow(
    middleware: &DepthMiddleware,
    scheduler: &mut sumi_frontier::Scheduler,
    parent: Request,
    children: &[&str],
) -> Vec<serde_json::Value> {
    let mut response = Response::new(parent);
    let mut output: Vec<SpiderOutput> = children.iter().map(|c| page(c).into()).collect();
    output.push(json!({"title": "parent page"}).into());

    let mut items = Vec::new();
    for out in middleware.process_spider_output(&mut response, output) {
        match out {
            SpiderOutput::Request(request) => {
                scheduler.enqueue(request).unwrap();
            }
            SpiderOutput::Item(item) => items.push(item),
        }
    }
    items
}

#[test]
fn test_depth_limit_prunes_crawl_frontier() {
    let dir = TempDir::new().unwrap();
    let (mut scheduler, _) = disk_scheduler(&dir);
    let stats = Arc::new(MemoryStats::new());
    let middleware = DepthMiddleware::new(&depth_config(2, 0), Some(stats.clone()));
    scheduler.open().unwrap();

    let seed = page("seed");
    let items = follow(&middleware, &mut scheduler, seed, &["l1"]);
    assert_eq!(items.len(), 1);

    let l1 = scheduler.dequeue().unwrap().unwrap();
    assert_eq!(l1.depth(), Some(1));
    follow(&middleware, &mut scheduler, l1, &["l2"]);

    let l2 = scheduler.dequeue().unwrap().unwrap();
    assert_eq!(l2.depth(), Some(2));
    follow(&middleware, &mut scheduler, l2, &["l3"]);

    // Depth 3 exceeds the limit and never reaches the scheduler
    assert!(!scheduler.has_pending());
    assert_eq!(stats.get_value(DEPTH_MAX), Some(2));
    assert_eq!(stats.get_value(&depth_count_key(0)), Some(1));
    assert_eq!(stats.get_value(&depth_count_key(1)), Some(1));
    assert_eq!(stats.get_value(&depth_count_key(2)), Some(1));
    assert_eq!(stats.get_value(&depth_count_key(3)), None);
}

#[test]
fn test_positive_weight_serves_shallow_requests_first() {
    let dir = TempDir::new().unwrap();
    let (mut scheduler, _) = disk_scheduler(&dir);
    let middleware = DepthMiddleware::new(&depth_config(0, 1), None);
    scheduler.open().unwrap();

    let mut deep_parent = page("deep-parent");
    deep_parent.set_depth(3);
    follow(&middleware, &mut scheduler, deep_parent, &["deep"]);

    let mut shallow_parent = page("shallow-parent");
    shallow_parent.set_depth(0);
    follow(&middleware, &mut scheduler, shallow_parent, &["shallow"]);

    assert_eq!(scheduler.disk_levels(), vec![(1, 1), (4, 1)]);
    assert_eq!(
        drain_urls(&mut scheduler),
        vec!["https://example.com/shallow", "https://example.com/deep"]
    );
}

#[test]
fn test_negative_weight_serves_deep_requests_first() {
    let dir = TempDir::new().unwrap();
    let (mut scheduler, _) = disk_scheduler(&dir);
    let middleware = DepthMiddleware::new(&depth_config(0, -1), None);
    scheduler.open().unwrap();

    let mut shallow_parent = page("shallow-parent");
    shallow_parent.set_depth(0);
    follow(&middleware, &mut scheduler, shallow_parent, &["shallow"]);

    let mut deep_parent = page("deep-parent");
    deep_parent.set_depth(3);
    follow(&middleware, &mut scheduler, deep_parent, &["deep"]);

    assert_eq!(
        drain_urls(&mut scheduler),
        vec!["https://example.com/deep", "https://example.com/shallow"]
    );
}

#[test]
fn test_rediscovered_links_are_not_rescheduled() {
    let dir = TempDir::new().unwrap();
    let (mut scheduler, _) = disk_scheduler(&dir);
    let middleware = DepthMiddleware::new(&depth_config(0, 0), None);
    scheduler.open().unwrap();

    follow(&middleware, &mut scheduler, page("a"), &["shared", "only-a"]);
    follow(&middleware, &mut scheduler, page("b"), &["shared#section", "only-b"]);

    assert_eq!(
        drain_urls(&mut scheduler),
        vec![
            "https://example.com/shared",
            "https://example.com/only-a",
            "https://example.com/only-b",
        ]
    );
}

#[test]
fn test_close_is_idempotent_after_crawl() {
    let dir = TempDir::new().unwrap();
    let (mut scheduler, _) = disk_scheduler(&dir);
    scheduler.open().unwrap();
    scheduler.enqueue(page("left-over")).unwrap();

    scheduler.close("finished").unwrap();
    scheduler.close("finished").unwrap();
    assert!(!scheduler.has_pending());
}
