//! Crawl statistics collection
//!
//! The scheduler and the depth middleware report counters and gauges through
//! the `StatsCollector` trait. `MemoryStats` is the in-process implementation.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

/// Stat key: requests routed to the disk tier
pub const DISK_ENQUEUED: &str = "scheduler/disk_enqueued";
/// Stat key: requests routed to the memory tier
pub const MEMORY_ENQUEUED: &str = "scheduler/memory_enqueued";
/// Stat key: requests served from the memory tier
pub const MEMORY_DEQUEUED: &str = "scheduler/dequeued/memory";
/// Stat key: requests served from the disk tier
pub const DISK_DEQUEUED: &str = "scheduler/dequeued/disk";
/// Stat key: requests dropped as duplicates
pub const DUPES_FILTERED: &str = "dupefilter/filtered";
/// Stat key: deepest request depth accepted so far
pub const DEPTH_MAX: &str = "request_depth_max";

/// Stat key counting accepted requests at `depth`
pub fn depth_count_key(depth: u32) -> String {
    format!("request_depth_count/{}", depth)
}

/// Sink for crawl statistics
pub trait StatsCollector: Send + Sync {
    /// Adds `by` to the counter `key`, starting from zero
    fn inc_value(&self, key: &str, by: i64);

    /// Raises the gauge `key` to `value` if it is larger than the current value
    fn max_value(&self, key: &str, value: i64);

    /// Overwrites the value of `key`
    fn set_value(&self, key: &str, value: i64);

    fn get_value(&self, key: &str) -> Option<i64>;

    /// All recorded values, sorted by key
    fn snapshot(&self) -> BTreeMap<String, i64>;
}

/// In-memory statistics collector
#[derive(Debug, Default)]
pub struct MemoryStats {
    values: Mutex<HashMap<String, i64>>,
}

impl MemoryStats {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_values<R>(&self, f: impl FnOnce(&mut HashMap<String, i64>) -> R) -> R {
        // Counters stay valid after a panicking writer
        let mut values = match self.values.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut values)
    }
}

impl StatsCollector for MemoryStats {
    fn inc_value(&self, key: &str, by: i64) {
        self.with_values(|values| *values.entry(key.to_string()).or_insert(0) += by);
    }

    fn max_value(&self, key: &str, value: i64) {
        self.with_values(|values| {
            let current = values.entry(key.to_string()).or_insert(value);
            if value > *current {
                *current = value;
            }
        });
    }

    fn set_value(&self, key: &str, value: i64) {
        self.with_values(|values| {
            values.insert(key.to_string(), value);
        });
    }

    fn get_value(&self, key: &str) -> Option<i64> {
        self.with_values(|values| values.get(key).copied())
    }

    fn snapshot(&self) -> BTreeMap<String, i64> {
        self.with_values(|values| values.iter().map(|(k, v)| (k.clone(), *v)).collect())
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_stats(stats: &dyn StatsCollector) {
    let snapshot = stats.snapshot();

    println!("=== Scheduler Statistics ===\n");

    if snapshot.is_empty() {
        println!("  (no statistics recorded)");
        return;
    }

    let width = snapshot.keys().map(String::len).max().unwrap_or(0);
    for (key, value) in &snapshot {
        println!("  {:<width$}  {}", key, value, width = width);
    }

    let disk = snapshot.get(DISK_ENQUEUED).copied().unwrap_or(0);
    let memory = snapshot.get(MEMORY_ENQUEUED).copied().unwrap_or(0);
    let total = disk + memory;
    if total > 0 {
        println!(
            "\nDurable share: {:.1}% ({} / {} requests enqueued on disk)",
            disk as f64 / total as f64 * 100.0,
            disk,
            total
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inc_value_starts_at_zero() {
        let stats = MemoryStats::new();
        stats.inc_value(DISK_ENQUEUED, 1);
        stats.inc_value(DISK_ENQUEUED, 2);

        assert_eq!(stats.get_value(DISK_ENQUEUED), Some(3));
        assert_eq!(stats.get_value(MEMORY_ENQUEUED), None);
    }

    #[test]
    fn test_max_value_only_raises() {
        let stats = MemoryStats::new();
        stats.max_value(DEPTH_MAX, 2);
        stats.max_value(DEPTH_MAX, 5);
        stats.max_value(DEPTH_MAX, 3);

        assert_eq!(stats.get_value(DEPTH_MAX), Some(5));
    }

    #[test]
    fn test_max_value_accepts_negative_first_value() {
        let stats = MemoryStats::new();
        stats.max_value("gauge", -4);
        assert_eq!(stats.get_value("gauge"), Some(-4));
    }

    #[test]
    fn test_snapshot_is_sorted() {
        let stats = MemoryStats::new();
        stats.set_value("b", 2);
        stats.set_value("a", 1);

        let keys: Vec<_> = stats.snapshot().into_keys().collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn test_depth_count_key() {
        assert_eq!(depth_count_key(3), "request_depth_count/3");
    }
}
