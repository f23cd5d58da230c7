use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration structure for Sumi-Frontier
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scheduler: SchedulerConfig,
    pub depth: DepthConfig,
}

/// Request scheduling configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Directory holding durable crawl state; absent means memory-only scheduling
    #[serde(rename = "job-dir")]
    pub job_dir: Option<PathBuf>,

    /// Registry name of the durable sub-queue implementation
    #[serde(rename = "disk-queue")]
    pub disk_queue: String,

    /// Registry name of the duplicate filter implementation
    pub dupefilter: String,

    /// Sync every disk push to stable storage before returning
    #[serde(rename = "sync-writes")]
    pub sync_writes: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            job_dir: None,
            disk_queue: "fifo".to_string(),
            dupefilter: "memory".to_string(),
            sync_writes: false,
        }
    }
}

/// Depth policy configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DepthConfig {
    /// Maximum depth a follow-up request may reach (0 = unlimited)
    pub limit: u32,

    /// Weight added to a request's priority per level of depth
    ///
    /// Positive values push deeper requests back (breadth-first), negative
    /// values pull them forward (depth-first), zero disables the adjustment.
    pub priority: i32,

    /// Record depth statistics
    pub stats: bool,

    /// Also record a per-depth request counter
    #[serde(rename = "stats-verbose")]
    pub stats_verbose: bool,
}
