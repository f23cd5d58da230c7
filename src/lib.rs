//! Sumi-Frontier: request scheduling core for a polite web crawler
//!
//! This crate decides, for a single crawl job, which pending request runs next.
//! It combines a two-tier priority queue (memory plus an optional durable disk
//! tier under a job directory), crash resumption from a persisted manifest, a
//! pluggable duplicate-request filter and a depth policy that stamps, reprioritizes
//! and prunes follow-up requests.

pub mod config;
pub mod dupefilter;
pub mod middleware;
pub mod queue;
pub mod request;
pub mod scheduler;
pub mod stats;

use thiserror::Error;

/// Main error type for Sumi-Frontier operations
#[derive(Debug, Error)]
pub enum FrontierError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] scheduler::SchedulerError),

    #[error("Queue error: {0}")]
    Queue(#[from] queue::QueueError),

    #[error("Duplicate filter error: {0}")]
    Filter(#[from] dupefilter::FilterError),

    #[error("Storage error: {0}")]
    Storage(#[from] scheduler::StorageError),

    #[error("Request error: {0}")]
    Request(#[from] request::RequestError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias for Sumi-Frontier operations
pub type Result<T> = std::result::Result<T, FrontierError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use dupefilter::{DupeFilter, DupeFilterKind};
pub use middleware::{DepthMiddleware, Response, SpiderOutput};
pub use queue::{DiskQueueKind, FifoQueue, PriorityQueue};
pub use request::{Callback, Request};
pub use scheduler::Scheduler;
pub use stats::{MemoryStats, StatsCollector};

#[cfg(test)]
mod tests {
    use super::*;

    fn seed(url: &str, job_dir: Option<&str>) -> Result<Request> {
        if job_dir.is_none() {
            return Err(ConfigError::Validation("job-dir is required".to_string()).into());
        }
        Ok(Request::parse(url)?)
    }

    #[test]
    fn test_module_errors_convert() {
        assert!(seed("https://example.com/", Some("jobs")).is_ok());
        assert!(matches!(
            seed("https://example.com/", None),
            Err(FrontierError::Config(ConfigError::Validation(_)))
        ));
        assert!(matches!(
            seed("not a url", Some("jobs")),
            Err(FrontierError::Request(_))
        ));
    }

    #[test]
    fn test_error_messages_name_the_layer() {
        let err: FrontierError = scheduler::SchedulerError::NotOpen.into();
        assert_eq!(err.to_string(), "Scheduler error: Scheduler is not open");
    }
}
