use crate::config::types::{Config, SchedulerConfig};
use crate::dupefilter::DupeFilterKind;
use crate::queue::DiskQueueKind;
use crate::ConfigError;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_scheduler_config(&config.scheduler)?;
    Ok(())
}

/// Validates scheduler configuration
///
/// Registry names are resolved here so a typo fails at load time rather than
/// when the scheduler is first opened.
fn validate_scheduler_config(config: &SchedulerConfig) -> Result<(), ConfigError> {
    if let Some(job_dir) = &config.job_dir {
        if job_dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "job-dir cannot be empty (omit it for memory-only scheduling)".to_string(),
            ));
        }
    }

    if DiskQueueKind::from_name(&config.disk_queue).is_none() {
        return Err(ConfigError::Validation(format!(
            "Unknown disk-queue '{}', expected one of: {}",
            config.disk_queue,
            DiskQueueKind::NAMES.join(", ")
        )));
    }

    if DupeFilterKind::from_name(&config.dupefilter).is_none() {
        return Err(ConfigError::Validation(format!(
            "Unknown dupefilter '{}', expected one of: {}",
            config.dupefilter,
            DupeFilterKind::NAMES.join(", ")
        )));
    }

    Ok(())
}
