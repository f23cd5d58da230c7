//! Configuration module for Sumi-Frontier
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use sumi_frontier::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("frontier.toml")).unwrap();
//! println!("Depth limit: {}", config.depth.limit);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, DepthConfig, SchedulerConfig};

// Re-export parser functions
pub use parser::{load_config, parse_config};
