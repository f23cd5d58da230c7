//! Sumi-Frontier main entry point
//!
//! Command-line access to a crawl job's scheduler state: seed requests into
//! a job directory, inspect what is pending, or drain requests out of it.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use sumi_frontier::config::{load_config, Config};
use sumi_frontier::ConfigError;
use sumi_frontier::scheduler::{read_active, Scheduler};
use sumi_frontier::stats::{print_stats, MemoryStats, StatsCollector, DISK_DEQUEUED};
use sumi_frontier::Request;
use tracing_subscriber::EnvFilter;

/// Sumi-Frontier: request scheduling for polite crawls
///
/// Operates on the job directory named in the configuration file. Requests
/// seeded here are picked up by the next crawl that resumes the job.
#[derive(Parser, Debug)]
#[command(name = "sumi-frontier")]
#[command(version = "1.0.0")]
#[command(about = "Request scheduling for polite crawls", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Enqueue a seed URL (repeatable)
    #[arg(long, value_name = "URL", conflicts_with_all = ["inspect", "drain"])]
    seed: Vec<String>,

    /// Priority for seeded requests (lower is served first)
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    priority: i32,

    /// Show pending requests per tier and priority level
    #[arg(long, conflicts_with = "drain")]
    inspect: bool,

    /// Dequeue pending requests and print them as JSON lines
    #[arg(long)]
    drain: bool,

    /// Maximum number of requests to drain
    #[arg(long, requires = "drain")]
    limit: Option<usize>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = load_config(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;

    if !cli.seed.is_empty() {
        handle_seed(&config, &cli.seed, cli.priority).context("Seeding failed")
    } else if cli.drain {
        handle_drain(&config, cli.limit).context("Draining failed")
    } else {
        handle_inspect(&config).context("Inspection failed")
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// Logs go to stderr so drained requests on stdout stay machine-readable.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_frontier=info,warn"),
            1 => EnvFilter::new("sumi_frontier=debug,info"),
            2 => EnvFilter::new("sumi_frontier=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn open_scheduler(config: &Config, stats: Arc<MemoryStats>) -> sumi_frontier::Result<Scheduler> {
    let mut scheduler = Scheduler::from_config(&config.scheduler, stats)?;
    scheduler.open()?;
    Ok(scheduler)
}

/// Handles --seed: enqueues root requests into the job directory
fn handle_seed(config: &Config, seeds: &[String], priority: i32) -> sumi_frontier::Result<()> {
    if config.scheduler.job_dir.is_none() {
        return Err(ConfigError::Validation(
            "Seeding requires scheduler.job-dir; memory-only seeds would be lost on exit"
                .to_string(),
        )
        .into());
    }

    let requests = seeds
        .iter()
        .map(|seed| Request::parse(seed))
        .collect::<Result<Vec<_>, _>>()?;

    let stats = Arc::new(MemoryStats::new());
    let mut scheduler = open_scheduler(config, stats.clone())?;

    for request in requests {
        let mut request = request.with_priority(priority);
        request.set_depth(0);
        let seed = request.url.clone();

        if scheduler.enqueue(request)? {
            println!("+ {}", seed);
        } else {
            println!("= {} (already seen)", seed);
        }
    }

    println!("\n{} requests pending", scheduler.pending_count());
    scheduler.close("seeded")?;

    println!();
    print_stats(stats.as_ref());
    Ok(())
}

/// Handles --inspect: shows configuration and pending requests
fn handle_inspect(config: &Config) -> sumi_frontier::Result<()> {
    println!("=== Sumi-Frontier Job ===\n");

    println!("Scheduler:");
    match &config.scheduler.job_dir {
        Some(dir) => println!("  Job directory: {}", dir.display()),
        None => println!("  Job directory: (none, memory-only)"),
    }
    println!("  Disk queue: {}", config.scheduler.disk_queue);
    println!("  Dupefilter: {}", config.scheduler.dupefilter);
    println!("  Sync writes: {}", config.scheduler.sync_writes);

    println!("\nDepth policy:");
    if config.depth.limit == 0 {
        println!("  Limit: unlimited");
    } else {
        println!("  Limit: {}", config.depth.limit);
    }
    println!("  Priority weight: {}", config.depth.priority);
    println!(
        "  Stats: {}{}",
        config.depth.stats,
        if config.depth.stats_verbose { " (verbose)" } else { "" }
    );

    if config.scheduler.job_dir.is_none() {
        println!("\nNothing is persisted without a job directory.");
        return Ok(());
    }

    let stats = Arc::new(MemoryStats::new());
    let mut scheduler = open_scheduler(config, stats)?;

    if let Some(queue_dir) = scheduler.queue_dir() {
        let recorded = read_active(queue_dir)?;
        println!("\nManifest levels: {:?}", recorded);
    }

    let levels = scheduler.disk_levels();
    println!("\nPending requests: {}", scheduler.pending_count());
    if levels.is_empty() {
        println!("  (disk tier is empty)");
    }
    for (priority, count) in levels {
        println!("  priority {:>5}: {}", priority, count);
    }

    scheduler.close("inspect")?;
    Ok(())
}

/// Handles --drain: dequeues requests and prints them as JSON lines
fn handle_drain(config: &Config, limit: Option<usize>) -> sumi_frontier::Result<()> {
    let stats = Arc::new(MemoryStats::new());
    let mut scheduler = open_scheduler(config, stats.clone())?;

    let mut drained = 0usize;
    while limit.map_or(true, |limit| drained < limit) {
        let request = match scheduler.dequeue()? {
            Some(request) => request,
            None => break,
        };
        let record = request.to_record()?;
        println!("{}", serde_json::to_string(&record)?);
        drained += 1;
    }

    tracing::info!(
        "Drained {} requests ({} from disk), {} still pending",
        drained,
        stats.get_value(DISK_DEQUEUED).unwrap_or(0),
        scheduler.pending_count()
    );

    scheduler.close("drained")?;
    Ok(())
}
