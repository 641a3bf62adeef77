// SPDX-License-Identifier: MIT
// dispatchpool-demo: load generator for the bounded job dispatcher
//
// - Submits a batch of sleeping jobs to a Dispatcher.
// - Reports how long the batch took and what the dispatcher counted.
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use anyhow::Context;
use clap::Parser;
use dispatchpool::{ClosureJob, Dispatcher, DispatcherConfig, StatsSnapshot};
use log::{debug, info};
use serde::Serialize;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// JSON file with a dispatcher configuration. Flags given on the command line win.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Number of worker threads
    #[arg(long)]
    workers: Option<usize>,

    /// Number of jobs the backlog holds before submit blocks
    #[arg(long = "queue-capacity")]
    queue_capacity: Option<usize>,

    /// Number of jobs to submit
    #[arg(long, default_value_t = 20)]
    jobs: usize,

    /// How long every job sleeps
    #[arg(long = "job-duration-ms", default_value_t = 100)]
    job_duration_ms: u64,

    /// Make every n-th job panic, to watch the workers survive it
    #[arg(long = "panic-every", value_name = "N")]
    panic_every: Option<usize>,

    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct RunSummary {
    workers: usize,
    queue_capacity: usize,
    jobs: usize,
    job_duration_ms: u64,
    elapsed_ms: u128,
    stats: StatsSnapshot,
}

fn validate_args(args: &Args) -> Result<(), String> {
    if args.workers == Some(0) {
        return Err("--workers must be at least 1".into());
    }
    if args.panic_every == Some(0) {
        return Err("--panic-every must be at least 1".into());
    }
    Ok(())
}

fn load_config(args: &Args) -> anyhow::Result<DispatcherConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("failed to parse {}", path.display()))?
        }
        None => DispatcherConfig::default(),
    };
    if let Some(workers) = args.workers {
        config.max_workers = workers;
    }
    if let Some(queue_capacity) = args.queue_capacity {
        config.queue_capacity = queue_capacity;
    }
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if let Err(e) = validate_args(&args) {
        eprintln!("Error: {e}");
        std::process::exit(2);
    }

    let config = load_config(&args)?;
    debug!("Using {:?}", config);
    let dispatcher =
        Dispatcher::with_config(config.clone()).context("failed to create the dispatcher")?;
    dispatcher.start().context("failed to start the dispatcher")?;

    let job_duration = Duration::from_millis(args.job_duration_ms);
    let started = Instant::now();
    for i in 0..args.jobs {
        let panics = args.panic_every.is_some_and(|n| (i + 1) % n == 0);
        dispatcher.submit(ClosureJob::boxed(format!("sleep #{i}"), move || {
            thread::sleep(job_duration);
            if panics {
                panic!("job #{i} failed on purpose");
            }
        }))?;
        debug!("Submitted job #{i}, {} queued", dispatcher.queued_count());
    }

    info!("All {} jobs submitted, waiting for them to finish", args.jobs);
    dispatcher.wait();
    let elapsed = started.elapsed();
    dispatcher.shutdown()?;

    let summary = RunSummary {
        workers: config.max_workers,
        queue_capacity: config.queue_capacity,
        jobs: args.jobs,
        job_duration_ms: args.job_duration_ms,
        elapsed_ms: elapsed.as_millis(),
        stats: dispatcher.stats(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "{} jobs on {} workers (backlog {}) took {} ms: {} completed, {} panicked",
            summary.jobs,
            summary.workers,
            summary.queue_capacity,
            summary.elapsed_ms,
            summary.stats.completed,
            summary.stats.panicked
        );
    }
    Ok(())
}
