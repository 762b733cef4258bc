//! Command-line interface for the benchmark.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::config::BenchmarkConfig;
use crate::util::parse_bytes;
use crate::Result;

/// Measure how sequential write throughput of a volume scales with threads.
///
/// Writes a random block from 1, 2, 3, ... threads at once, each thread into
/// its own file, until throughput drops on consecutive trials.
#[derive(Parser, Debug)]
#[command(name = "storagemeter")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory on the volume under test (created and removed if missing).
    #[arg(value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Configuration file to use instead of the standard location.
    #[arg(short = 'c', long, value_name = "FILE", env = "STORAGEMETER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Initial block size, e.g. 100MiB or 64KiB.
    #[arg(short = 'b', long, value_parser = parse_block_size)]
    pub block_size: Option<usize>,

    /// Times each thread writes the block per trial.
    #[arg(short = 'r', long)]
    pub repeat: Option<u32>,

    /// Time budget for the single-threaded trial, e.g. 2s or 1500ms.
    #[arg(long, value_parser = humantime::parse_duration)]
    pub max_duration: Option<Duration>,

    /// Consecutive slower trials that end the sweep.
    #[arg(long)]
    pub max_slow_trials: Option<u32>,

    /// Stop after this many threads even if throughput still improves.
    #[arg(short = 't', long)]
    pub max_threads: Option<usize>,

    /// Keep the benchmark files after the run.
    #[arg(long)]
    pub keep_files: bool,

    /// Write the full report as JSON to this path.
    #[arg(long, value_name = "PATH")]
    pub json: Option<PathBuf>,

    /// Append the report to the results history.
    #[arg(long)]
    pub save: bool,

    /// Print the last N saved reports and exit.
    #[arg(long, value_name = "N", conflicts_with_all = ["save", "json", "save_config"])]
    pub history: Option<usize>,

    /// Store the resolved settings as the default configuration file and exit.
    #[arg(long)]
    pub save_config: bool,

    /// Show progress logs (RUST_LOG overrides).
    #[arg(short, long)]
    pub verbose: bool,
}

fn parse_block_size(input: &str) -> std::result::Result<usize, String> {
    let bytes = parse_bytes(input)?;
    usize::try_from(bytes).map_err(|_| format!("Block size too large: {}", input))
}

impl Cli {
    /// Configuration file (or defaults) with command-line overrides applied
    pub fn resolve_config(&self) -> Result<BenchmarkConfig> {
        let mut config = match &self.config {
            Some(path) => BenchmarkConfig::load_from(path)?,
            None => BenchmarkConfig::load()?,
        };

        if let Some(dir) = &self.dir {
            config.test_dir = dir.clone();
        }
        if let Some(block_size) = self.block_size {
            config.block_size = block_size;
        }
        if let Some(repeat) = self.repeat {
            config.repeat_count = repeat;
        }
        if let Some(max_duration) = self.max_duration {
            config.max_trial_duration = max_duration;
        }
        if let Some(max_slow_trials) = self.max_slow_trials {
            config.max_slow_trials = max_slow_trials;
        }
        if self.max_threads.is_some() {
            config.max_threads = self.max_threads;
        }
        if self.keep_files {
            config.keep_files = true;
        }

        config.validate()?;
        Ok(config)
    }
}
