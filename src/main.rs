use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use storagemeter::bench::{BenchmarkDriver, SweepEvent};
use storagemeter::cli::Cli;
use storagemeter::config::BenchmarkConfig;
use storagemeter::config::persistence::ResultsStorage;
use storagemeter::error::user_friendly_message;
use storagemeter::io::TestDirectory;
use storagemeter::util::{format_bytes, format_millis, format_throughput};
use storagemeter::{Result, StorageMeterError};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise quiet unless --verbose
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("info")
        } else {
            EnvFilter::new("warn")
        }
    });
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "benchmark failed");
            eprintln!("{}", user_friendly_message(&e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    if let Some(count) = cli.history {
        return print_history(count);
    }

    let config = cli.resolve_config()?;
    if cli.save_config {
        config.save()?;
        println!(
            "Configuration saved to {}",
            BenchmarkConfig::config_file_path()?.display()
        );
        return Ok(());
    }

    let mut test_dir = TestDirectory::prepare(&config.test_dir, config.keep_files)?;
    println!("Testing {}", test_dir.path().display());

    let repeat_count = config.repeat_count;
    let driver = BenchmarkDriver::new(config)?;

    let (tx, rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(print_events(rx, repeat_count));

    let report = tokio::task::spawn_blocking(move || driver.run(Some(&tx)))
        .await
        .map_err(|e| StorageMeterError::WorkerError(format!("Benchmark task failed: {}", e)))??;
    printer.await.ok();
    test_dir.record_threads(report.max_threads_tested);

    println!("{}", report.summary());

    if let Some(path) = &cli.json {
        report.write_json(path)?;
        println!("Report written to {}", path.display());
    }
    if cli.save {
        let storage = ResultsStorage::new()?;
        storage.append_report(report)?;
        println!("Report saved to {}", storage.path().display());
    }

    drop(test_dir);
    Ok(())
}

fn print_history(count: usize) -> Result<()> {
    let storage = ResultsStorage::new()?;
    let reports = storage.recent_reports(count)?;
    if reports.is_empty() {
        println!("No saved reports in {}", storage.path().display());
    }
    for report in reports {
        println!("{}", report.summary());
    }
    Ok(())
}

/// Render sweep events as the per-trial report while a spinner shows what is running
async fn print_events(mut rx: mpsc::UnboundedReceiver<SweepEvent>, repeat_count: u32) {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner} [{elapsed}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message("Generating random data...");

    while let Some(event) = rx.recv().await {
        match event {
            SweepEvent::BlockGenerated { size } => {
                pb.println(format!(
                    "Generating random data... done ({})",
                    format_bytes(size as u64)
                ));
                pb.set_message("1 thread writing...");
            }
            SweepEvent::Calibrated(calibration) => {
                if calibration.was_shrunk() {
                    pb.println(format!(
                        "Block shrunk from {} to {} to fit the trial budget",
                        format_bytes(calibration.original_block_size as u64),
                        format_bytes(calibration.block_size as u64)
                    ));
                }
                pb.println(format!(
                    "1 thread: {}, speed: {}, data size per thread: {}\n-----",
                    format_millis(calibration.elapsed),
                    format_throughput(calibration.throughput),
                    format_bytes(calibration.block_size as u64 * repeat_count as u64)
                ));
            }
            SweepEvent::TrialStarted { thread_count } => {
                pb.set_message(format!("{} threads writing...", thread_count));
            }
            SweepEvent::TrialCompleted(trial) => {
                let numbered = trial.thread_durations.iter().copied().enumerate();
                for line in thread_lines(numbered.map(|(index, elapsed)| (index + 1, elapsed))) {
                    pb.println(line);
                }
                pb.println(format!(
                    "Average write time: {}, speed: {}\n-----",
                    format_millis(trial.average),
                    format_throughput(trial.throughput)
                ));
            }
            SweepEvent::TrialFailed {
                thread_count,
                message,
                completed,
            } => {
                for line in thread_lines(completed) {
                    pb.println(line);
                }
                pb.println(format!("Trial with {} threads failed: {}", thread_count, message));
            }
            SweepEvent::Finished {
                max_threads_tested,
                stop_reason,
            } => {
                pb.println(format!(
                    "Max threads tested: {} ({})",
                    max_threads_tested,
                    stop_reason.description()
                ));
            }
        }
    }

    pb.finish_and_clear();
}

/// One `thread i: <ms>` line per finished writer
fn thread_lines(durations: impl IntoIterator<Item = (usize, Duration)>) -> Vec<String> {
    durations
        .into_iter()
        .map(|(thread_number, elapsed)| {
            format!("thread {}: {}", thread_number, format_millis(elapsed))
        })
        .collect()
}
