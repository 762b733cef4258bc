use std::fs;
use std::path::Path;
use std::time::Duration;

use storagemeter::bench::{
    aggregate_trial, run_sweep, BenchmarkDriver, RunState, StopPolicy, StopReason,
};
use storagemeter::config::BenchmarkConfig;
use storagemeter::io::{thread_file_name, BlockWriter, TestDirectory, SINGLE_THREAD_FILE};
use storagemeter::Result;
use tempfile::tempdir;

/// Writer that pretends each file took a fixed time, without touching disk
struct FixedTimeWriter(Duration);

impl BlockWriter for FixedTimeWriter {
    fn write_block(&self, _path: &Path, _block: &[u8], _repeat: u32) -> Result<Duration> {
        Ok(self.0)
    }
}

#[test]
fn test_full_run_in_prepared_directory_cleans_up() {
    let root = tempdir().unwrap();
    let dir = root.path().join("volume-under-test");
    let config = BenchmarkConfig::new()
        .with_test_dir(dir.clone())
        .with_block_size(4096)
        .with_repeat_count(10)
        .with_max_threads(Some(3));

    let mut test_dir = TestDirectory::prepare(&config.test_dir, config.keep_files).unwrap();
    let report = BenchmarkDriver::new(config).unwrap().run(None).unwrap();
    test_dir.record_threads(report.max_threads_tested);

    assert!(dir.join(SINGLE_THREAD_FILE).exists());
    assert_eq!(
        fs::metadata(dir.join(thread_file_name(2))).unwrap().len(),
        10 * report.calibration.block_size as u64
    );
    assert!(report.trials.iter().all(|trial| trial.thread_durations.len() == trial.thread_count));

    drop(test_dir);
    assert!(!dir.exists());
}

#[test]
fn test_constant_per_thread_time_never_regresses_until_the_limit() {
    let root = tempdir().unwrap();
    // same time per writer means aggregate speed grows with every thread
    let config = BenchmarkConfig::new()
        .with_test_dir(root.path().to_path_buf())
        .with_block_size(1000)
        .with_max_threads(Some(6));

    let report = BenchmarkDriver::with_writer(config, FixedTimeWriter(Duration::from_secs(1)))
        .unwrap()
        .run(None)
        .unwrap();

    assert_eq!(report.stop_reason, StopReason::ThreadLimitReached);
    assert_eq!(report.max_threads_tested, 6);
    let threads: Vec<usize> = report.trials.iter().map(|trial| trial.thread_count).collect();
    assert_eq!(threads, vec![2, 3, 4, 5, 6]);
    assert_eq!(report.trials[4].throughput, 60_000.0);
    assert_eq!(report.peak(), (6, 60_000.0));
}

#[test]
fn test_trial_throughput_matches_formula() {
    let durations = vec![
        Duration::from_millis(100),
        Duration::from_millis(200),
        Duration::from_millis(300),
    ];
    let trial = aggregate_trial(1000, 10, durations);

    assert_eq!(trial.average, Duration::from_millis(200));
    assert!((trial.throughput - 30_000.0 / 0.2).abs() < 1e-6);
}

#[test]
fn test_throughput_sequence_stops_after_second_regression() {
    // 100 bytes/s single-threaded, then 90 and 80 with two and three threads
    let speeds = [90.0, 80.0, 120.0];
    let mut requested = Vec::new();
    let outcome = run_sweep(
        RunState::sweeping(1000, 100.0),
        &StopPolicy::default(),
        |threads| {
            requested.push(threads);
            let speed = speeds[threads - 2];
            let average = Duration::from_secs_f64(1000.0 * threads as f64 / speed);
            Ok(aggregate_trial(1000, 1, vec![average; threads]))
        },
        None,
    );

    assert_eq!(requested, vec![2, 3]);
    assert_eq!(outcome.stop_reason(), Some(StopReason::ThroughputRegressed));
    assert_eq!(outcome.trials.len(), 2);
    assert_eq!(outcome.max_threads_tested(), 3);
}
