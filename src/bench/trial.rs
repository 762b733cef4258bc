//! Concurrent write trial
//!
//! Runs one writer per OS thread, each into its own `thread<N>` file, joins
//! them all and aggregates their timings into a throughput figure.

use std::fmt;
use std::path::Path;
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::io::{thread_file_name, BlockWriter, DataBlock};
use crate::models::duration_serde;
use crate::util::calculate_throughput;
use crate::{Result, StorageMeterError};

/// One completed trial at a given thread count
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trial {
    /// Number of concurrent writers
    pub thread_count: usize,
    /// Elapsed time of each writer, indexed by thread number - 1
    #[serde(with = "duration_serde::list")]
    pub thread_durations: Vec<Duration>,
    /// Mean of the per-thread durations
    #[serde(with = "duration_serde")]
    pub average: Duration,
    /// Block size every writer used
    pub block_size: usize,
    /// Writes of the block per writer
    pub repeat_count: u32,
    /// Aggregate throughput across all writers in bytes/s
    pub throughput: f64,
}

impl Trial {
    /// Total bytes written by all writers
    pub fn bytes_written(&self) -> u64 {
        self.block_size as u64 * self.repeat_count as u64 * self.thread_count as u64
    }
}

/// Build a trial from per-thread durations.
///
/// The average is the sum of per-thread nanoseconds divided by the thread
/// count, and throughput is `block_size * repeat_count * threads / average`.
pub fn aggregate_trial(
    block_size: usize,
    repeat_count: u32,
    thread_durations: Vec<Duration>,
) -> Trial {
    let thread_count = thread_durations.len();
    let total_nanos: u128 = thread_durations.iter().map(Duration::as_nanos).sum();
    let average_nanos = if thread_count == 0 {
        0
    } else {
        total_nanos / thread_count as u128
    };
    let average = Duration::from_nanos(average_nanos as u64);

    let bytes = block_size as u64 * repeat_count as u64 * thread_count as u64;
    Trial {
        thread_count,
        thread_durations,
        average,
        block_size,
        repeat_count,
        throughput: calculate_throughput(bytes, average),
    }
}

/// A writer thread that did not finish its file
#[derive(Debug)]
pub struct ThreadFailure {
    /// 1-based thread number
    pub thread_number: usize,
    pub error: StorageMeterError,
}

/// A trial in which at least one writer failed
#[derive(Debug)]
pub struct TrialFailure {
    pub thread_count: usize,
    pub failures: Vec<ThreadFailure>,
    /// Durations of the writers that did finish, as (thread number, elapsed)
    pub completed: Vec<(usize, Duration)>,
}

impl fmt::Display for TrialFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} writer threads failed",
            self.failures.len(),
            self.thread_count
        )?;
        if let Some(first) = self.failures.first() {
            write!(f, " (thread {}: {})", first.thread_number, first.error)?;
        }
        Ok(())
    }
}

impl std::error::Error for TrialFailure {}

/// Runs concurrent trials into one directory
pub struct TrialRunner<'a, W: BlockWriter> {
    writer: &'a W,
    dir: &'a Path,
    repeat_count: u32,
}

impl<'a, W: BlockWriter> TrialRunner<'a, W> {
    pub fn new(writer: &'a W, dir: &'a Path, repeat_count: u32) -> Self {
        Self {
            writer,
            dir,
            repeat_count,
        }
    }

    /// Write `block` from `thread_count` threads at once and wait for all of them.
    ///
    /// Every thread returns its own result; errors never cross the join.
    pub fn run(
        &self,
        thread_count: usize,
        block: &DataBlock,
    ) -> std::result::Result<Trial, TrialFailure> {
        let bytes = block.as_slice();
        let writer = self.writer;
        let repeat_count = self.repeat_count;

        let results: Vec<Result<Duration>> = thread::scope(|scope| {
            let handles: Vec<_> = (1..=thread_count)
                .map(|thread_number| {
                    let path = self.dir.join(thread_file_name(thread_number));
                    thread::Builder::new()
                        .name(format!("writer-{}", thread_number))
                        .spawn_scoped(scope, move || {
                            writer.write_block(&path, bytes, repeat_count)
                        })
                })
                .collect();

            handles
                .into_iter()
                .enumerate()
                .map(|(index, handle)| {
                    let thread_number = index + 1;
                    let handle = handle.map_err(|e| {
                        StorageMeterError::WorkerError(format!(
                            "failed to spawn writer thread {}: {}",
                            thread_number, e
                        ))
                    })?;
                    handle.join().unwrap_or_else(|_| {
                        Err(StorageMeterError::WorkerError(format!(
                            "writer thread {} panicked",
                            thread_number
                        )))
                    })
                })
                .collect()
        });

        let mut durations = Vec::with_capacity(thread_count);
        let mut completed = Vec::with_capacity(thread_count);
        let mut failures = Vec::new();
        for (index, result) in results.into_iter().enumerate() {
            let thread_number = index + 1;
            match result {
                Ok(elapsed) => {
                    info!(
                        thread = thread_number,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "writer finished"
                    );
                    durations.push(elapsed);
                    completed.push((thread_number, elapsed));
                }
                Err(e) => {
                    error!(thread = thread_number, error = %e, "writer failed");
                    failures.push(ThreadFailure {
                        thread_number,
                        error: e,
                    });
                }
            }
        }

        if !failures.is_empty() {
            return Err(TrialFailure {
                thread_count,
                failures,
                completed,
            });
        }

        Ok(aggregate_trial(block.len(), repeat_count, durations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::FsBlockWriter;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_aggregate_trial_average_and_throughput() {
        let trial = aggregate_trial(
            1_000_000,
            10,
            vec![Duration::from_secs(1), Duration::from_secs(3)],
        );

        assert_eq!(trial.thread_count, 2);
        assert_eq!(trial.average, Duration::from_secs(2));
        assert_eq!(trial.bytes_written(), 20_000_000);
        assert_eq!(trial.throughput, 10_000_000.0);
    }

    #[test]
    fn test_aggregate_trial_zero_duration() {
        let trial = aggregate_trial(10, 10, vec![Duration::ZERO, Duration::ZERO]);
        assert_eq!(trial.throughput, 0.0);
    }

    #[test]
    fn test_each_thread_writes_its_own_file() {
        let temp_dir = tempdir().unwrap();
        let writer = FsBlockWriter::new();
        let block = DataBlock::generate(2048).unwrap();

        let trial = TrialRunner::new(&writer, temp_dir.path(), 10)
            .run(3, &block)
            .unwrap();

        assert_eq!(trial.thread_count, 3);
        assert_eq!(trial.thread_durations.len(), 3);
        for thread_number in 1..=3 {
            let path = temp_dir.path().join(thread_file_name(thread_number));
            assert_eq!(fs::metadata(path).unwrap().len(), 20_480);
        }
        assert!(!temp_dir.path().join(thread_file_name(4)).exists());

        let expected = aggregate_trial(2048, 10, trial.thread_durations.clone());
        assert_eq!(trial, expected);
    }

    #[test]
    fn test_failing_thread_fails_trial_without_losing_others() {
        let temp_dir = tempdir().unwrap();
        fs::create_dir(temp_dir.path().join(thread_file_name(4))).unwrap();
        let writer = FsBlockWriter::new();
        let block = DataBlock::generate(512).unwrap();

        let failure = TrialRunner::new(&writer, temp_dir.path(), 2)
            .run(4, &block)
            .unwrap_err();

        assert_eq!(failure.thread_count, 4);
        assert_eq!(failure.failures.len(), 1);
        assert_eq!(failure.failures[0].thread_number, 4);
        assert!(matches!(
            failure.failures[0].error,
            StorageMeterError::FileOpenFailure { .. }
        ));
        let finished: Vec<usize> = failure.completed.iter().map(|(n, _)| *n).collect();
        assert_eq!(finished, vec![1, 2, 3]);
        assert!(failure.to_string().contains("1 of 4 writer threads failed"));
    }

    struct PanickingWriter;

    impl BlockWriter for PanickingWriter {
        fn write_block(&self, path: &Path, _block: &[u8], _repeat: u32) -> Result<Duration> {
            if path.ends_with("thread2") {
                panic!("disk on fire");
            }
            Ok(Duration::from_millis(1))
        }
    }

    #[test]
    fn test_panicking_writer_is_contained() {
        let temp_dir = tempdir().unwrap();
        let block = DataBlock::generate(16).unwrap();

        let failure = TrialRunner::new(&PanickingWriter, temp_dir.path(), 1)
            .run(3, &block)
            .unwrap_err();

        assert_eq!(failure.failures.len(), 1);
        assert_eq!(failure.failures[0].thread_number, 2);
        assert!(matches!(failure.failures[0].error, StorageMeterError::WorkerError(_)));
        assert_eq!(failure.completed.len(), 2);
    }
}
