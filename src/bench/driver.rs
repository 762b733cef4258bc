//! Benchmark driver
//!
//! Generates the block, calibrates it, then sweeps thread counts upwards
//! until throughput regresses on consecutive trials, a writer fails, or
//! the optional thread limit is hit.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

use crate::bench::calibrate::{Calibration, Calibrator};
use crate::bench::trial::{Trial, TrialFailure, TrialRunner};
use crate::config::BenchmarkConfig;
use crate::io::{BlockWriter, DataBlock, FsBlockWriter};
use crate::models::BenchmarkReport;
use crate::Result;

/// Why the sweep ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// Throughput dropped on the configured number of consecutive trials
    ThroughputRegressed,
    /// A writer thread failed during a trial
    WriterFailed,
    /// The configured thread limit was reached
    ThreadLimitReached,
}

impl StopReason {
    pub fn description(&self) -> &'static str {
        match self {
            StopReason::ThroughputRegressed => "throughput stopped improving",
            StopReason::WriterFailed => "a writer thread failed",
            StopReason::ThreadLimitReached => "thread limit reached",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SweepPhase {
    Calibrating,
    SweepingThreads,
    Stopped(StopReason),
}

/// Stopping rule parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopPolicy {
    pub max_slow_trials: u32,
    pub max_threads: Option<usize>,
}

impl StopPolicy {
    pub fn from_config(config: &BenchmarkConfig) -> Self {
        Self {
            max_slow_trials: config.max_slow_trials,
            max_threads: config.max_threads,
        }
    }
}

impl Default for StopPolicy {
    fn default() -> Self {
        Self {
            max_slow_trials: 2,
            max_threads: None,
        }
    }
}

/// State of one benchmark session, advanced once per trial
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunState {
    pub phase: SweepPhase,
    pub block_size: usize,
    /// Throughput of the previous trial in bytes/s
    pub last_speed: f64,
    /// Consecutive trials slower than their predecessor
    pub slow_trials: u32,
    /// Thread count of the next trial to run
    pub thread_count: usize,
}

impl RunState {
    pub fn calibrating(block_size: usize) -> Self {
        Self {
            phase: SweepPhase::Calibrating,
            block_size,
            last_speed: 0.0,
            slow_trials: 0,
            thread_count: 1,
        }
    }

    /// Enter the sweep at two threads with the calibration trial as the baseline
    pub fn calibrated(self, calibration: &Calibration) -> Self {
        Self::sweeping(calibration.block_size, calibration.throughput)
    }

    pub fn sweeping(block_size: usize, initial_speed: f64) -> Self {
        Self {
            phase: SweepPhase::SweepingThreads,
            block_size,
            last_speed: initial_speed,
            slow_trials: 0,
            thread_count: 2,
        }
    }

    /// Fold a completed trial's throughput into the state.
    ///
    /// Only the immediately preceding trial is compared against, and the
    /// baseline moves to this trial even when it regressed.
    pub fn record_trial(self, throughput: f64, policy: &StopPolicy) -> Self {
        let slow_trials = if throughput < self.last_speed {
            self.slow_trials + 1
        } else {
            0
        };
        let thread_count = self.thread_count + 1;

        let phase = if slow_trials >= policy.max_slow_trials {
            SweepPhase::Stopped(StopReason::ThroughputRegressed)
        } else if policy.max_threads.is_some_and(|max| thread_count > max) {
            SweepPhase::Stopped(StopReason::ThreadLimitReached)
        } else {
            SweepPhase::SweepingThreads
        };

        Self {
            phase,
            last_speed: throughput,
            slow_trials,
            thread_count,
            ..self
        }
    }

    /// Stop on a failed trial, keeping the failing thread count
    pub fn record_failure(self) -> Self {
        Self {
            phase: SweepPhase::Stopped(StopReason::WriterFailed),
            ..self
        }
    }

    pub fn is_sweeping(&self) -> bool {
        self.phase == SweepPhase::SweepingThreads
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        match self.phase {
            SweepPhase::Stopped(reason) => Some(reason),
            _ => None,
        }
    }

    /// Highest thread count the sweep ran.
    ///
    /// After a writer failure this is the failing trial's own count, not the
    /// last successful one.
    pub fn max_threads_tested(&self) -> usize {
        match self.phase {
            SweepPhase::Stopped(StopReason::WriterFailed) => self.thread_count,
            _ => self.thread_count.saturating_sub(1),
        }
    }
}

/// Progress notifications emitted while a benchmark runs
#[derive(Debug, Clone)]
pub enum SweepEvent {
    BlockGenerated { size: usize },
    Calibrated(Calibration),
    TrialStarted { thread_count: usize },
    TrialCompleted(Trial),
    /// `completed` holds (thread number, elapsed) for the writers that finished
    TrialFailed {
        thread_count: usize,
        message: String,
        completed: Vec<(usize, Duration)>,
    },
    Finished {
        max_threads_tested: usize,
        stop_reason: StopReason,
    },
}

fn emit(events: Option<&UnboundedSender<SweepEvent>>, event: SweepEvent) {
    if let Some(tx) = events {
        // a dropped receiver only means nobody is watching
        let _ = tx.send(event);
    }
}

/// Result of a finished sweep
#[derive(Debug)]
pub struct SweepOutcome {
    pub final_state: RunState,
    pub trials: Vec<Trial>,
    pub failure: Option<TrialFailure>,
}

impl SweepOutcome {
    pub fn max_threads_tested(&self) -> usize {
        self.final_state.max_threads_tested()
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        self.final_state.stop_reason()
    }
}

/// Drive trials from `state` until the stopping rule fires.
///
/// `run_trial` is called with strictly increasing thread counts, one at a
/// time; the next trial never starts before the previous one returned.
pub fn run_sweep<F>(
    mut state: RunState,
    policy: &StopPolicy,
    mut run_trial: F,
    events: Option<&UnboundedSender<SweepEvent>>,
) -> SweepOutcome
where
    F: FnMut(usize) -> std::result::Result<Trial, TrialFailure>,
{
    let mut trials = Vec::new();
    let mut failure = None;

    while state.is_sweeping() {
        let thread_count = state.thread_count;
        emit(events, SweepEvent::TrialStarted { thread_count });

        match run_trial(thread_count) {
            Ok(trial) => {
                info!(
                    threads = thread_count,
                    average_ms = trial.average.as_millis() as u64,
                    throughput = trial.throughput,
                    "trial completed"
                );
                state = state.record_trial(trial.throughput, policy);
                emit(events, SweepEvent::TrialCompleted(trial.clone()));
                trials.push(trial);
            }
            Err(trial_failure) => {
                warn!(
                    threads = thread_count,
                    error = %trial_failure,
                    "trial failed, ending sweep"
                );
                emit(
                    events,
                    SweepEvent::TrialFailed {
                        thread_count,
                        message: trial_failure.to_string(),
                        completed: trial_failure.completed.clone(),
                    },
                );
                state = state.record_failure();
                failure = Some(trial_failure);
            }
        }
    }

    SweepOutcome {
        final_state: state,
        trials,
        failure,
    }
}

/// Runs a whole benchmark session against one directory
pub struct BenchmarkDriver<W: BlockWriter = FsBlockWriter> {
    config: BenchmarkConfig,
    writer: W,
}

impl BenchmarkDriver<FsBlockWriter> {
    pub fn new(config: BenchmarkConfig) -> Result<Self> {
        Self::with_writer(config, FsBlockWriter::new())
    }
}

impl<W: BlockWriter> BenchmarkDriver<W> {
    pub fn with_writer(config: BenchmarkConfig, writer: W) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, writer })
    }

    /// Generate the block, calibrate it and sweep thread counts.
    ///
    /// Block generation and calibration errors are returned; writer failures
    /// during the sweep end it and are recorded in the report instead.
    pub fn run(&self, events: Option<&UnboundedSender<SweepEvent>>) -> Result<BenchmarkReport> {
        let dir = self.config.test_dir.as_path();
        let repeat_count = self.config.repeat_count;

        let mut block = DataBlock::generate(self.config.block_size)?;
        emit(events, SweepEvent::BlockGenerated { size: block.len() });

        let state = RunState::calibrating(block.len());
        let calibration =
            Calibrator::new(&self.writer, repeat_count, self.config.max_trial_duration)
                .calibrate(dir, &mut block)?;
        emit(events, SweepEvent::Calibrated(calibration.clone()));

        // the block is fixed from here on
        let block = block;
        let state = state.calibrated(&calibration);
        let policy = StopPolicy::from_config(&self.config);
        let runner = TrialRunner::new(&self.writer, dir, repeat_count);

        let outcome = run_sweep(
            state,
            &policy,
            |threads| runner.run(threads, &block),
            events,
        );

        let max_threads_tested = outcome.max_threads_tested();
        let stop_reason = outcome
            .stop_reason()
            .unwrap_or(StopReason::ThroughputRegressed);
        info!(
            max_threads_tested,
            reason = stop_reason.description(),
            "sweep finished"
        );
        emit(
            events,
            SweepEvent::Finished {
                max_threads_tested,
                stop_reason,
            },
        );

        Ok(BenchmarkReport::new(self.config.clone(), calibration, outcome))
    }
}
