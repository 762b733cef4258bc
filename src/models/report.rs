//! Benchmark report data model
//!
//! Everything a finished run produced: the configuration, the calibration
//! trial, every sweep trial and how the sweep ended.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::bench::{Calibration, StopReason, SweepOutcome, Trial};
use crate::config::BenchmarkConfig;
use crate::util::{format_bytes, format_throughput};
use crate::Result;

/// Complete benchmark report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkReport {
    /// Timestamp when the benchmark finished
    pub timestamp: DateTime<Utc>,
    /// Operating system and architecture the run happened on
    pub os: String,
    /// Configuration used for this run
    pub config: BenchmarkConfig,
    /// Single-threaded calibration trial
    pub calibration: Calibration,
    /// Sweep trials in thread-count order, starting at two threads
    pub trials: Vec<Trial>,
    /// Highest thread count the sweep ran
    pub max_threads_tested: usize,
    pub stop_reason: StopReason,
    /// Description of the failed trial, if a writer failed
    pub failure: Option<String>,
}

impl BenchmarkReport {
    pub fn new(config: BenchmarkConfig, calibration: Calibration, outcome: SweepOutcome) -> Self {
        let max_threads_tested = outcome.max_threads_tested();
        let stop_reason = outcome
            .stop_reason()
            .unwrap_or(StopReason::ThroughputRegressed);

        Self {
            timestamp: Utc::now(),
            os: format!("{} {}", std::env::consts::OS, std::env::consts::ARCH),
            config,
            calibration,
            trials: outcome.trials,
            max_threads_tested,
            stop_reason,
            failure: outcome.failure.map(|failure| failure.to_string()),
        }
    }

    /// Thread count and throughput of the fastest trial, calibration included
    pub fn peak(&self) -> (usize, f64) {
        self.trials
            .iter()
            .map(|trial| (trial.thread_count, trial.throughput))
            .fold((1, self.calibration.throughput), |best, candidate| {
                if candidate.1 > best.1 {
                    candidate
                } else {
                    best
                }
            })
    }

    /// Get a human-readable summary of the run
    pub fn summary(&self) -> String {
        let (peak_threads, peak_speed) = self.peak();
        format!(
            "{} - max threads tested: {} ({}) - peak {} at {} thread(s) - {} per thread",
            self.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            self.max_threads_tested,
            self.stop_reason.description(),
            format_throughput(peak_speed),
            peak_threads,
            format_bytes(self.calibration.block_size as u64 * self.config.repeat_count as u64),
        )
    }

    /// Write the report as pretty-printed JSON
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

// Durations are stored as integer nanoseconds
pub(crate) mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_nanos() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let nanos = u64::deserialize(deserializer)?;
        Ok(Duration::from_nanos(nanos))
    }

    pub mod list {
        use super::*;

        pub fn serialize<S>(durations: &[Duration], serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            let nanos: Vec<u64> = durations.iter().map(|d| d.as_nanos() as u64).collect();
            nanos.serialize(serializer)
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Duration>, D::Error>
        where
            D: Deserializer<'de>,
        {
            let nanos = Vec::<u64>::deserialize(deserializer)?;
            Ok(nanos.into_iter().map(Duration::from_nanos).collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bench::{aggregate_trial, RunState, StopPolicy};
    use std::time::Duration;
    use tempfile::tempdir;

    fn create_test_report() -> BenchmarkReport {
        let calibration = Calibration {
            elapsed: Duration::from_secs(1),
            original_block_size: 1000,
            block_size: 1000,
            bytes_written: 10_000,
            throughput: 10_000.0,
        };
        let policy = StopPolicy::default();
        let trials = vec![
            aggregate_trial(1000, 10, vec![Duration::from_millis(500); 2]),
            aggregate_trial(1000, 10, vec![Duration::from_secs(1); 3]),
            aggregate_trial(1000, 10, vec![Duration::from_secs(2); 4]),
        ];
        let final_state = trials
            .iter()
            .fold(RunState::sweeping(1000, calibration.throughput), |state, trial| {
                state.record_trial(trial.throughput, &policy)
            });

        BenchmarkReport::new(
            BenchmarkConfig::new().with_block_size(1000),
            calibration,
            SweepOutcome {
                final_state,
                trials,
                failure: None,
            },
        )
    }

    #[test]
    fn test_report_from_outcome() {
        let report = create_test_report();
        assert_eq!(report.max_threads_tested, 4);
        assert_eq!(report.stop_reason, StopReason::ThroughputRegressed);
        assert!(report.failure.is_none());
        assert_eq!(report.trials.len(), 3);
    }

    #[test]
    fn test_peak_trial() {
        let report = create_test_report();
        // 2 threads: 20_000 bytes in 0.5s
        assert_eq!(report.peak(), (2, 40_000.0));
        assert!(report.summary().contains("max threads tested: 4"));
    }

    #[test]
    fn test_json_file_preserves_durations() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("report.json");
        let report = create_test_report();

        report.write_json(&path).unwrap();
        let loaded: BenchmarkReport =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();

        assert_eq!(loaded.trials, report.trials);
        assert_eq!(loaded.calibration, report.calibration);
        assert_eq!(loaded.config, report.config);
    }
}
