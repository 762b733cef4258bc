//! Results persistence module
//!
//! Handles saving, loading, and rotation of benchmark reports.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::models::BenchmarkReport;
use crate::{Result, StorageMeterError, APP_NAME, MAX_RESULTS_HISTORY, RESULTS_FILE};

/// Results storage manager
#[derive(Debug)]
pub struct ResultsStorage {
    results_path: PathBuf,
}

/// Results file structure for JSON persistence
#[derive(Debug, Serialize, Deserialize)]
struct ResultsFile {
    version: u32,
    reports: Vec<BenchmarkReport>,
}

impl ResultsStorage {
    /// Storage at the standard data directory location
    pub fn new() -> Result<Self> {
        Ok(Self::at(Self::results_file_path()?))
    }

    /// Storage backed by an explicit file
    pub fn at(results_path: PathBuf) -> Self {
        Self { results_path }
    }

    /// Get the standard results file path
    /// Uses $DATA_HOME/storagemeter/results.json
    pub fn results_file_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir().ok_or_else(|| {
            StorageMeterError::PersistenceError("Unable to determine data directory".to_string())
        })?;

        Ok(data_dir.join(APP_NAME).join(RESULTS_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.results_path
    }

    /// Load all reports, oldest first
    pub fn load_reports(&self) -> Result<Vec<BenchmarkReport>> {
        if !self.results_path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.results_path).map_err(|e| {
            StorageMeterError::PersistenceError(format!(
                "Failed to read results file {}: {}",
                self.results_path.display(),
                e
            ))
        })?;

        let results_file: ResultsFile = serde_json::from_str(&content).map_err(|e| {
            StorageMeterError::PersistenceError(format!(
                "Failed to parse results file {}: {}",
                self.results_path.display(),
                e
            ))
        })?;

        Ok(results_file.reports)
    }

    /// Append a report, dropping the oldest ones beyond MAX_RESULTS_HISTORY
    pub fn append_report(&self, report: BenchmarkReport) -> Result<()> {
        let mut reports = self.load_reports()?;
        reports.push(report);

        if reports.len() > MAX_RESULTS_HISTORY {
            let skip_count = reports.len() - MAX_RESULTS_HISTORY;
            reports.drain(..skip_count);
        }

        self.save_reports(reports)
    }

    fn save_reports(&self, reports: Vec<BenchmarkReport>) -> Result<()> {
        if let Some(parent) = self.results_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                StorageMeterError::PersistenceError(format!(
                    "Failed to create results directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let results_file = ResultsFile {
            version: 1,
            reports,
        };
        let content = serde_json::to_string_pretty(&results_file)?;

        fs::write(&self.results_path, content).map_err(|e| {
            StorageMeterError::PersistenceError(format!(
                "Failed to write results file {}: {}",
                self.results_path.display(),
                e
            ))
        })?;

        Ok(())
    }

    /// Get the most recent N reports, oldest first
    pub fn recent_reports(&self, count: usize) -> Result<Vec<BenchmarkReport>> {
        let mut reports = self.load_reports()?;
        if reports.len() > count {
            reports.drain(..reports.len() - count);
        }
        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bench::{Calibration, RunState, StopReason, SweepOutcome, SweepPhase};
    use crate::config::BenchmarkConfig;
    use std::time::Duration;
    use tempfile::TempDir;

    fn create_test_report(max_threads_tested: usize) -> BenchmarkReport {
        let calibration = Calibration {
            elapsed: Duration::from_secs(1),
            original_block_size: 4096,
            block_size: 4096,
            bytes_written: 40_960,
            throughput: 40_960.0,
        };
        let final_state = RunState {
            phase: SweepPhase::Stopped(StopReason::ThroughputRegressed),
            thread_count: max_threads_tested + 1,
            ..RunState::sweeping(4096, 1.0)
        };

        BenchmarkReport::new(
            BenchmarkConfig::default(),
            calibration,
            SweepOutcome {
                final_state,
                trials: Vec::new(),
                failure: None,
            },
        )
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let storage = ResultsStorage::at(temp_dir.path().join(RESULTS_FILE));
        assert!(storage.load_reports().unwrap().is_empty());
    }

    #[test]
    fn test_append_and_load_report() {
        let temp_dir = TempDir::new().unwrap();
        let storage = ResultsStorage::at(temp_dir.path().join("nested").join(RESULTS_FILE));

        storage.append_report(create_test_report(5)).unwrap();

        let reports = storage.load_reports().unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].max_threads_tested, 5);
    }

    #[test]
    fn test_reports_rotation() {
        let temp_dir = TempDir::new().unwrap();
        let storage = ResultsStorage::at(temp_dir.path().join(RESULTS_FILE));

        for i in 0..MAX_RESULTS_HISTORY + 10 {
            storage.append_report(create_test_report(i)).unwrap();
        }

        let reports = storage.load_reports().unwrap();
        assert_eq!(reports.len(), MAX_RESULTS_HISTORY);
        assert_eq!(reports[0].max_threads_tested, 10);
        assert_eq!(
            reports[reports.len() - 1].max_threads_tested,
            MAX_RESULTS_HISTORY + 9
        );
    }

    #[test]
    fn test_recent_reports() {
        let temp_dir = TempDir::new().unwrap();
        let storage = ResultsStorage::at(temp_dir.path().join(RESULTS_FILE));
        for i in 0..10 {
            storage.append_report(create_test_report(i)).unwrap();
        }

        let recent = storage.recent_reports(5).unwrap();
        assert_eq!(recent.len(), 5);
        assert_eq!(recent[0].max_threads_tested, 5);
        assert_eq!(recent[4].max_threads_tested, 9);
        assert_eq!(storage.recent_reports(20).unwrap().len(), 10);
    }

    #[test]
    fn test_corrupt_file_is_persistence_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(RESULTS_FILE);
        fs::write(&path, "not json").unwrap();

        let storage = ResultsStorage::at(path);
        assert!(matches!(
            storage.load_reports(),
            Err(StorageMeterError::PersistenceError(_))
        ));
    }
}
