//! Single-threaded calibration trial
//!
//! Writes the block once from a single thread and, if that took longer
//! than the time budget, shrinks the block so later trials fit the budget.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::io::{BlockWriter, DataBlock, SINGLE_THREAD_FILE};
use crate::models::duration_serde;
use crate::util::calculate_throughput;
use crate::Result;

/// Outcome of the calibration trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    /// Time the single-threaded trial took
    #[serde(with = "duration_serde")]
    pub elapsed: Duration,
    /// Block size the trial was written with
    pub original_block_size: usize,
    /// Block size used for the rest of the run
    pub block_size: usize,
    /// Bytes written by the calibration trial
    pub bytes_written: u64,
    /// Starting throughput for the sweep in bytes/s, using the calibrated block size
    pub throughput: f64,
}

impl Calibration {
    pub fn was_shrunk(&self) -> bool {
        self.block_size < self.original_block_size
    }
}

/// Block size expected to make a single-threaded trial take about `budget`.
///
/// Only shrinks: a trial within budget (or one that took no measurable
/// time) keeps the current size. The result is never below one byte.
pub fn calibrated_block_size(current: usize, elapsed: Duration, budget: Duration) -> usize {
    let elapsed_secs = elapsed.as_secs_f64();
    if current == 0 || elapsed_secs == 0.0 || elapsed <= budget {
        return current;
    }

    let preferred = budget.as_secs_f64() / elapsed_secs * current as f64;
    (preferred as usize).clamp(1, current)
}

pub struct Calibrator<'a, W: BlockWriter> {
    writer: &'a W,
    repeat_count: u32,
    budget: Duration,
}

impl<'a, W: BlockWriter> Calibrator<'a, W> {
    pub fn new(writer: &'a W, repeat_count: u32, budget: Duration) -> Self {
        Self {
            writer,
            repeat_count,
            budget,
        }
    }

    /// Run the single-threaded trial into `<dir>/single_thread`, shrinking
    /// `block` if it was too slow
    pub fn calibrate(&self, dir: &Path, block: &mut DataBlock) -> Result<Calibration> {
        let original_block_size = block.len();
        let elapsed = self.writer.write_block(
            &dir.join(SINGLE_THREAD_FILE),
            block.as_slice(),
            self.repeat_count,
        )?;

        let block_size = calibrated_block_size(original_block_size, elapsed, self.budget);
        if block_size < original_block_size {
            warn!(
                ?elapsed,
                budget = ?self.budget,
                from = original_block_size,
                to = block_size,
                "single-threaded trial over budget, shrinking block"
            );
            block.truncate(block_size);
        }

        let bytes_written = original_block_size as u64 * self.repeat_count as u64;
        // the sweep baseline is the shrunk block over the first trial's time
        let throughput =
            calculate_throughput(block_size as u64 * self.repeat_count as u64, elapsed);
        info!(?elapsed, throughput, block_size, "calibration finished");

        Ok(Calibration {
            elapsed,
            original_block_size,
            block_size,
            bytes_written,
            throughput,
        })
    }
}
