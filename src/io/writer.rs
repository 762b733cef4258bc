use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use tracing::debug;

use crate::util::StopWatch;
use crate::{Result, StorageMeterError};

/// File the calibration trial writes to
pub const SINGLE_THREAD_FILE: &str = "single_thread";

/// Number of times each writer writes the block
pub const DEFAULT_REPEAT_COUNT: u32 = 10;

/// File written by the writer with 1-based index `thread_number`
pub fn thread_file_name(thread_number: usize) -> String {
    format!("thread{}", thread_number)
}

/// One writer's unit of work: write a block `repeat` times into a single file.
pub trait BlockWriter: Send + Sync {
    /// Returns the time taken from just before the first write until the file is closed.
    fn write_block(&self, path: &Path, block: &[u8], repeat: u32) -> Result<Duration>;
}

/// Plain buffered-by-the-OS file writer
#[derive(Debug, Clone, Copy, Default)]
pub struct FsBlockWriter;

impl FsBlockWriter {
    pub fn new() -> Self {
        Self
    }
}

impl BlockWriter for FsBlockWriter {
    fn write_block(&self, path: &Path, block: &[u8], repeat: u32) -> Result<Duration> {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|source| StorageMeterError::FileOpenFailure {
                path: path.to_path_buf(),
                source,
            })?;

        let watch = StopWatch::start();
        for portion in 0..repeat {
            // the handle is dropped on this early return as well
            file.write_all(block)
                .map_err(|source| StorageMeterError::ShortWriteFailure {
                    path: path.to_path_buf(),
                    portion,
                    source,
                })?;
        }
        drop(file);
        let elapsed = watch.stop();

        debug!(
            path = %path.display(),
            bytes = block.len() as u64 * repeat as u64,
            ?elapsed,
            "file written"
        );
        Ok(elapsed)
    }
}
