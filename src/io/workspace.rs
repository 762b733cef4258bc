use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::io::writer::{thread_file_name, SINGLE_THREAD_FILE};
use crate::{Result, StorageMeterError};

/// Directory the benchmark files are written into.
///
/// Created on demand. When dropped, `single_thread` and the `thread1..=N`
/// files recorded with [`TestDirectory::record_threads`] are removed (unless
/// kept), and the directory itself is removed if this run created it.
#[derive(Debug)]
pub struct TestDirectory {
    path: PathBuf,
    created: bool,
    keep_files: bool,
    /// Highest `threadN` file the sweep wrote
    written_threads: usize,
}

impl TestDirectory {
    pub fn prepare(path: &Path, keep_files: bool) -> Result<Self> {
        let created = if path.exists() {
            if !path.is_dir() {
                return Err(StorageMeterError::ConfigError(format!(
                    "Test path is not a directory: {}",
                    path.display()
                )));
            }
            false
        } else {
            fs::create_dir_all(path).map_err(|e| {
                StorageMeterError::ConfigError(format!(
                    "Failed to create test directory {}: {}",
                    path.display(),
                    e
                ))
            })?;
            true
        };

        debug!(path = %path.display(), created, "test directory ready");
        Ok(Self {
            path: path.to_path_buf(),
            created,
            keep_files,
            written_threads: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether this run created the directory
    pub fn was_created(&self) -> bool {
        self.created
    }

    /// Record that `thread1..=thread_count` were written and need removing
    pub fn record_threads(&mut self, thread_count: usize) {
        self.written_threads = self.written_threads.max(thread_count);
    }

    fn remove_benchmark_files(&self) {
        let names = std::iter::once(SINGLE_THREAD_FILE.to_string())
            .chain((1..=self.written_threads).map(thread_file_name));

        for name in names {
            let path = self.path.join(name);
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to remove benchmark file");
                }
            }
        }
    }
}

impl Drop for TestDirectory {
    fn drop(&mut self) {
        if self.keep_files {
            return;
        }

        self.remove_benchmark_files();
        if self.created {
            if let Err(e) = fs::remove_dir(&self.path) {
                warn!(path = %self.path.display(), error = %e, "failed to remove test directory");
            }
        }
    }
}
