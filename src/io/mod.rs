//! I/O operations module
//!
//! Contains the data block generator, the file writer that every trial
//! thread runs, and the test directory lifecycle.

pub mod block;
pub mod workspace;
pub mod writer;

pub use block::{DataBlock, DEFAULT_BLOCK_SIZE};
pub use workspace::TestDirectory;
pub use writer::{
    thread_file_name, BlockWriter, FsBlockWriter, DEFAULT_REPEAT_COUNT, SINGLE_THREAD_FILE,
};
