use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};
use tracing::debug;

use crate::{Result, StorageMeterError};

/// Default block size: 100 MiB
pub const DEFAULT_BLOCK_SIZE: usize = 104_857_600;

/// In-memory payload written by every writer of a run.
///
/// Filled once at generation; afterwards it is only ever shrunk by
/// calibration and then shared read-only between writer threads.
#[derive(Debug)]
pub struct DataBlock {
    bytes: Vec<u8>,
}

impl DataBlock {
    /// Allocate `size` bytes and fill them with pseudo-random content seeded from the clock
    pub fn generate(size: usize) -> Result<Self> {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos() as u64)
            .unwrap_or_default();
        Self::generate_seeded(size, seed)
    }

    pub fn generate_seeded(size: usize, seed: u64) -> Result<Self> {
        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(size)
            .map_err(|_| StorageMeterError::AllocationFailure { size })?;
        bytes.resize(size, 0);

        let mut rng = SmallRng::seed_from_u64(seed);
        rng.fill_bytes(&mut bytes);

        debug!(size, seed, "generated data block");
        Ok(Self { bytes })
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Shrink the block to `len` bytes. Never grows it.
    pub(crate) fn truncate(&mut self, len: usize) {
        if len < self.bytes.len() {
            self.bytes.truncate(len);
            self.bytes.shrink_to_fit();
        }
    }
}

impl AsRef<[u8]> for DataBlock {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_exact_size() {
        let block = DataBlock::generate(4096).unwrap();
        assert_eq!(block.len(), 4096);
        assert!(block.as_slice().iter().any(|&b| b != 0));
    }

    #[test]
    fn test_seed_controls_content() {
        let a = DataBlock::generate_seeded(1024, 7).unwrap();
        let b = DataBlock::generate_seeded(1024, 7).unwrap();
        let c = DataBlock::generate_seeded(1024, 8).unwrap();
        assert_eq!(a.as_slice(), b.as_slice());
        assert_ne!(a.as_slice(), c.as_slice());
    }

    #[test]
    fn test_unreservable_size_is_allocation_failure() {
        match DataBlock::generate(usize::MAX) {
            Err(StorageMeterError::AllocationFailure { size }) => assert_eq!(size, usize::MAX),
            other => panic!(
                "expected allocation failure, got {:?}",
                other.map(|b| b.len())
            ),
        }
    }

    #[test]
    fn test_truncate_only_shrinks() {
        let mut block = DataBlock::generate(100).unwrap();
        let prefix = block.as_slice()[..50].to_vec();

        block.truncate(200);
        assert_eq!(block.len(), 100);

        block.truncate(50);
        assert_eq!(block.len(), 50);
        assert_eq!(block.as_slice(), prefix.as_slice());
    }

    #[test]
    fn test_empty_block() {
        let block = DataBlock::generate(0).unwrap();
        assert!(block.is_empty());
    }
}
