//! Reusable sample buffer for the capture loop

use std::num::NonZeroUsize;

/// Bytes requested from the device per read (16 USB transfers of 16 KiB)
pub const CHUNK_LEN: usize = 16 * 16384;

const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(CHUNK_LEN) {
    Some(n) => n,
    None => panic!("chunk length must be non-zero"),
};

/// Fixed-capacity byte region, allocated once and reused for every chunk
pub struct SampleBuffer {
    data: Box<[u8]>,
}

impl SampleBuffer {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            data: vec![0u8; capacity.get()].into_boxed_slice(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Whole buffer, handed to the device for a read
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// The first `len` bytes, as filled by the last read
    pub fn filled(&self, len: usize) -> &[u8] {
        &self.data[..len.min(self.data.len())]
    }
}

impl Default for SampleBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
