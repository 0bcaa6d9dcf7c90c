//! In-place record rotation
//!
//! Used by mutators that shift fixed-size records (sprite table entries,
//! palette colors) by one slot per invocation.

use smallvec::SmallVec;

/// Records up to this size rotate without touching the heap
const INLINE_RECORD: usize = 16;

type Scratch = SmallVec<[u8; INLINE_RECORD]>;

/// Error rotating a buffer of records
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CycleError {
    #[error("record stride must be non-zero")]
    ZeroStride,

    #[error("buffer length {len} is not a multiple of the {stride}-byte stride")]
    PartialRecord { len: usize, stride: usize },
}

/// Right-rotate `buffer` by one `stride`-sized record in place.
///
/// Afterwards record `i` holds what record `i - 1` held, and record 0 holds
/// the old last record. An empty buffer is left alone.
pub fn cycle_records(buffer: &mut [u8], stride: usize) -> Result<(), CycleError> {
    check_stride(buffer.len(), stride)?;
    if buffer.is_empty() {
        return Ok(());
    }

    // `carry` holds the previous record's old bytes; `held` saves the current
    // record before it is overwritten.
    let mut carry: Scratch = SmallVec::from_slice(&buffer[..stride]);
    let mut held: Scratch = SmallVec::from_elem(0, stride);

    for record in buffer.chunks_exact_mut(stride).skip(1) {
        held.copy_from_slice(record);
        record.copy_from_slice(&carry);
        std::mem::swap(&mut carry, &mut held);
    }

    // `carry` now holds the old last record (or record 0 itself when N == 1)
    buffer[..stride].copy_from_slice(&carry);
    Ok(())
}

/// Check that `len` bytes split into whole `stride`-sized records.
pub fn check_stride(len: usize, stride: usize) -> Result<(), CycleError> {
    if stride == 0 {
        return Err(CycleError::ZeroStride);
    }
    if len % stride != 0 {
        return Err(CycleError::PartialRecord { len, stride });
    }
    Ok(())
}

/// Borrowed buffer of fixed-size records
pub struct BufferCycler<'a> {
    buffer: &'a mut [u8],
}

impl<'a> BufferCycler<'a> {
    pub fn new(buffer: &'a mut [u8]) -> Self {
        Self { buffer }
    }

    /// Right-rotate by one record and return the mutated buffer.
    pub fn cycle_buffer(self, stride: usize) -> Result<&'a mut [u8], CycleError> {
        cycle_records(self.buffer, stride)?;
        Ok(self.buffer)
    }
}
