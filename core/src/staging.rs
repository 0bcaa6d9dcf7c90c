//! Host-visible staging memory
//!
//! The staging blob holds the current value of every animatable field. The
//! frame clock rewrites it through scoped views; the presentation backend
//! reads it back when applying copy mappings.

/// Error mapping a staging sub-range
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StagingError {
    #[error("range {offset}..{end} is outside the {len}-byte staging buffer")]
    OutOfBounds { offset: usize, end: usize, len: usize },
}

/// Staging memory with scoped, exclusive access to sub-ranges.
pub trait StagingMemory {
    /// Total size in bytes.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Map `offset..offset + size`, run `f` against the view and release it.
    ///
    /// The view is released on every path out of `f`, including unwinding.
    fn map_range<R>(
        &mut self,
        offset: usize,
        size: usize,
        f: impl FnOnce(&mut [u8]) -> R,
    ) -> Result<R, StagingError>;
}

/// Staging memory backed by a host `Vec<u8>`.
///
/// Tracks whether any range was mapped since the last [`take_dirty`] so the
/// backend only re-uploads after a mutation.
///
/// [`take_dirty`]: HostStaging::take_dirty
#[derive(Debug, Clone)]
pub struct HostStaging {
    bytes: Vec<u8>,
    dirty: bool,
}

impl HostStaging {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes, dirty: true }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns whether the contents changed since the last call, and clears the flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}

impl StagingMemory for HostStaging {
    fn len(&self) -> usize {
        self.bytes.len()
    }

    fn map_range<R>(
        &mut self,
        offset: usize,
        size: usize,
        f: impl FnOnce(&mut [u8]) -> R,
    ) -> Result<R, StagingError> {
        let len = self.bytes.len();
        let end = offset
            .checked_add(size)
            .filter(|end| *end <= len)
            .ok_or(StagingError::OutOfBounds {
                offset,
                end: offset.saturating_add(size),
                len,
            })?;
        self.dirty = true;
        Ok(f(&mut self.bytes[offset..end]))
    }
}
