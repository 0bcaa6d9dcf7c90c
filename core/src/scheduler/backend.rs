//! Backend seam between the scheduler and the GPU

use crate::composer::MemoryUpdate;

/// Cross-stage synchronization for one batch submission
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubmitSync {
    /// Wait on external prerequisites (e.g. the acquired output image)
    pub wait_external: bool,
    /// Signal completion to the next stage (presentation)
    pub signal_complete: bool,
}

/// One compute submission covering a contiguous scanline range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanlineBatch {
    pub first_scanline: u32,
    pub scanline_count: u32,
    pub sync: SubmitSync,
}

impl ScanlineBatch {
    /// One past the last scanline of the batch.
    pub fn end_scanline(&self) -> u32 {
        self.first_scanline + self.scanline_count
    }
}

/// GPU operations the scheduler drives.
///
/// Submissions must execute in call order. `apply_updates` must not return
/// until the copies are visible to the next dispatch.
pub trait ScanlineBackend {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Apply every copy registered for `scanline`, in order, and wait for them.
    fn apply_updates(&mut self, scanline: u32, updates: &[MemoryUpdate])
    -> Result<(), Self::Error>;

    /// Submit one compute batch.
    fn dispatch_scanlines(&mut self, batch: &ScanlineBatch) -> Result<(), Self::Error>;
}
