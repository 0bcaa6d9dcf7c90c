//! Tileset swapping from precomputed frames

use super::{MutateError, Mutator};
use crate::composer::RegionHandle;

/// Copies the region-sized slice at `source_offset` of each precomputed
/// frame into the region, one frame per invocation, looping forever.
pub struct TilesetFrameAnimator {
    region: RegionHandle,
    cadence: u64,
    frames: Vec<Vec<u8>>,
    source_offset: usize,
    next: usize,
}

impl TilesetFrameAnimator {
    /// Every frame must contain `source_offset + region.size()` bytes.
    pub fn new(
        region: RegionHandle,
        cadence: u64,
        frames: Vec<Vec<u8>>,
        source_offset: usize,
    ) -> Result<Self, MutateError> {
        if frames.is_empty() {
            return Err(MutateError::NoFrames);
        }
        let needed = source_offset + region.size();
        if let Some((frame, data)) = frames
            .iter()
            .enumerate()
            .find(|(_, data)| data.len() < needed)
        {
            return Err(MutateError::FrameTooShort {
                frame,
                needed,
                available: data.len(),
            });
        }
        Ok(Self {
            region,
            cadence,
            frames,
            source_offset,
            next: 0,
        })
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Index of the frame the next invocation copies.
    pub fn next_frame(&self) -> usize {
        self.next
    }
}

impl Mutator for TilesetFrameAnimator {
    fn region(&self) -> RegionHandle {
        self.region
    }

    fn cadence(&self) -> u64 {
        self.cadence
    }

    fn mutate(&mut self, view: &mut [u8]) -> Result<(), MutateError> {
        MutateError::check_len(self.region.size(), view.len())?;
        let start = self.source_offset;
        view.copy_from_slice(&self.frames[self.next][start..start + view.len()]);
        self.next = (self.next + 1) % self.frames.len();
        Ok(())
    }

    fn name(&self) -> &str {
        "tileset frame animator"
    }
}
