//! Static scanline schedule produced by the composer

use std::collections::BTreeMap;

use super::{CopyMapping, DestinationBuffer};

/// All copies into one destination buffer at one scanline, in registration order
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemoryUpdate {
    pub destination: DestinationBuffer,
    pub regions: Vec<CopyMapping>,
}

/// Per-destination, scanline-ordered copy lists
///
/// Keys are the scanlines at which the copies must be visible. The schedule
/// is fixed once composition ends; only the staging bytes change per frame.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanlineSchedule {
    buffers: [BTreeMap<u32, Vec<CopyMapping>>; DestinationBuffer::COUNT],
}

impl ScanlineSchedule {
    /// Scanline-keyed copies for one destination.
    pub fn for_buffer(&self, destination: DestinationBuffer) -> &BTreeMap<u32, Vec<CopyMapping>> {
        &self.buffers[destination.index()]
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.iter().all(BTreeMap::is_empty)
    }

    /// Total number of copy mappings across every scanline and destination.
    pub fn mapping_count(&self) -> usize {
        self.buffers
            .iter()
            .flat_map(BTreeMap::values)
            .map(Vec::len)
            .sum()
    }

    /// Merge the destination lists into one scanline-keyed map.
    ///
    /// Within a scanline, updates follow [`DestinationBuffer::ALL`] order and
    /// each keeps its registration order.
    pub fn merged(&self) -> BTreeMap<u32, Vec<MemoryUpdate>> {
        let mut merged: BTreeMap<u32, Vec<MemoryUpdate>> = BTreeMap::new();
        for destination in DestinationBuffer::ALL {
            for (&scanline, regions) in self.for_buffer(destination) {
                merged.entry(scanline).or_default().push(MemoryUpdate {
                    destination,
                    regions: regions.clone(),
                });
            }
        }
        merged
    }

    pub(crate) fn entry_mut(
        &mut self,
        destination: DestinationBuffer,
        scanline: u32,
    ) -> &mut Vec<CopyMapping> {
        self.buffers[destination.index()]
            .entry(scanline)
            .or_default()
    }
}
