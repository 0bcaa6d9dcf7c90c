//! Staging region composer
//!
//! Builds the staging blob that holds every animatable memory field and the
//! static scanline schedule describing when each field is copied into its
//! destination buffer.
//!
//! # Layout
//!
//! The staging blob is an append-only arena: every field gets the next
//! `size` bytes, so field ranges never overlap and a [`RegionHandle`] stays
//! valid for the lifetime of the session. Each field also gets exactly one
//! [`CopyMapping`] in its destination's mapping list.
//!
//! # Row offset
//!
//! The first time any field is scheduled at a scanline, the composer adds a
//! one-byte field that rewrites the control block's row offset to that
//! scanline, so the compute pass knows which output row the next batch
//! starts at.

use hashbrown::HashSet;

use crate::nes::{Control, Oam, PpuMemory};

mod schedule;
#[cfg(test)]
mod tests;

pub use schedule::{MemoryUpdate, ScanlineSchedule};

/// Destination buffers a staging field can be copied into
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DestinationBuffer {
    /// Primary PPU memory (tilesets, nametables, palettes)
    PpuMemory = 0,
    /// Object attribute memory (sprite table)
    Oam = 1,
    /// Renderer control block
    Control = 2,
}

impl DestinationBuffer {
    pub const COUNT: usize = 3;
    pub const ALL: [DestinationBuffer; Self::COUNT] = [Self::PpuMemory, Self::Oam, Self::Control];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::PpuMemory => "PPU Memory",
            Self::Oam => "OAM",
            Self::Control => "Control",
        }
    }
}

/// One buffer-to-buffer byte copy
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CopyMapping {
    /// Offset into the staging blob
    pub src_offset: u64,
    /// Offset into the destination buffer
    pub dst_offset: u64,
    /// Length in bytes
    pub size: u64,
}

impl CopyMapping {
    /// True when offsets and size satisfy the GPU's 4-byte copy alignment.
    pub fn is_word_aligned(&self) -> bool {
        (self.src_offset | self.dst_offset | self.size) % 4 == 0
    }
}

/// Stable reference to one staging field and its copy mapping
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegionHandle {
    staging_offset: usize,
    size: usize,
    destination: DestinationBuffer,
    mapping_index: usize,
}

impl RegionHandle {
    pub fn staging_offset(&self) -> usize {
        self.staging_offset
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn destination(&self) -> DestinationBuffer {
        self.destination
    }

    pub fn mapping_index(&self) -> usize {
        self.mapping_index
    }
}

/// Byte capacity of each destination buffer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DestinationLayout {
    sizes: [u64; DestinationBuffer::COUNT],
}

impl DestinationLayout {
    pub fn new(ppu_memory: u64, oam: u64, control: u64) -> Self {
        Self {
            sizes: [ppu_memory, oam, control],
        }
    }

    /// Layout of the NES structs in [`crate::nes`].
    pub fn nes() -> Self {
        Self::new(PpuMemory::SIZE as u64, Oam::SIZE as u64, Control::SIZE as u64)
    }

    pub fn size(&self, destination: DestinationBuffer) -> u64 {
        self.sizes[destination.index()]
    }
}

/// Composer setup errors. All of these are programming errors in a scene.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ComposeError {
    #[error("staging field for {} at offset {offset} has zero size", .destination.label())]
    ZeroSized {
        destination: DestinationBuffer,
        offset: u64,
    },

    #[error("initial value is {actual} bytes but the field is {expected} bytes")]
    InitialValueSize { expected: usize, actual: usize },

    #[error(
        "field {offset}..{} does not fit in {} ({capacity} bytes)",
        .offset + .size,
        .destination.label()
    )]
    DestinationOutOfBounds {
        destination: DestinationBuffer,
        offset: u64,
        size: u64,
        capacity: u64,
    },

    #[error("region handle does not belong to this composer: {0:?}")]
    UnknownHandle(RegionHandle),

    #[error("scanline {0} cannot be stored in the one-byte row offset")]
    RowOffsetOverflow(u32),
}

/// Output of composition: the initial staging blob and the static schedule
#[derive(Debug, Clone)]
pub struct ComposedUpdates {
    /// Initial staging contents. Never empty.
    pub staging: Vec<u8>,
    pub schedule: ScanlineSchedule,
}

/// Composes staging fields and their scanline updates
#[derive(Debug)]
pub struct MemoryUpdateComposer {
    layout: DestinationLayout,
    row_offset_location: u64,
    staging: Vec<u8>,
    mappings: [Vec<CopyMapping>; DestinationBuffer::COUNT],
    schedule: ScanlineSchedule,
    scanlines_with_updates: HashSet<u32>,
}

impl MemoryUpdateComposer {
    /// Create a composer for the given destination layout.
    ///
    /// `row_offset_location` is the control-block offset of the row offset
    /// byte (normally [`Control::ROW_OFFSET`]).
    pub fn new(layout: DestinationLayout, row_offset_location: u64) -> Self {
        Self {
            layout,
            row_offset_location,
            staging: Vec::new(),
            mappings: Default::default(),
            schedule: ScanlineSchedule::default(),
            scanlines_with_updates: HashSet::new(),
        }
    }

    /// Composer for the NES layout, with the row offset at [`Control::ROW_OFFSET`].
    pub fn nes() -> Self {
        Self::new(DestinationLayout::nes(), Control::ROW_OFFSET)
    }

    /// Append a staging field copied to `destination` at `dst_offset`.
    ///
    /// The field is zero-filled unless `initial` is given, in which case it
    /// must be exactly `size` bytes.
    pub fn add_staging_field(
        &mut self,
        destination: DestinationBuffer,
        dst_offset: u64,
        size: usize,
        initial: Option<&[u8]>,
    ) -> Result<RegionHandle, ComposeError> {
        if size == 0 {
            return Err(ComposeError::ZeroSized {
                destination,
                offset: dst_offset,
            });
        }
        if let Some(initial) = initial
            && initial.len() != size
        {
            return Err(ComposeError::InitialValueSize {
                expected: size,
                actual: initial.len(),
            });
        }
        let capacity = self.layout.size(destination);
        if dst_offset
            .checked_add(size as u64)
            .is_none_or(|end| end > capacity)
        {
            return Err(ComposeError::DestinationOutOfBounds {
                destination,
                offset: dst_offset,
                size: size as u64,
                capacity,
            });
        }

        let mappings = &mut self.mappings[destination.index()];
        let handle = RegionHandle {
            staging_offset: self.staging.len(),
            size,
            destination,
            mapping_index: mappings.len(),
        };

        mappings.push(CopyMapping {
            src_offset: handle.staging_offset as u64,
            dst_offset,
            size: size as u64,
        });

        match initial {
            Some(initial) => self.staging.extend_from_slice(initial),
            None => self.staging.resize(self.staging.len() + size, 0),
        }

        Ok(handle)
    }

    /// Schedule `handle`'s copy to become visible at `scanline`.
    ///
    /// Registering the same pair twice appends a second copy of the mapping;
    /// it is re-applied with whatever bytes the staging field holds then.
    pub fn add_update(&mut self, handle: RegionHandle, scanline: u32) -> Result<(), ComposeError> {
        self.mapping_for(handle)?;

        if !self.scanlines_with_updates.contains(&scanline) {
            let row_offset =
                u8::try_from(scanline).map_err(|_| ComposeError::RowOffsetOverflow(scanline))?;
            let row_offset_handle = self.add_staging_field(
                DestinationBuffer::Control,
                self.row_offset_location,
                1,
                Some(&[row_offset]),
            )?;
            self.add_update_internal(row_offset_handle, scanline)?;
            self.scanlines_with_updates.insert(scanline);
        }

        self.add_update_internal(handle, scanline)
    }

    /// Make the first batch of every frame start from row 0.
    ///
    /// The row offset persists in the control buffer across frames, so when
    /// no update lands on scanline 0 the first batch of the next frame would
    /// start at the previous frame's last row offset. Returns true if a
    /// row-offset write was added at scanline 0.
    pub fn anchor_row_offset(&mut self) -> Result<bool, ComposeError> {
        if self.scanlines_with_updates.is_empty() || self.scanlines_with_updates.contains(&0) {
            return Ok(false);
        }
        let handle = self.add_staging_field(
            DestinationBuffer::Control,
            self.row_offset_location,
            1,
            Some(&[0]),
        )?;
        self.add_update_internal(handle, 0)?;
        self.scanlines_with_updates.insert(0);
        Ok(true)
    }

    /// Copy mapping registered for `handle`.
    pub fn mapping_for(&self, handle: RegionHandle) -> Result<CopyMapping, ComposeError> {
        self.mappings[handle.destination.index()]
            .get(handle.mapping_index)
            .copied()
            .filter(|mapping| {
                mapping.src_offset == handle.staging_offset as u64
                    && mapping.size == handle.size as u64
            })
            .ok_or(ComposeError::UnknownHandle(handle))
    }

    /// Current staging size in bytes.
    pub fn staging_len(&self) -> usize {
        self.staging.len()
    }

    /// Number of distinct scanlines with at least one update.
    pub fn updated_scanline_count(&self) -> usize {
        self.scanlines_with_updates.len()
    }

    pub fn schedule(&self) -> &ScanlineSchedule {
        &self.schedule
    }

    /// Finalize the staging blob and schedule.
    pub fn build(mut self) -> ComposedUpdates {
        if self.staging.is_empty() {
            // Zero-sized buffers are not allowed on the GPU side
            self.staging.push(0);
        }

        tracing::debug!(
            "Composed {} staging bytes, {} scheduled scanlines, {} copy mappings",
            self.staging.len(),
            self.scanlines_with_updates.len(),
            self.schedule.mapping_count()
        );

        ComposedUpdates {
            staging: self.staging,
            schedule: self.schedule,
        }
    }

    fn add_update_internal(
        &mut self,
        handle: RegionHandle,
        scanline: u32,
    ) -> Result<(), ComposeError> {
        let mapping = self.mapping_for(handle)?;
        let updates = self.schedule.entry_mut(handle.destination, scanline);
        if updates.contains(&mapping) {
            tracing::debug!(
                "Duplicate update for {} staging offset {} at scanline {}",
                handle.destination.label(),
                handle.staging_offset,
                scanline
            );
        }
        updates.push(mapping);
        Ok(())
    }
}
