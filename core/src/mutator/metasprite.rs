//! Metasprite animators
//!
//! A metasprite is a `width x height` grid of hardware sprites stored as
//! consecutive fixed-stride records, row-major.

use hashbrown::HashMap;

use super::{MutateError, Mutator};
use crate::composer::RegionHandle;
use crate::nes::Sprite;

/// Grid dimensions and record stride of a metasprite
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MetaspriteSize {
    pub width: usize,
    pub height: usize,
    pub stride: usize,
}

impl MetaspriteSize {
    /// Metasprite made of OAM entries.
    pub const fn sprites(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            stride: Sprite::SIZE,
        }
    }

    pub const fn records(&self) -> usize {
        self.width * self.height
    }

    pub const fn byte_len(&self) -> usize {
        self.records() * self.stride
    }

    fn for_each_record(
        &self,
        view: &mut [u8],
        f: impl FnMut(&mut [u8]),
    ) -> Result<(), MutateError> {
        MutateError::check_len(self.byte_len(), view.len())?;
        if self.stride > 0 {
            view.chunks_exact_mut(self.stride).for_each(f);
        }
        Ok(())
    }
}

/// Remaps each record's tile index through a lookup table.
///
/// Tiles missing from the table are left alone, so a table of pairs
/// `a -> b, b -> a` toggles between two animation frames.
pub struct MetaspriteTileAnimator {
    region: RegionHandle,
    size: MetaspriteSize,
    cadence: u64,
    tile_offset: usize,
    mapping: HashMap<u8, u8>,
}

impl MetaspriteTileAnimator {
    pub fn new(
        region: RegionHandle,
        size: MetaspriteSize,
        cadence: u64,
        tile_offset: usize,
        mapping: impl IntoIterator<Item = (u8, u8)>,
    ) -> Result<Self, MutateError> {
        MutateError::check_len(size.byte_len(), region.size())?;
        if tile_offset >= size.stride {
            return Err(MutateError::RegionSize {
                expected: tile_offset + 1,
                actual: size.stride,
            });
        }
        Ok(Self {
            region,
            size,
            cadence,
            tile_offset,
            mapping: mapping.into_iter().collect(),
        })
    }

    /// Build a table that swaps each pair both ways.
    pub fn toggles(pairs: &[(u8, u8)]) -> impl Iterator<Item = (u8, u8)> + '_ {
        pairs.iter().flat_map(|&(a, b)| [(a, b), (b, a)])
    }
}

impl Mutator for MetaspriteTileAnimator {
    fn region(&self) -> RegionHandle {
        self.region
    }

    fn cadence(&self) -> u64 {
        self.cadence
    }

    fn mutate(&mut self, view: &mut [u8]) -> Result<(), MutateError> {
        let tile_offset = self.tile_offset;
        let mapping = &self.mapping;
        self.size.for_each_record(view, |record| {
            let tile = &mut record[tile_offset];
            if let Some(&next) = mapping.get(&*tile) {
                *tile = next;
            }
        })
    }

    fn name(&self) -> &str {
        "metasprite tile animator"
    }
}

/// Per-axis position step, wrapping at `max`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AxisMotion {
    /// Byte offset of the coordinate within a record
    pub offset: usize,
    pub delta: u16,
    /// Exclusive upper bound; coordinates wrap to `(value + delta) % max`
    pub max: u16,
}

/// Moves every record of a metasprite by a fixed delta per invocation.
pub struct MetaspritePositionAnimator {
    region: RegionHandle,
    size: MetaspriteSize,
    cadence: u64,
    x: AxisMotion,
    y: AxisMotion,
}

impl MetaspritePositionAnimator {
    pub fn new(
        region: RegionHandle,
        size: MetaspriteSize,
        cadence: u64,
        x: AxisMotion,
        y: AxisMotion,
    ) -> Result<Self, MutateError> {
        MutateError::check_len(size.byte_len(), region.size())?;
        for axis in [x, y] {
            if axis.offset >= size.stride {
                return Err(MutateError::RegionSize {
                    expected: axis.offset + 1,
                    actual: size.stride,
                });
            }
            if axis.max == 0 {
                return Err(MutateError::Custom(
                    "position wrap bound must be non-zero".to_string(),
                ));
            }
        }
        Ok(Self {
            region,
            size,
            cadence,
            x,
            y,
        })
    }

    /// Motion over OAM sprite records, wrapping at the given screen bounds.
    pub fn sprites(
        region: RegionHandle,
        size: MetaspriteSize,
        cadence: u64,
        (dx, dy): (u16, u16),
        (max_x, max_y): (u16, u16),
    ) -> Result<Self, MutateError> {
        Self::new(
            region,
            size,
            cadence,
            AxisMotion {
                offset: Sprite::X,
                delta: dx,
                max: max_x,
            },
            AxisMotion {
                offset: Sprite::Y,
                delta: dy,
                max: max_y,
            },
        )
    }
}

fn step(value: &mut u8, motion: AxisMotion) {
    *value = ((u32::from(*value) + u32::from(motion.delta)) % u32::from(motion.max)) as u8;
}

impl Mutator for MetaspritePositionAnimator {
    fn region(&self) -> RegionHandle {
        self.region
    }

    fn cadence(&self) -> u64 {
        self.cadence
    }

    fn mutate(&mut self, view: &mut [u8]) -> Result<(), MutateError> {
        let (x, y) = (self.x, self.y);
        self.size.for_each_record(view, |record| {
            step(&mut record[x.offset], x);
            step(&mut record[y.offset], y);
        })
    }

    fn name(&self) -> &str {
        "metasprite position animator"
    }
}
