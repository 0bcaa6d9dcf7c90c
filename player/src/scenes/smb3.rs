//! Super Mario Bros. 3 title screen
//!
//! The status bar lives in a different nametable than the playfield, so the
//! nametable switches at scanline 192. One background color pulses through
//! the palette's brightness rows.

use std::path::PathBuf;

use anyhow::{Context, Result};

use ppu_replay_core::mutator::{MetaspritePositionAnimator, MetaspriteSize, MetaspriteTileAnimator};
use ppu_replay_core::nes::{Control, Oam, PpuMemory, SCANLINES, SCREEN_WIDTH, Sprite};
use ppu_replay_core::{
    DestinationBuffer, MemoryUpdateComposer, MutateError, Mutator, RegionHandle,
};

use super::{Scene, SceneContext};

/// First scanline of the status bar
const STATUS_BAR_SCANLINE: u32 = 192;
const STATUS_BAR_NAMETABLE: u8 = 2;
const PALETTE_CYCLE_START: u8 = 0x17;

/// 2x3 walking turtle, top row first
const TURTLE: [Sprite; 6] = [
    Sprite::new(0xBA, 0xE9, 0x42, 0x06),
    Sprite::new(0xBA, 0xE7, 0x42, 0x0E),
    Sprite::new(0xAA, 0xE5, 0x43, 0x06),
    Sprite::new(0xAA, 0xE3, 0x42, 0x0E),
    Sprite::new(0x9A, 0xB1, 0x42, 0x06),
    Sprite::new(0x9A, 0xE1, 0x42, 0x0E),
];
const TURTLE_SIZE: MetaspriteSize = MetaspriteSize::sprites(2, 3);
const TURTLE_WALK_FRAMES: [(u8, u8); 3] = [(0xE3, 0xEB), (0xE9, 0xEF), (0xE7, 0xED)];

/// Steps one palette color through brightness rows, bouncing between the
/// darkest (0x07) and brightest (0x37) shade of its hue.
pub struct PaletteCycle {
    region: RegionHandle,
    descending: bool,
}

impl PaletteCycle {
    pub const CADENCE: u64 = 4;

    pub fn new(region: RegionHandle) -> Result<Self, MutateError> {
        MutateError::check_len(1, region.size())?;
        Ok(Self {
            region,
            descending: true,
        })
    }
}

impl Mutator for PaletteCycle {
    fn region(&self) -> RegionHandle {
        self.region
    }

    fn cadence(&self) -> u64 {
        Self::CADENCE
    }

    fn mutate(&mut self, view: &mut [u8]) -> Result<(), MutateError> {
        MutateError::check_len(1, view.len())?;
        let color = &mut view[0];
        if *color == 0x37 || *color == 0x07 {
            self.descending = !self.descending;
        }
        *color = if self.descending {
            color.wrapping_sub(0x10)
        } else {
            color.wrapping_add(0x10)
        };
        Ok(())
    }

    fn name(&self) -> &str {
        "palette cycle"
    }
}

/// Palette cycle plus the playfield/status bar nametable split.
fn compose_status_bar(composer: &mut MemoryUpdateComposer) -> Result<Box<dyn Mutator>> {
    let cycled_color = composer
        .add_staging_field(
            DestinationBuffer::PpuMemory,
            PpuMemory::background_palette_offset(3, 2),
            1,
            Some(&[PALETTE_CYCLE_START]),
        )
        .context("Failed to add palette field")?;
    let playfield = composer.add_staging_field(
        DestinationBuffer::Control,
        Control::NAMETABLE_START,
        1,
        Some(&[0]),
    )?;
    let status_bar = composer.add_staging_field(
        DestinationBuffer::Control,
        Control::NAMETABLE_START,
        1,
        Some(&[STATUS_BAR_NAMETABLE]),
    )?;

    composer.add_update(cycled_color, 0)?;
    composer.add_update(playfield, 0)?;
    composer.add_update(status_bar, STATUS_BAR_SCANLINE)?;

    Ok(Box::new(PaletteCycle::new(cycled_color)?))
}

/// Status bar split and palette cycle only
pub struct Smb3Status;

impl Scene for Smb3Status {
    fn name(&self) -> &'static str {
        "smb3-status"
    }

    fn description(&self) -> &'static str {
        "SMB3 title: palette cycle and status bar nametable split"
    }

    fn ppu_dump(&self) -> PathBuf {
        PathBuf::from("ppu_dump.bin")
    }

    fn oam_dump(&self) -> PathBuf {
        PathBuf::from("oam_dump.bin")
    }

    fn compose(&self, ctx: &mut SceneContext<'_>) -> Result<Vec<Box<dyn Mutator>>> {
        Ok(vec![compose_status_bar(ctx.composer)?])
    }
}

/// Status bar scene plus a walking turtle
pub struct Smb3;

impl Scene for Smb3 {
    fn name(&self) -> &'static str {
        "smb3"
    }

    fn description(&self) -> &'static str {
        "SMB3 title: status bar split, palette cycle and a walking turtle"
    }

    fn ppu_dump(&self) -> PathBuf {
        PathBuf::from("smb3/ppu_dump.bin")
    }

    fn oam_dump(&self) -> PathBuf {
        PathBuf::from("smb3/oam_dump.bin")
    }

    fn compose(&self, ctx: &mut SceneContext<'_>) -> Result<Vec<Box<dyn Mutator>>> {
        let palette_cycle = compose_status_bar(ctx.composer)?;

        let turtle = ctx
            .composer
            .add_staging_field(
                DestinationBuffer::Oam,
                Oam::sprite_offset(0),
                TURTLE_SIZE.byte_len(),
                Some(bytemuck::cast_slice(&TURTLE)),
            )
            .context("Failed to add turtle metasprite")?;
        ctx.composer.add_update(turtle, 0)?;

        let walk = MetaspriteTileAnimator::new(
            turtle,
            TURTLE_SIZE,
            6,
            Sprite::TILE_INDEX,
            MetaspriteTileAnimator::toggles(&TURTLE_WALK_FRAMES),
        )?;
        let motion = MetaspritePositionAnimator::sprites(
            turtle,
            TURTLE_SIZE,
            3,
            (1, 0),
            (SCREEN_WIDTH as u16, SCANLINES as u16),
        )?;

        Ok(vec![palette_cycle, Box::new(walk), Box::new(motion)])
    }
}
