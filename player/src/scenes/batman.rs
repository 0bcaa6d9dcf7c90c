//! Batman title screen
//!
//! The animated logo is drawn from tiles 0xC0..=0xF8 of the first tileset.
//! Those tiles are swapped from precomputed dumps of later frames.

use std::path::PathBuf;

use anyhow::{Context, Result};

use ppu_replay_core::mutator::TilesetFrameAnimator;
use ppu_replay_core::nes::{PpuMemory, Tile};
use ppu_replay_core::{DestinationBuffer, Mutator, load_frames};

use super::{Scene, SceneContext};

/// Precomputed tileset frames in `batman/tileframes`
pub const BATMAN_FRAMES: usize = 8;

const FIRST_TILE: usize = 0xC0;
const END_TILE: usize = 0xF9;
const FRAME_CADENCE: u64 = 2;

pub struct Batman;

impl Batman {
    fn tileframes_dir() -> PathBuf {
        PathBuf::from("batman/tileframes")
    }
}

impl Scene for Batman {
    fn name(&self) -> &'static str {
        "batman"
    }

    fn description(&self) -> &'static str {
        "Batman title: tileset animation from precomputed frames"
    }

    fn ppu_dump(&self) -> PathBuf {
        PathBuf::from("batman/ppu_dump.bin")
    }

    fn oam_dump(&self) -> PathBuf {
        PathBuf::from("batman/oam_dump.bin")
    }

    fn compose(&self, ctx: &mut SceneContext<'_>) -> Result<Vec<Box<dyn Mutator>>> {
        let offset = PpuMemory::tile_offset(0, FIRST_TILE);
        let tiles = ctx.composer.add_staging_field(
            DestinationBuffer::PpuMemory,
            offset,
            (END_TILE - FIRST_TILE) * size_of::<Tile>(),
            None,
        )?;
        ctx.composer.add_update(tiles, 0)?;

        let dir = ctx.dumps_dir.join(Self::tileframes_dir());
        let frames = load_frames(&dir, BATMAN_FRAMES)
            .with_context(|| format!("Failed to load tileset frames from {}", dir.display()))?;
        let animator = TilesetFrameAnimator::new(tiles, FRAME_CADENCE, frames, offset as usize)?;

        Ok(vec![Box::new(animator)])
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use ppu_replay_core::{ClockConfig, FrameClock, HostStaging, MemoryUpdateComposer};

    use super::*;

    /// Frame `i` fills the animated tiles with byte `i + 1`.
    fn write_frames(root: &std::path::Path) {
        let dir = root.join(Batman::tileframes_dir());
        std::fs::create_dir_all(&dir).unwrap();
        for i in 0..BATMAN_FRAMES {
            let mut bytes = vec![0u8; PpuMemory::SIZE];
            let start = PpuMemory::tile_offset(0, FIRST_TILE) as usize;
            let end = PpuMemory::tile_offset(0, END_TILE) as usize;
            bytes[start..end].fill(i as u8 + 1);
            std::fs::write(dir.join(format!("{i}.bin")), bytes).unwrap();
        }
    }

    #[test]
    fn test_batman_cycles_tile_frames() {
        let root = tempfile::tempdir().unwrap();
        write_frames(root.path());

        let mut composer = MemoryUpdateComposer::nes();
        let mutators = Batman
            .compose(&mut SceneContext {
                composer: &mut composer,
                dumps_dir: root.path(),
            })
            .unwrap();
        let composed = composer.build();

        // One 912-byte tile field plus the row offset byte
        assert_eq!(composed.staging.len(), 57 * 16 + 1);

        let mut staging = HostStaging::new(composed.staging);
        let mut clock = FrameClock::new(ClockConfig::from_micros(1000));
        for mutator in mutators {
            clock.add_mutator(mutator).unwrap();
        }

        let start = Instant::now();
        let mut seen = Vec::new();
        for frame in 1..=20u64 {
            clock.tick_at(start + Duration::from_millis(frame), &mut staging);
            if frame % 2 == 0 {
                seen.push(staging.as_bytes()[0]);
            }
        }
        // Frames loop back to the first after the eighth
        assert_eq!(seen, vec![1, 2, 3, 4, 5, 6, 7, 8, 1, 2]);
        assert!(staging.as_bytes()[..912].iter().all(|&b| b == 2));
    }

    #[test]
    fn test_batman_missing_frames_fail() {
        let root = tempfile::tempdir().unwrap();
        let mut composer = MemoryUpdateComposer::nes();
        let result = Batman.compose(&mut SceneContext {
            composer: &mut composer,
            dumps_dir: root.path(),
        });
        assert!(result.is_err());
    }
}
