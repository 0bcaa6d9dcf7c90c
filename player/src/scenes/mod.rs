//! Built-in replay scenes
//!
//! A scene names the memory dumps it replays and composes the staging
//! fields, scanline updates and mutators that bring them to life.

mod batman;
mod smb3;

use std::path::{Path, PathBuf};

use anyhow::Result;

use ppu_replay_core::nes::Control;
use ppu_replay_core::{MemoryUpdateComposer, Mutator};

pub use batman::{BATMAN_FRAMES, Batman};
pub use smb3::{PaletteCycle, Smb3, Smb3Status};

/// What a scene gets to work with while composing
pub struct SceneContext<'a> {
    pub composer: &'a mut MemoryUpdateComposer,
    /// Root directory of the memory dumps
    pub dumps_dir: &'a Path,
}

pub trait Scene {
    /// Name used on the command line.
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// PPU memory dump, relative to the dump directory.
    fn ppu_dump(&self) -> PathBuf;

    /// OAM dump, relative to the dump directory.
    fn oam_dump(&self) -> PathBuf;

    /// Initial control block.
    fn control(&self) -> Control {
        Control::default()
    }

    /// Register staging fields and updates, and return the mutators that
    /// drive them.
    fn compose(&self, ctx: &mut SceneContext<'_>) -> Result<Vec<Box<dyn Mutator>>>;
}

/// Every built-in scene, in listing order.
pub fn all() -> Vec<Box<dyn Scene>> {
    vec![Box::new(Smb3Status), Box::new(Smb3), Box::new(Batman)]
}

/// Look up a built-in scene by name.
pub fn find(name: &str) -> Option<Box<dyn Scene>> {
    all().into_iter().find(|scene| scene.name() == name)
}
