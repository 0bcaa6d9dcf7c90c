//! Replay session
//!
//! Ties a scene to the core: loads its dumps, composes its updates, and
//! owns the host staging blob, the frame clock and the scanline scheduler.

use std::path::Path;

use anyhow::{Context, Result, bail};

use ppu_replay_core::nes::{Control, Oam, PpuMemory};
use ppu_replay_core::{
    ClockConfig, FrameClock, FrameReport, HostStaging, MemoryUpdateComposer, ScanlineBackend,
    ScanlineScheduler, TickReport, load_dump,
};

use crate::config::SessionConfig;
use crate::graphics::{DestinationContents, PpuGraphics, WORKGROUP_WIDTH};
use crate::scenes::{Scene, SceneContext};

/// Initial contents of the destination buffers
pub struct SessionMemory {
    pub ppu_memory: Box<PpuMemory>,
    pub oam: Oam,
    pub control: Control,
}

impl SessionMemory {
    /// Load a scene's dumps from `dumps_dir`.
    pub fn load(scene: &dyn Scene, dumps_dir: &Path) -> Result<Self> {
        let ppu_path = dumps_dir.join(scene.ppu_dump());
        let oam_path = dumps_dir.join(scene.oam_dump());
        let ppu_memory = Box::new(
            load_dump::<PpuMemory>(&ppu_path).context("Failed to load PPU memory dump")?,
        );
        let oam = load_dump::<Oam>(&oam_path).context("Failed to load OAM dump")?;

        tracing::info!(
            "Loaded dumps {} and {}",
            ppu_path.display(),
            oam_path.display()
        );

        Ok(Self {
            ppu_memory,
            oam,
            control: scene.control(),
        })
    }
}

pub struct PpuSession {
    memory: SessionMemory,
    staging: HostStaging,
    clock: FrameClock,
    scheduler: ScanlineScheduler,
    screen_width: u32,
}

impl PpuSession {
    /// Load a scene's dumps and compose its updates.
    pub fn new(scene: &dyn Scene, config: &SessionConfig) -> Result<Self> {
        let memory = SessionMemory::load(scene, config.dumps_dir())?;
        Self::with_memory(scene, config, memory)
    }

    /// Compose a scene over already-loaded memory.
    pub fn with_memory(
        scene: &dyn Scene,
        config: &SessionConfig,
        memory: SessionMemory,
    ) -> Result<Self> {
        if config.screen_width == 0 || config.screen_width % WORKGROUP_WIDTH != 0 {
            bail!(
                "Screen width {} must be a non-zero multiple of {}",
                config.screen_width,
                WORKGROUP_WIDTH
            );
        }

        let mut composer = MemoryUpdateComposer::nes();
        let mutators = scene
            .compose(&mut SceneContext {
                composer: &mut composer,
                dumps_dir: config.dumps_dir(),
            })
            .with_context(|| format!("Failed to compose scene `{}`", scene.name()))?;

        if config.anchor_row_offset && composer.anchor_row_offset()? {
            tracing::debug!("Anchored row offset at scanline 0");
        }

        let composed = composer.build();
        let scheduler = ScanlineScheduler::from_schedule(config.total_scanlines, &composed.schedule)
            .context("Invalid scanline schedule")?;

        let mut clock = FrameClock::new(config.clock_config());
        for mutator in mutators {
            clock.add_mutator(mutator)?;
        }

        tracing::info!(
            "Scene `{}`: {} staging bytes, {} mutators, {} batches per frame",
            scene.name(),
            composed.staging.len(),
            clock.mutator_count(),
            scheduler.batches().count()
        );

        Ok(Self {
            memory,
            staging: HostStaging::new(composed.staging),
            clock,
            scheduler,
            screen_width: config.screen_width,
        })
    }

    /// Frame image size: screen width by total scanlines.
    pub fn frame_size(&self) -> (u32, u32) {
        (self.screen_width, self.scheduler.total_scanlines())
    }

    pub fn destination_contents(&self) -> DestinationContents<'_> {
        DestinationContents {
            ppu_memory: bytemuck::bytes_of(&*self.memory.ppu_memory),
            oam: bytemuck::bytes_of(&self.memory.oam),
            control: bytemuck::bytes_of(&self.memory.control),
        }
    }

    pub fn staging(&self) -> &HostStaging {
        &self.staging
    }

    pub fn scheduler(&self) -> &ScanlineScheduler {
        &self.scheduler
    }

    pub fn clock_config(&self) -> &ClockConfig {
        self.clock.config()
    }

    /// Run the mutators that are due.
    pub fn tick(&mut self) -> TickReport {
        self.clock.tick(&mut self.staging)
    }

    /// Replay the frame's batch plan against any backend.
    pub fn run_frame<B: ScanlineBackend>(&self, backend: &mut B) -> Result<FrameReport> {
        Ok(self.scheduler.run_frame(backend)?)
    }

    /// Tick, upload staging, replay the frame and present it.
    ///
    /// A failed replay discards the frame instead of presenting it.
    pub fn render(&mut self, graphics: &mut PpuGraphics) -> Result<FrameReport> {
        let tick = self.tick();
        if tick.failed > 0 {
            tracing::debug!("{} mutators failed on frame {}", tick.failed, tick.frame);
        }
        graphics.upload_staging(&mut self.staging);
        match self.run_frame(graphics) {
            Ok(report) => {
                graphics.present();
                Ok(report)
            }
            Err(e) => {
                graphics.discard_frame();
                Err(e.context("Frame replay failed"))
            }
        }
    }
}
