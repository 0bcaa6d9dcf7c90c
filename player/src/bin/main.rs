//! PPU Replay - Standalone Player
//!
//! Replays NES picture-processing-unit memory dumps with scanline-accurate
//! mid-frame updates.
//!
//! # Usage
//!
//! ```bash
//! ppu-replay smb3 --dumps-dir ~/dumps
//! ppu-replay batman --scale 2 --fullscreen
//! ppu-replay --list-scenes
//! ```
//!
//! # Keyboard Shortcuts
//!
//! - ESC: Quit
//! - F11: Toggle fullscreen

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ppu_replay::app::{App, run};
use ppu_replay::config;
use ppu_replay::scenes;
use ppu_replay::session::PpuSession;

#[derive(Parser)]
#[command(name = "ppu-replay")]
#[command(author, version, about = "PPU Replay - scanline-batched NES memory replay")]
struct Args {
    /// Scene to replay (see --list-scenes)
    #[arg(default_value = "smb3-status")]
    scene: String,

    /// Directory holding the memory dumps (overrides the config file)
    #[arg(long, value_name = "DIR")]
    dumps_dir: Option<PathBuf>,

    /// Integer window scale over the frame image
    #[arg(long, short = 's')]
    scale: Option<u32>,

    /// Start in fullscreen mode
    #[arg(long, short = 'f')]
    fullscreen: bool,

    /// List the built-in scenes and exit
    #[arg(long)]
    list_scenes: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    if args.list_scenes {
        for scene in scenes::all() {
            println!("{:<12} {}", scene.name(), scene.description());
        }
        return Ok(());
    }

    let Some(scene) = scenes::find(&args.scene) else {
        anyhow::bail!(
            "Unknown scene `{}` (available: {})",
            args.scene,
            scenes::all()
                .iter()
                .map(|scene| scene.name())
                .collect::<Vec<_>>()
                .join(", ")
        );
    };

    let mut config = config::load();
    if let Some(dumps_dir) = args.dumps_dir {
        config.session.dumps_dir = Some(dumps_dir);
    }
    if let Some(scale) = args.scale {
        if scale == 0 {
            anyhow::bail!("Scale must be at least 1");
        }
        config.video.scale = scale;
    }
    config.video.fullscreen |= args.fullscreen;

    let session = PpuSession::new(scene.as_ref(), &config.session)
        .with_context(|| format!("Failed to start scene `{}`", scene.name()))?;

    run(App::new(config, scene.name(), session))
}
