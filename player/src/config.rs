//! Configuration management (config.toml)
//!
//! Handles loading, saving, and providing defaults for player settings.
//! Settings are stored in TOML format in the platform-specific config directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use ppu_replay_core::ClockConfig;
use ppu_replay_core::nes::{SCANLINES, SCREEN_WIDTH};

/// Player configuration.
///
/// Serialized to/from TOML format for persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    /// Video/window settings
    #[serde(default)]
    pub video: VideoConfig,
    /// Replay session settings
    #[serde(default)]
    pub session: SessionConfig,
}

/// Scaling mode for the frame image to window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ScaleMode {
    /// Stretch to fill window (may distort aspect ratio)
    Stretch,
    /// Maintain aspect ratio, scale to fill as much as possible (adds letterbox bars)
    Fit,
    /// Integer scaling for pixel-perfect rendering (adds black bars, may not fill screen)
    #[default]
    PixelPerfect,
}

/// Video and window configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoConfig {
    /// Whether to start in fullscreen mode (default: false)
    #[serde(default)]
    pub fullscreen: bool,
    /// Whether to enable vertical sync (default: true)
    #[serde(default = "default_true")]
    pub vsync: bool,
    /// Window size multiplier over the frame image (default: 3)
    #[serde(default = "default_scale")]
    pub scale: u32,
    /// Scaling mode for the frame image (default: PixelPerfect)
    #[serde(default)]
    pub scale_mode: ScaleMode,
}

/// Replay session configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Scanlines per frame (default: 240)
    #[serde(default = "default_total_scanlines")]
    pub total_scanlines: u32,
    /// Pixels per scanline, a multiple of 64 (default: 256)
    #[serde(default = "default_screen_width")]
    pub screen_width: u32,
    /// Real time per frame in microseconds (default: 16666)
    #[serde(default = "default_frame_period_micros")]
    pub frame_period_micros: u64,
    /// Reset the row offset at scanline 0 every frame (default: true)
    #[serde(default = "default_true")]
    pub anchor_row_offset: bool,
    /// Directory holding the memory dumps (default: working directory)
    #[serde(default)]
    pub dumps_dir: Option<PathBuf>,
}

impl SessionConfig {
    pub fn clock_config(&self) -> ClockConfig {
        ClockConfig::from_micros(self.frame_period_micros)
    }

    /// Dump directory, falling back to the working directory.
    pub fn dumps_dir(&self) -> &Path {
        self.dumps_dir.as_deref().unwrap_or(Path::new("."))
    }
}

fn default_true() -> bool {
    true
}
fn default_scale() -> u32 {
    3
}
fn default_total_scanlines() -> u32 {
    SCANLINES
}
fn default_screen_width() -> u32 {
    SCREEN_WIDTH
}
fn default_frame_period_micros() -> u64 {
    ClockConfig::DEFAULT_FRAME_PERIOD_MICROS
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            fullscreen: false,
            vsync: default_true(),
            scale: default_scale(),
            scale_mode: ScaleMode::default(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            total_scanlines: default_total_scanlines(),
            screen_width: default_screen_width(),
            frame_period_micros: default_frame_period_micros(),
            anchor_row_offset: default_true(),
            dumps_dir: None,
        }
    }
}

/// Returns the platform-specific configuration directory.
///
/// On Windows: `%APPDATA%\PpuReplay\config`
/// On macOS: `~/Library/Application Support/io.ppureplay.PpuReplay`
/// On Linux: `~/.config/ppureplay`
///
/// Returns `None` if the home directory cannot be determined.
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("io.ppureplay", "", "PpuReplay")
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Loads the configuration from disk.
///
/// Returns default values if the file doesn't exist or cannot be parsed.
pub fn load() -> Config {
    config_dir()
        .map(|dir| load_from(&dir.join("config.toml")))
        .unwrap_or_default()
}

/// Loads the configuration from a specific file, defaulting on any failure.
pub fn load_from(path: &Path) -> Config {
    match std::fs::read_to_string(path) {
        Ok(content) => toml::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!("Ignoring invalid config {}: {}", path.display(), e);
            Config::default()
        }),
        Err(_) => Config::default(),
    }
}

/// Error writing the configuration
#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("failed to write config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Saves the configuration as `config.toml` inside `dir`.
///
/// Creates the directory if it doesn't exist.
pub fn save_to(config: &Config, dir: &Path) -> Result<(), SaveError> {
    std::fs::create_dir_all(dir)?;
    let content = toml::to_string_pretty(config)?;
    std::fs::write(dir.join("config.toml"), content)?;
    Ok(())
}

/// Persists the fullscreen setting alone.
///
/// Command-line overrides live only in the running config, so the file on
/// disk is reloaded and only `video.fullscreen` is changed.
pub fn save_fullscreen(fullscreen: bool) -> Result<(), SaveError> {
    if let Some(dir) = config_dir() {
        save_fullscreen_to(fullscreen, &dir)?;
    }
    Ok(())
}

/// Persists the fullscreen setting into `config.toml` inside `dir`.
pub fn save_fullscreen_to(fullscreen: bool, dir: &Path) -> Result<(), SaveError> {
    let mut config = load_from(&dir.join("config.toml"));
    config.video.fullscreen = fullscreen;
    save_to(&config, dir)
}
