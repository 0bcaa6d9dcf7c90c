//! PPU Replay player
//!
//! wgpu presentation for [`ppu_replay_core`]: destination buffers on the GPU,
//! a compute pass that renders scanline batches into a frame image, and a
//! winit window that shows it.
//!
//! - [`scenes`] - Built-in scenes (dumps plus their mid-frame effects)
//! - [`session`] - Composition and per-frame replay
//! - [`graphics`] - wgpu backend driven by the scanline scheduler
//! - [`app`] - Window and event loop
//! - [`config`] - Persistent settings

pub mod app;
pub mod config;
pub mod graphics;
pub mod scenes;
pub mod session;
