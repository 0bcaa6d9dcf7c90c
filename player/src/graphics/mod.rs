//! wgpu presentation backend
//!
//! Owns the destination buffers, the GPU staging buffer, the frame image and
//! the three pipelines (byte copy, scanline compute, blit). The scheduler
//! drives it through [`ScanlineBackend`](ppu_replay_core::ScanlineBackend).

mod backend;
mod blit;
mod copy_pass;
mod init;
mod ppu_pass;
#[cfg(test)]
mod tests;

use std::sync::Arc;

use anyhow::Result;
use winit::window::Window;

use ppu_replay_core::HostStaging;

pub use blit::{Viewport, viewport};
pub use copy_pass::{CopyPlan, CopyRegion, encode_copy_list, plan_copies};
pub use ppu_pass::{WORKGROUP_WIDTH, workgroups};

use crate::config::ScaleMode;
use blit::BlitPass;
use copy_pass::CopyPass;
use init::{DestinationBuffers, FrameTarget, GpuContext, StagingBuffer};
use ppu_pass::PpuPass;

/// WGSL sources, embedded at build time
pub mod shader_source {
    pub const PPU: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/shaders/ppu.wgsl"));
    pub const COPY_BYTES: &str = include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/shaders/copy_bytes.wgsl"
    ));
    pub const BLIT: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/shaders/blit.wgsl"));
}

/// Errors raised while submitting GPU work
#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    #[error("failed to wait for the GPU: {0}")]
    Poll(#[from] wgpu::PollError),

    #[error("GPU validation failed in {stage}: {message}")]
    Validation {
        stage: &'static str,
        message: String,
    },
}

/// Initial contents of the three destination buffers
pub struct DestinationContents<'a> {
    pub ppu_memory: &'a [u8],
    pub oam: &'a [u8],
    pub control: &'a [u8],
}

/// GPU state for one replay session
pub struct PpuGraphics {
    context: GpuContext,
    destinations: DestinationBuffers,
    staging: StagingBuffer,
    frame: FrameTarget,
    copy_pass: CopyPass,
    ppu_pass: PpuPass,
    blit_pass: BlitPass,
    scale_mode: ScaleMode,
    /// Surface texture acquired by the frame's first batch
    surface_texture: Option<wgpu::SurfaceTexture>,
    /// Submission of the batch carrying the completion signal
    frame_complete: Option<wgpu::SubmissionIndex>,
}

impl PpuGraphics {
    /// Create the GPU side of a session.
    ///
    /// `frame_size` is the frame image in pixels: screen width by total
    /// scanlines.
    pub fn new(
        window: Arc<Window>,
        vsync: bool,
        scale_mode: ScaleMode,
        frame_size: (u32, u32),
        destinations: DestinationContents<'_>,
        staging: &[u8],
    ) -> Result<Self> {
        let context = GpuContext::new(window, vsync)?;
        let device = &context.device;

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let destinations = DestinationBuffers::new(
            device,
            destinations.ppu_memory,
            destinations.oam,
            destinations.control,
        );
        let staging = StagingBuffer::new(device, staging);
        let frame = FrameTarget::new(device, frame_size.0, frame_size.1);
        let copy_pass = CopyPass::new(device, &staging, &destinations);
        let ppu_pass = PpuPass::new(device, &destinations, &frame);
        let blit_pass = BlitPass::new(device, context.surface_config.format, &frame);

        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(GpuError::Validation {
                stage: "pipeline creation",
                message: error.to_string(),
            }
            .into());
        }

        tracing::info!(
            "Frame image {}x{}, staging {} bytes",
            frame.width,
            frame.height,
            staging.buffer().size()
        );

        Ok(Self {
            context,
            destinations,
            staging,
            frame,
            copy_pass,
            ppu_pass,
            blit_pass,
            scale_mode,
            surface_texture: None,
            frame_complete: None,
        })
    }

    /// Upload the host staging blob if any mutator touched it since the
    /// last upload.
    pub fn upload_staging(&mut self, staging: &mut HostStaging) {
        if staging.take_dirty() {
            self.staging.upload(&self.context.queue, staging.as_bytes());
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.context.resize(width, height);
    }

    /// Blit the finished frame image and present it.
    ///
    /// Does nothing when no surface texture was acquired this frame.
    pub fn present(&mut self) {
        let frame_complete = self.frame_complete.take();
        let Some(surface_texture) = self.surface_texture.take() else {
            return;
        };
        match frame_complete {
            Some(index) => tracing::trace!("Blit queued behind submission {:?}", index),
            None => tracing::warn!("Presenting a frame whose last batch was not submitted"),
        }

        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let viewport = viewport(
            self.scale_mode,
            (self.frame.width, self.frame.height),
            (
                self.context.surface_config.width,
                self.context.surface_config.height,
            ),
        );

        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Blit Encoder"),
                });
        self.blit_pass.encode(&mut encoder, &view, viewport);
        self.context.queue.submit(std::iter::once(encoder.finish()));
        surface_texture.present();
    }

    /// Drop a frame whose replay failed, releasing its surface texture
    /// without presenting.
    pub fn discard_frame(&mut self) {
        self.frame_complete = None;
        if self.surface_texture.take().is_some() {
            tracing::debug!("Discarded surface texture of a failed frame");
        }
    }

    /// Acquire the surface texture for this frame, reconfiguring once if
    /// the surface was lost.
    fn acquire_surface(&mut self) {
        let surface = &self.context.surface;
        let texture = match surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                surface.configure(&self.context.device, &self.context.surface_config);
                match surface.get_current_texture() {
                    Ok(texture) => texture,
                    Err(e) => {
                        tracing::warn!("Failed to acquire frame after reconfigure: {:?}", e);
                        return;
                    }
                }
            }
            Err(e) => {
                tracing::warn!("Failed to acquire frame: {:?}", e);
                return;
            }
        };
        self.surface_texture = Some(texture);
    }
}
