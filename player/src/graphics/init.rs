//! Device, surface and buffer creation

use std::sync::Arc;

use anyhow::{Context, Result};
use wgpu::util::DeviceExt;
use winit::window::Window;

use ppu_replay_core::DestinationBuffer;

/// Device, queue and the configured window surface
pub(crate) struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub surface: wgpu::Surface<'static>,
    pub surface_config: wgpu::SurfaceConfiguration,
}

impl GpuContext {
    pub fn new(window: Arc<Window>, vsync: bool) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .context("Failed to create surface")?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context("Failed to find suitable GPU adapter")?;

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("PPU Replay Device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: wgpu::MemoryHints::Performance,
            experimental_features: Default::default(),
            trace: wgpu::Trace::Off,
        }))
        .context("Failed to create GPU device")?;

        let size = window.inner_size();
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_format(&surface_caps.formats)
            .context("Surface reports no supported formats")?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: if vsync {
                wgpu::PresentMode::AutoVsync
            } else {
                wgpu::PresentMode::AutoNoVsync
            },
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        surface.configure(&device, &surface_config);

        tracing::info!(
            "Graphics initialized: {} ({:?}), {}x{}, format: {:?}",
            adapter.get_info().name,
            adapter.get_info().backend,
            surface_config.width,
            surface_config.height,
            surface_format
        );

        Ok(Self {
            device,
            queue,
            surface,
            surface_config,
        })
    }

    /// Reconfigure the surface for a new window size. Zero sizes are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.surface_config.width = width;
            self.surface_config.height = height;
            self.surface.configure(&self.device, &self.surface_config);
            tracing::debug!("Surface resized to {}x{}", width, height);
        }
    }
}

/// GPU copies of the three destination buffers, indexed by [`DestinationBuffer`]
pub(crate) struct DestinationBuffers {
    buffers: [wgpu::Buffer; DestinationBuffer::COUNT],
}

impl DestinationBuffers {
    /// Create storage buffers initialized from the dump contents.
    pub fn new(device: &wgpu::Device, ppu_memory: &[u8], oam: &[u8], control: &[u8]) -> Self {
        let create = |destination: DestinationBuffer, contents: &[u8]| {
            tracing::debug!(
                "Creating {} buffer ({} bytes)",
                destination.label(),
                contents.len()
            );
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(destination.label()),
                contents,
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            })
        };

        Self {
            buffers: [
                create(DestinationBuffer::PpuMemory, ppu_memory),
                create(DestinationBuffer::Oam, oam),
                create(DestinationBuffer::Control, control),
            ],
        }
    }

    pub fn get(&self, destination: DestinationBuffer) -> &wgpu::Buffer {
        &self.buffers[destination.index()]
    }
}

/// GPU side of the staging blob
pub(crate) struct StagingBuffer {
    buffer: wgpu::Buffer,
    scratch: Vec<u8>,
}

impl StagingBuffer {
    pub fn new(device: &wgpu::Device, initial: &[u8]) -> Self {
        let mut scratch = initial.to_vec();
        pad_to_copy_alignment(&mut scratch);
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Staging"),
            contents: &scratch,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_DST
                | wgpu::BufferUsages::COPY_SRC,
        });
        Self { buffer, scratch }
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    /// Queue a full upload of `bytes`. It lands before the next submission.
    pub fn upload(&mut self, queue: &wgpu::Queue, bytes: &[u8]) {
        self.scratch.clear();
        self.scratch.extend_from_slice(bytes);
        pad_to_copy_alignment(&mut self.scratch);
        queue.write_buffer(&self.buffer, 0, &self.scratch);
    }
}

/// Pad with zeros up to the 4-byte buffer copy alignment.
pub(crate) fn pad_to_copy_alignment(bytes: &mut Vec<u8>) {
    let align = wgpu::COPY_BUFFER_ALIGNMENT as usize;
    let padded = bytes.len().div_ceil(align).max(1) * align;
    bytes.resize(padded, 0);
}

/// Pick the surface format for the blit.
///
/// The frame image already holds sRGB-encoded palette colors, so a non-sRGB
/// surface is preferred to avoid encoding them twice.
pub(crate) fn surface_format(formats: &[wgpu::TextureFormat]) -> Option<wgpu::TextureFormat> {
    formats
        .iter()
        .find(|format| !format.is_srgb())
        .or_else(|| formats.first())
        .copied()
}

/// Storage texture the compute pass renders scanlines into
pub(crate) struct FrameTarget {
    pub view: wgpu::TextureView,
    pub width: u32,
    pub height: u32,
}

impl FrameTarget {
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Frame Image"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            view,
            width,
            height,
        }
    }
}
