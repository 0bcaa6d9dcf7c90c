//! Scanline compute pass

use ppu_replay_core::{DestinationBuffer, ScanlineBatch};

use super::init::{DestinationBuffers, FrameTarget};
use super::shader_source;

/// Invocations per workgroup along a scanline
pub const WORKGROUP_WIDTH: u32 = 64;

/// Workgroup counts for one batch: one row of workgroups per scanline.
pub fn workgroups(batch: &ScanlineBatch, screen_width: u32) -> (u32, u32, u32) {
    (
        screen_width.div_ceil(WORKGROUP_WIDTH),
        batch.scanline_count,
        1,
    )
}

pub(crate) struct PpuPass {
    pipeline: wgpu::ComputePipeline,
    bind_group: wgpu::BindGroup,
}

impl PpuPass {
    pub fn new(
        device: &wgpu::Device,
        destinations: &DestinationBuffers,
        frame: &FrameTarget,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("PPU Shader"),
            source: wgpu::ShaderSource::Wgsl(shader_source::PPU.into()),
        });

        let read_only_storage = |binding: u32| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only: true },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("PPU Bind Group Layout"),
            entries: &[
                read_only_storage(0),
                read_only_storage(1),
                read_only_storage(2),
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::StorageTexture {
                        access: wgpu::StorageTextureAccess::WriteOnly,
                        format: FrameTarget::FORMAT,
                        view_dimension: wgpu::TextureViewDimension::D2,
                    },
                    count: None,
                },
            ],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("PPU Bind Group"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: destinations
                        .get(DestinationBuffer::PpuMemory)
                        .as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: destinations.get(DestinationBuffer::Oam).as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: destinations
                        .get(DestinationBuffer::Control)
                        .as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(&frame.view),
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("PPU Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("PPU Pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });

        Self {
            pipeline,
            bind_group,
        }
    }

    /// Record one batch dispatch into `encoder`.
    pub fn encode(&self, encoder: &mut wgpu::CommandEncoder, batch: &ScanlineBatch, width: u32) {
        let (x, y, z) = workgroups(batch, width);
        let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("PPU Scanline Pass"),
            timestamp_writes: None,
        });
        compute_pass.set_pipeline(&self.pipeline);
        compute_pass.set_bind_group(0, &self.bind_group, &[]);
        compute_pass.dispatch_workgroups(x, y, z);
    }
}
