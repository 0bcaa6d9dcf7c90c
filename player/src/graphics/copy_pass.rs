//! Staging-to-destination copy application
//!
//! Buffer copies on the GPU need 4-byte aligned offsets and sizes. Aligned
//! mappings go through `copy_buffer_to_buffer`; the rest are applied by a
//! single-invocation compute pass that moves bytes in registration order,
//! recorded after the native copies.

use bytemuck::{Pod, Zeroable};

use ppu_replay_core::{CopyMapping, DestinationBuffer, MemoryUpdate};

use super::init::{DestinationBuffers, StagingBuffer};
use super::shader_source;

/// Initial copy list capacity, in regions
const INITIAL_CAPACITY: usize = 32;

/// One byte copy as seen by `copy_bytes.wgsl`
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct CopyRegion {
    pub src: u32,
    pub dst: u32,
    pub len: u32,
    pub destination: u32,
}

impl CopyRegion {
    fn new(destination: DestinationBuffer, mapping: &CopyMapping) -> Self {
        Self {
            src: mapping.src_offset as u32,
            dst: mapping.dst_offset as u32,
            len: mapping.size as u32,
            destination: destination.index() as u32,
        }
    }

    fn overlaps(&self, destination: DestinationBuffer, mapping: &CopyMapping) -> bool {
        let start = mapping.dst_offset;
        let end = start + mapping.size;
        self.destination == destination.index() as u32
            && u64::from(self.dst) < end
            && start < u64::from(self.dst) + u64::from(self.len)
    }
}

/// Header preceding the region array in the copy list buffer
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
struct CopyListHeader {
    count: u32,
}

/// Copies of one scanline entry, split by how they are applied
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CopyPlan {
    /// Native buffer copies, recorded first
    pub native: Vec<(DestinationBuffer, CopyMapping)>,
    /// Byte copies for the compute pass, recorded after the native ones
    pub bytes: Vec<CopyRegion>,
}

/// Split an entry into native and byte copies.
///
/// An aligned mapping that overlaps an earlier byte copy in the same
/// destination goes through the byte pass too, so later registrations still
/// win on overlap.
pub fn plan_copies(updates: &[MemoryUpdate]) -> CopyPlan {
    let mut plan = CopyPlan::default();
    for update in updates {
        for mapping in &update.regions {
            let shadowed = plan
                .bytes
                .iter()
                .any(|region| region.overlaps(update.destination, mapping));
            if mapping.is_word_aligned() && !shadowed {
                plan.native.push((update.destination, *mapping));
            } else {
                plan.bytes.push(CopyRegion::new(update.destination, mapping));
            }
        }
    }
    plan
}

/// Serialize a copy list: the count followed by the regions.
pub fn encode_copy_list(regions: &[CopyRegion]) -> Vec<u8> {
    let header = CopyListHeader {
        count: regions.len() as u32,
    };
    let mut bytes = Vec::with_capacity(size_of::<CopyListHeader>() + size_of_val(regions));
    bytes.extend_from_slice(bytemuck::bytes_of(&header));
    bytes.extend_from_slice(bytemuck::cast_slice(regions));
    bytes
}

fn copy_list_size(capacity: usize) -> u64 {
    (size_of::<CopyListHeader>() + capacity * size_of::<CopyRegion>()) as u64
}

/// Byte-copy compute pipeline and its growable copy list
pub(crate) struct CopyPass {
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
    copy_list: wgpu::Buffer,
    capacity: usize,
}

impl CopyPass {
    pub fn new(
        device: &wgpu::Device,
        staging: &StagingBuffer,
        destinations: &DestinationBuffers,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Copy Bytes Shader"),
            source: wgpu::ShaderSource::Wgsl(shader_source::COPY_BYTES.into()),
        });

        let storage = |binding: u32, read_only: bool| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Copy Bytes Bind Group Layout"),
            entries: &[
                // Staging
                storage(0, true),
                // PPU memory, OAM, control
                storage(1, false),
                storage(2, false),
                storage(3, false),
                // Copy list
                storage(4, true),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Copy Bytes Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Copy Bytes Pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });

        let copy_list = create_copy_list(device, INITIAL_CAPACITY);
        let bind_group =
            create_bind_group(device, &bind_group_layout, staging, destinations, &copy_list);

        Self {
            pipeline,
            bind_group_layout,
            bind_group,
            copy_list,
            capacity: INITIAL_CAPACITY,
        }
    }

    /// Record every copy of one scanline entry into `encoder`.
    pub fn encode(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        staging: &StagingBuffer,
        destinations: &DestinationBuffers,
        updates: &[MemoryUpdate],
    ) {
        let plan = plan_copies(updates);
        for (destination, mapping) in &plan.native {
            encoder.copy_buffer_to_buffer(
                staging.buffer(),
                mapping.src_offset,
                destinations.get(*destination),
                mapping.dst_offset,
                mapping.size,
            );
        }
        if plan.bytes.is_empty() {
            return;
        }

        self.ensure_capacity(device, staging, destinations, plan.bytes.len());
        queue.write_buffer(&self.copy_list, 0, &encode_copy_list(&plan.bytes));

        let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("Copy Bytes Pass"),
            timestamp_writes: None,
        });
        compute_pass.set_pipeline(&self.pipeline);
        compute_pass.set_bind_group(0, &self.bind_group, &[]);
        compute_pass.dispatch_workgroups(1, 1, 1);
    }

    fn ensure_capacity(
        &mut self,
        device: &wgpu::Device,
        staging: &StagingBuffer,
        destinations: &DestinationBuffers,
        required: usize,
    ) {
        if required <= self.capacity {
            return;
        }

        let mut capacity = self.capacity * 2;
        while capacity < required {
            capacity *= 2;
        }
        tracing::debug!("Growing copy list: {} -> {} regions", self.capacity, capacity);

        self.copy_list = create_copy_list(device, capacity);
        self.bind_group = create_bind_group(
            device,
            &self.bind_group_layout,
            staging,
            destinations,
            &self.copy_list,
        );
        self.capacity = capacity;
    }
}

fn create_copy_list(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Copy List"),
        size: copy_list_size(capacity),
        usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn create_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    staging: &StagingBuffer,
    destinations: &DestinationBuffers,
    copy_list: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Copy Bytes Bind Group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: staging.buffer().as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: destinations
                    .get(DestinationBuffer::PpuMemory)
                    .as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: destinations.get(DestinationBuffer::Oam).as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: destinations
                    .get(DestinationBuffer::Control)
                    .as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 4,
                resource: copy_list.as_entire_binding(),
            },
        ],
    })
}
