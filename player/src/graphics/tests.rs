//! Tests for shaders and the pure parts of the backend

use ppu_replay_core::{CopyMapping, DestinationBuffer, MemoryUpdate, ScanlineBatch, SubmitSync};

use super::*;

fn validate(name: &str, source: &str) {
    let module = naga::front::wgsl::parse_str(source)
        .unwrap_or_else(|e| panic!("{name} failed to parse: {}", e.emit_to_string(source)));
    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    );
    if let Err(e) = validator.validate(&module) {
        panic!("{name} failed validation: {e:?}");
    }
}

fn update(destination: DestinationBuffer, regions: &[(u64, u64, u64)]) -> MemoryUpdate {
    MemoryUpdate {
        destination,
        regions: regions
            .iter()
            .map(|&(src_offset, dst_offset, size)| CopyMapping {
                src_offset,
                dst_offset,
                size,
            })
            .collect(),
    }
}

// ============================================================================
// Shader validation
// ============================================================================

#[test]
fn test_ppu_shader_validates() {
    validate("ppu.wgsl", shader_source::PPU);
}

#[test]
fn test_copy_bytes_shader_validates() {
    validate("copy_bytes.wgsl", shader_source::COPY_BYTES);
}

#[test]
fn test_blit_shader_validates() {
    validate("blit.wgsl", shader_source::BLIT);
}

#[test]
fn test_copy_region_matches_shader_layout() {
    // CopyList is a u32 count followed by 16-byte regions
    assert_eq!(size_of::<CopyRegion>(), 16);
    let bytes = encode_copy_list(&[CopyRegion::default(); 2]);
    assert_eq!(bytes.len(), 4 + 2 * 16);
    assert_eq!(&bytes[..4], &2u32.to_le_bytes());
}

// ============================================================================
// Copy application
// ============================================================================

fn mapping(src_offset: u64, dst_offset: u64, size: u64) -> CopyMapping {
    CopyMapping {
        src_offset,
        dst_offset,
        size,
    }
}

fn region(src: u32, dst: u32, len: u32, destination: DestinationBuffer) -> CopyRegion {
    CopyRegion {
        src,
        dst,
        len,
        destination: destination.index() as u32,
    }
}

#[test]
fn test_aligned_entry_uses_buffer_copies() {
    let updates = [
        update(DestinationBuffer::PpuMemory, &[(0, 0x3000, 4)]),
        update(DestinationBuffer::Oam, &[(4, 0, 24)]),
    ];
    let plan = plan_copies(&updates);
    assert_eq!(
        plan.native,
        vec![
            (DestinationBuffer::PpuMemory, mapping(0, 0x3000, 4)),
            (DestinationBuffer::Oam, mapping(4, 0, 24)),
        ]
    );
    assert!(plan.bytes.is_empty());
}

#[test]
fn test_row_offset_write_keeps_aligned_copies_native() {
    // Every scheduled scanline carries a one-byte row offset write
    let updates = [
        update(DestinationBuffer::PpuMemory, &[(0, 0x3000, 4)]),
        update(DestinationBuffer::Control, &[(4, 0, 1)]),
    ];
    let plan = plan_copies(&updates);
    assert_eq!(
        plan.native,
        vec![(DestinationBuffer::PpuMemory, mapping(0, 0x3000, 4))]
    );
    assert_eq!(plan.bytes, vec![region(4, 0, 1, DestinationBuffer::Control)]);
}

#[test]
fn test_byte_copies_keep_order_and_destination() {
    let updates = [
        update(DestinationBuffer::PpuMemory, &[(0, 0x300E, 1), (1, 0x2001, 2)]),
        update(DestinationBuffer::Oam, &[(4, 8, 4)]),
        update(DestinationBuffer::Control, &[(8, 1, 1)]),
    ];
    let plan = plan_copies(&updates);
    assert_eq!(plan.native, vec![(DestinationBuffer::Oam, mapping(4, 8, 4))]);
    assert_eq!(
        plan.bytes,
        vec![
            region(0, 0x300E, 1, DestinationBuffer::PpuMemory),
            region(1, 0x2001, 2, DestinationBuffer::PpuMemory),
            region(8, 1, 1, DestinationBuffer::Control),
        ]
    );
}

#[test]
fn test_aligned_copy_over_earlier_byte_copy_stays_ordered() {
    // The aligned copy must land after the byte copy it overwrites
    let updates = [
        update(DestinationBuffer::PpuMemory, &[(0, 0x3001, 1)]),
        update(DestinationBuffer::PpuMemory, &[(4, 0x3000, 4)]),
        update(DestinationBuffer::Oam, &[(8, 0x3000, 4)]),
    ];
    let plan = plan_copies(&updates);
    assert_eq!(plan.native, vec![(DestinationBuffer::Oam, mapping(8, 0x3000, 4))]);
    assert_eq!(
        plan.bytes,
        vec![
            region(0, 0x3001, 1, DestinationBuffer::PpuMemory),
            region(4, 0x3000, 4, DestinationBuffer::PpuMemory),
        ]
    );
}

#[test]
fn test_surface_format_avoids_srgb() {
    use wgpu::TextureFormat;

    let formats = [TextureFormat::Bgra8UnormSrgb, TextureFormat::Bgra8Unorm];
    assert_eq!(init::surface_format(&formats), Some(TextureFormat::Bgra8Unorm));

    // Only sRGB on offer
    let formats = [TextureFormat::Rgba8UnormSrgb];
    assert_eq!(init::surface_format(&formats), Some(TextureFormat::Rgba8UnormSrgb));
    assert_eq!(init::surface_format(&[]), None);
}

#[test]
fn test_pad_to_copy_alignment() {
    let mut bytes = vec![1, 2, 3, 4, 5];
    init::pad_to_copy_alignment(&mut bytes);
    assert_eq!(bytes, vec![1, 2, 3, 4, 5, 0, 0, 0]);

    let mut empty = Vec::new();
    init::pad_to_copy_alignment(&mut empty);
    assert_eq!(empty.len(), 4);
}

// ============================================================================
// Dispatch sizing
// ============================================================================

#[test]
fn test_workgroups_cover_scanline_width() {
    let batch = ScanlineBatch {
        first_scanline: 192,
        scanline_count: 48,
        sync: SubmitSync::default(),
    };
    assert_eq!(workgroups(&batch, 256), (4, 48, 1));
    assert_eq!(workgroups(&batch, 320), (5, 48, 1));
}

// ============================================================================
// Viewport
// ============================================================================

#[test]
fn test_viewport_stretch_fills_window() {
    let v = viewport(ScaleMode::Stretch, (256, 240), (1000, 500));
    assert_eq!(
        v,
        Viewport {
            x: 0.0,
            y: 0.0,
            width: 1000.0,
            height: 500.0
        }
    );
}

#[test]
fn test_viewport_fit_letterboxes() {
    let v = viewport(ScaleMode::Fit, (256, 240), (1024, 480));
    assert_eq!(v.width, 512.0);
    assert_eq!(v.height, 480.0);
    assert_eq!(v.x, 256.0);
    assert_eq!(v.y, 0.0);
}

#[test]
fn test_viewport_pixel_perfect_uses_integer_scale() {
    let v = viewport(ScaleMode::PixelPerfect, (256, 240), (800, 800));
    assert_eq!(v.width, 768.0);
    assert_eq!(v.height, 720.0);
    assert_eq!(v.x, 16.0);
    assert_eq!(v.y, 40.0);
}

#[test]
fn test_viewport_pixel_perfect_shrinks_in_small_window() {
    let v = viewport(ScaleMode::PixelPerfect, (256, 240), (128, 240));
    assert_eq!(v.width, 128.0);
    assert_eq!(v.height, 120.0);
    assert!(v.x >= 0.0 && v.y >= 0.0);
}
