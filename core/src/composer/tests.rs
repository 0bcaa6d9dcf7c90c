//! Tests for the staging region composer

use super::*;
use crate::nes::{Control, Oam, PpuMemory};

fn control_mapping(src_offset: u64, value_size: u64) -> CopyMapping {
    CopyMapping {
        src_offset,
        dst_offset: Control::ROW_OFFSET,
        size: value_size,
    }
}

// ============================================================================
// Staging fields
// ============================================================================

#[test]
fn test_staging_fields_are_appended() {
    let mut composer = MemoryUpdateComposer::nes();

    let a = composer
        .add_staging_field(DestinationBuffer::PpuMemory, 0x100, 16, None)
        .unwrap();
    let b = composer
        .add_staging_field(DestinationBuffer::Oam, 0, 24, None)
        .unwrap();
    let c = composer
        .add_staging_field(DestinationBuffer::PpuMemory, 0x200, 4, None)
        .unwrap();

    assert_eq!(a.staging_offset(), 0);
    assert_eq!(b.staging_offset(), 16);
    assert_eq!(c.staging_offset(), 40);
    assert_eq!(composer.staging_len(), 44);

    // Mapping indices are per destination
    assert_eq!(a.mapping_index(), 0);
    assert_eq!(b.mapping_index(), 0);
    assert_eq!(c.mapping_index(), 1);

    assert_eq!(
        composer.mapping_for(c).unwrap(),
        CopyMapping {
            src_offset: 40,
            dst_offset: 0x200,
            size: 4
        }
    );
}

#[test]
fn test_initial_value_is_copied_into_staging() {
    let mut composer = MemoryUpdateComposer::nes();
    composer
        .add_staging_field(DestinationBuffer::Oam, 0, 4, Some(&[1, 2, 3, 4]))
        .unwrap();
    composer
        .add_staging_field(DestinationBuffer::Oam, 4, 2, None)
        .unwrap();

    let composed = composer.build();
    assert_eq!(composed.staging, vec![1, 2, 3, 4, 0, 0]);
}

#[test]
fn test_initial_value_size_mismatch() {
    let mut composer = MemoryUpdateComposer::nes();
    let err = composer
        .add_staging_field(DestinationBuffer::Oam, 0, 4, Some(&[1, 2]))
        .unwrap_err();
    assert_eq!(
        err,
        ComposeError::InitialValueSize {
            expected: 4,
            actual: 2
        }
    );
    assert_eq!(composer.staging_len(), 0);
}

#[test]
fn test_zero_sized_field_rejected() {
    let mut composer = MemoryUpdateComposer::nes();
    let err = composer
        .add_staging_field(DestinationBuffer::PpuMemory, 0, 0, None)
        .unwrap_err();
    assert!(matches!(err, ComposeError::ZeroSized { .. }));
}

#[test]
fn test_destination_bounds_checked() {
    let mut composer = MemoryUpdateComposer::nes();

    // Exactly at the end is fine
    composer
        .add_staging_field(DestinationBuffer::Oam, Oam::SIZE as u64 - 4, 4, None)
        .unwrap();

    let err = composer
        .add_staging_field(DestinationBuffer::Oam, Oam::SIZE as u64 - 3, 4, None)
        .unwrap_err();
    assert_eq!(
        err,
        ComposeError::DestinationOutOfBounds {
            destination: DestinationBuffer::Oam,
            offset: Oam::SIZE as u64 - 3,
            size: 4,
            capacity: Oam::SIZE as u64,
        }
    );

    let err = composer
        .add_staging_field(DestinationBuffer::PpuMemory, u64::MAX, 1, None)
        .unwrap_err();
    assert!(matches!(err, ComposeError::DestinationOutOfBounds { .. }));
}

#[test]
fn test_empty_composition_pads_staging() {
    let composed = MemoryUpdateComposer::nes().build();
    assert_eq!(composed.staging, vec![0]);
    assert!(composed.schedule.is_empty());
}

// ============================================================================
// Updates and the row offset field
// ============================================================================

#[test]
fn test_first_update_at_scanline_adds_row_offset() {
    let mut composer = MemoryUpdateComposer::nes();
    let palette = composer
        .add_staging_field(
            DestinationBuffer::PpuMemory,
            PpuMemory::background_palette_offset(3, 2),
            1,
            Some(&[0x17]),
        )
        .unwrap();

    composer.add_update(palette, 0).unwrap();
    assert_eq!(composer.updated_scanline_count(), 1);

    let composed = composer.build();
    // Palette byte, then the row offset byte
    assert_eq!(composed.staging, vec![0x17, 0]);

    let control = composed.schedule.for_buffer(DestinationBuffer::Control);
    assert_eq!(control.get(&0), Some(&vec![control_mapping(1, 1)]));

    let ppu = composed.schedule.for_buffer(DestinationBuffer::PpuMemory);
    assert_eq!(
        ppu.get(&0),
        Some(&vec![CopyMapping {
            src_offset: 0,
            dst_offset: 0x3000 + 14,
            size: 1
        }])
    );
}

#[test]
fn test_row_offset_added_once_per_scanline() {
    let mut composer = MemoryUpdateComposer::nes();
    let a = composer
        .add_staging_field(DestinationBuffer::PpuMemory, 0, 4, None)
        .unwrap();
    let b = composer
        .add_staging_field(DestinationBuffer::Oam, 0, 4, None)
        .unwrap();

    composer.add_update(a, 100).unwrap();
    composer.add_update(b, 100).unwrap();
    composer.add_update(b, 150).unwrap();

    assert_eq!(composer.updated_scanline_count(), 2);

    let composed = composer.build();
    let control = composed.schedule.for_buffer(DestinationBuffer::Control);
    assert_eq!(control.len(), 2);
    assert_eq!(control[&100].len(), 1);
    assert_eq!(control[&150].len(), 1);

    let row_100 = control[&100][0].src_offset as usize;
    let row_150 = control[&150][0].src_offset as usize;
    assert_eq!(composed.staging[row_100], 100);
    assert_eq!(composed.staging[row_150], 150);
}

#[test]
fn test_row_offset_precedes_control_updates() {
    let mut composer = MemoryUpdateComposer::nes();
    let nametable = composer
        .add_staging_field(
            DestinationBuffer::Control,
            Control::NAMETABLE_START,
            1,
            Some(&[2]),
        )
        .unwrap();

    composer.add_update(nametable, 192).unwrap();

    let composed = composer.build();
    let control = &composed.schedule.for_buffer(DestinationBuffer::Control)[&192];
    assert_eq!(control.len(), 2);
    assert_eq!(control[0].dst_offset, Control::ROW_OFFSET);
    assert_eq!(control[1].dst_offset, Control::NAMETABLE_START);
}

#[test]
fn test_duplicate_update_appends_mapping() {
    let mut composer = MemoryUpdateComposer::nes();
    let field = composer
        .add_staging_field(DestinationBuffer::Oam, 8, 4, None)
        .unwrap();

    composer.add_update(field, 10).unwrap();
    composer.add_update(field, 10).unwrap();

    let oam = composer.schedule().for_buffer(DestinationBuffer::Oam);
    assert_eq!(oam[&10].len(), 2);
    assert_eq!(oam[&10][0], oam[&10][1]);
}

#[test]
fn test_unknown_handle_rejected() {
    let mut other = MemoryUpdateComposer::nes();
    other
        .add_staging_field(DestinationBuffer::Oam, 0, 4, None)
        .unwrap();
    let foreign = other
        .add_staging_field(DestinationBuffer::Oam, 4, 4, None)
        .unwrap();

    let mut composer = MemoryUpdateComposer::nes();
    let err = composer.add_update(foreign, 0).unwrap_err();
    assert_eq!(err, ComposeError::UnknownHandle(foreign));
    assert_eq!(composer.updated_scanline_count(), 0);
}

#[test]
fn test_scanline_too_large_for_row_offset() {
    let mut composer = MemoryUpdateComposer::nes();
    let field = composer
        .add_staging_field(DestinationBuffer::Oam, 0, 4, None)
        .unwrap();
    let err = composer.add_update(field, 256).unwrap_err();
    assert_eq!(err, ComposeError::RowOffsetOverflow(256));
}

// ============================================================================
// Row offset anchoring
// ============================================================================

#[test]
fn test_anchor_adds_scanline_zero() {
    let mut composer = MemoryUpdateComposer::nes();
    let field = composer
        .add_staging_field(DestinationBuffer::Oam, 0, 4, None)
        .unwrap();
    composer.add_update(field, 120).unwrap();

    assert!(composer.anchor_row_offset().unwrap());
    // Second call is a no-op
    assert!(!composer.anchor_row_offset().unwrap());

    let composed = composer.build();
    let control = composed.schedule.for_buffer(DestinationBuffer::Control);
    let anchor = control[&0][0];
    assert_eq!(anchor.dst_offset, Control::ROW_OFFSET);
    assert_eq!(composed.staging[anchor.src_offset as usize], 0);
    assert!(composed.schedule.for_buffer(DestinationBuffer::Oam).get(&0).is_none());
}

#[test]
fn test_anchor_skipped_without_updates_or_with_scanline_zero() {
    let mut empty = MemoryUpdateComposer::nes();
    assert!(!empty.anchor_row_offset().unwrap());
    assert!(empty.schedule().is_empty());

    let mut composer = MemoryUpdateComposer::nes();
    let field = composer
        .add_staging_field(DestinationBuffer::Oam, 0, 4, None)
        .unwrap();
    composer.add_update(field, 0).unwrap();
    let before = composer.staging_len();
    assert!(!composer.anchor_row_offset().unwrap());
    assert_eq!(composer.staging_len(), before);
}

// ============================================================================
// Schedule
// ============================================================================

#[test]
fn test_merged_schedule_orders_destinations() {
    let mut composer = MemoryUpdateComposer::nes();
    let oam = composer
        .add_staging_field(DestinationBuffer::Oam, 0, 24, None)
        .unwrap();
    let palette = composer
        .add_staging_field(DestinationBuffer::PpuMemory, 0x3000, 4, None)
        .unwrap();

    composer.add_update(oam, 0).unwrap();
    composer.add_update(palette, 0).unwrap();
    composer.add_update(palette, 64).unwrap();

    let merged = composer.build().schedule.merged();
    assert_eq!(merged.keys().copied().collect::<Vec<_>>(), vec![0, 64]);

    let destinations: Vec<_> = merged[&0].iter().map(|u| u.destination).collect();
    assert_eq!(
        destinations,
        vec![
            DestinationBuffer::PpuMemory,
            DestinationBuffer::Oam,
            DestinationBuffer::Control
        ]
    );
}

#[test]
fn test_mapping_count() {
    let mut composer = MemoryUpdateComposer::nes();
    let field = composer
        .add_staging_field(DestinationBuffer::Oam, 0, 4, None)
        .unwrap();
    composer.add_update(field, 0).unwrap();
    composer.add_update(field, 1).unwrap();

    // Two field copies plus two row offset writes
    assert_eq!(composer.schedule().mapping_count(), 4);
}

#[test]
fn test_word_alignment() {
    let aligned = CopyMapping {
        src_offset: 8,
        dst_offset: 0x3000,
        size: 16,
    };
    assert!(aligned.is_word_aligned());
    assert!(!control_mapping(1, 1).is_word_aligned());
}
