//! NES picture-processing-unit memory layout
//!
//! These structs are the binary contract shared by the memory dumps, the
//! destination buffers on the GPU and the compute shader. Struct offsets are
//! destination addresses: changing a field order invalidates every dump.
//!
//! Reference: <https://www.nesdev.org/>
//!
//! - A tile value at a pixel indexes into a palette
//! - The attribute table picks which palette a 16x16 pixel area uses

use std::mem::{offset_of, size_of};

use bytemuck::{Pod, Zeroable};

/// Visible scanlines per frame
pub const SCANLINES: u32 = 240;

/// Visible pixels per scanline
pub const SCREEN_WIDTH: u32 = 256;

/// A tile is an 8x8 grid of 2-bit pixels stored as two bit planes
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct Tile {
    pub data: [u8; 16],
}

/// Each tileset (pattern table) holds 256 tiles
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct TileSet {
    pub tiles: [Tile; 256],
}

/// 32 * 30 tile indices followed by the 64-byte attribute table
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct NameTable {
    pub tile_indices: [u8; 960],
    pub attribute_table: [u8; 64],
}

/// Three colors plus the shared background color
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct Palette {
    pub data: [u8; 4],
}

/// Full PPU address space as seen by the renderer
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct PpuMemory {
    pub tile_sets: [TileSet; 2],
    pub name_tables: [NameTable; 4],
    pub background_palettes: [Palette; 4],
    pub sprite_palettes: [Palette; 4],
}

impl PpuMemory {
    pub const SIZE: usize = size_of::<Self>();

    /// Destination offset of `tile` inside tileset `tile_set`.
    pub const fn tile_offset(tile_set: usize, tile: usize) -> u64 {
        (offset_of!(PpuMemory, tile_sets)
            + tile_set * size_of::<TileSet>()
            + tile * size_of::<Tile>()) as u64
    }

    pub const fn name_table_offset(name_table: usize) -> u64 {
        (offset_of!(PpuMemory, name_tables) + name_table * size_of::<NameTable>()) as u64
    }

    /// Destination offset of color `entry` of background palette `palette`.
    pub const fn background_palette_offset(palette: usize, entry: usize) -> u64 {
        (offset_of!(PpuMemory, background_palettes) + palette * size_of::<Palette>() + entry)
            as u64
    }

    /// Destination offset of color `entry` of sprite palette `palette`.
    pub const fn sprite_palette_offset(palette: usize, entry: usize) -> u64 {
        (offset_of!(PpuMemory, sprite_palettes) + palette * size_of::<Palette>() + entry) as u64
    }
}

/// One object attribute memory entry
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct Sprite {
    pub y: u8,
    pub tile_index: u8,
    pub attr: u8,
    pub x: u8,
}

impl Sprite {
    pub const SIZE: usize = size_of::<Self>();
    pub const Y: usize = offset_of!(Sprite, y);
    pub const TILE_INDEX: usize = offset_of!(Sprite, tile_index);
    pub const ATTR: usize = offset_of!(Sprite, attr);
    pub const X: usize = offset_of!(Sprite, x);

    pub const fn new(y: u8, tile_index: u8, attr: u8, x: u8) -> Self {
        Self {
            y,
            tile_index,
            attr,
            x,
        }
    }
}

/// Sprite attribute bits
pub mod sprite_attr {
    pub const VERTICAL_FLIP: u8 = 0x80;
    pub const HORIZONTAL_FLIP: u8 = 0x40;
    pub const PRIORITY: u8 = 0x20;
    pub const PALETTE_MASK: u8 = 0x03;
}

/// Object attribute memory: 64 sprites
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct Oam {
    pub sprites: [Sprite; 64],
}

impl Oam {
    pub const SIZE: usize = size_of::<Self>();

    pub const fn sprite_offset(sprite: usize) -> u64 {
        (offset_of!(Oam, sprites) + sprite * Sprite::SIZE) as u64
    }
}

/// Renderer control block
///
/// Not part of the hardware address space: this is the small register file
/// the compute shader reads for per-batch state. `row_offset` is the output
/// row the next dispatched batch starts at.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct Control {
    pub row_offset: u8,
    pub nametable_start: u8,
    pub background_enable: u8,
    pub background_table: u8,
    pub sprite_enable: u8,
    pub sprite_table: u8,
    /// 0 = 8x8 sprites, 1 = 8x16 sprites
    pub sprite_size: u8,
    pub _reserved: [u8; 9],
}

impl Control {
    pub const SIZE: usize = size_of::<Self>();
    pub const ROW_OFFSET: u64 = offset_of!(Control, row_offset) as u64;
    pub const NAMETABLE_START: u64 = offset_of!(Control, nametable_start) as u64;
    pub const BACKGROUND_TABLE: u64 = offset_of!(Control, background_table) as u64;
    pub const SPRITE_TABLE: u64 = offset_of!(Control, sprite_table) as u64;
}

impl Default for Control {
    /// Background and sprites enabled, both reading tileset 0, nametable 0.
    fn default() -> Self {
        Self {
            row_offset: 0,
            nametable_start: 0,
            background_enable: 1,
            background_table: 0,
            sprite_enable: 1,
            sprite_table: 0,
            sprite_size: 0,
            _reserved: [0; 9],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_sizes() {
        assert_eq!(size_of::<Tile>(), 16);
        assert_eq!(size_of::<TileSet>(), 4096);
        assert_eq!(size_of::<NameTable>(), 1024);
        assert_eq!(PpuMemory::SIZE, 12320);
        assert_eq!(Oam::SIZE, 256);
        assert_eq!(Control::SIZE, 16);
    }

    #[test]
    fn test_gpu_buffers_are_word_sized() {
        // Destination buffers are bound as array<u32>
        assert_eq!(PpuMemory::SIZE % 4, 0);
        assert_eq!(Oam::SIZE % 4, 0);
        assert_eq!(Control::SIZE % 4, 0);
    }

    #[test]
    fn test_ppu_offsets() {
        assert_eq!(PpuMemory::tile_offset(0, 0), 0);
        assert_eq!(PpuMemory::tile_offset(0, 0xC0), 0xC00);
        assert_eq!(PpuMemory::tile_offset(1, 0), 0x1000);
        assert_eq!(PpuMemory::name_table_offset(2), 0x2000 + 2 * 1024);
        assert_eq!(PpuMemory::background_palette_offset(0, 0), 0x3000);
        assert_eq!(PpuMemory::background_palette_offset(3, 2), 0x3000 + 14);
        assert_eq!(PpuMemory::sprite_palette_offset(1, 1), 0x3010 + 5);
    }

    #[test]
    fn test_sprite_field_offsets() {
        assert_eq!(Sprite::Y, 0);
        assert_eq!(Sprite::TILE_INDEX, 1);
        assert_eq!(Sprite::ATTR, 2);
        assert_eq!(Sprite::X, 3);
        assert_eq!(Oam::sprite_offset(6), 24);
    }

    #[test]
    fn test_control_default_enables_layers() {
        let control = Control::default();
        assert_eq!(control.background_enable, 1);
        assert_eq!(control.sprite_enable, 1);
        assert_eq!(Control::ROW_OFFSET, 0);
        assert_eq!(Control::NAMETABLE_START, 1);
    }
}
