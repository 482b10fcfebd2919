//! # Glyph Atlas — Shelf-packed, Growable Glyph Texture
//!
//! Glyphs are rasterized on demand and packed left to right into rows
//! ("shelves"). A row is as tall as the tallest glyph placed in it.
//!
//! ```text
//!  (0,0) ┌──────────────────────────────────┐
//!        │ ┌─┐ ┌──┐ ┌─┐ ┌───┐               │  ← row 0, height = tallest
//!        │ │A│ │W │ │i│ │ M │  next_x ──►   │
//!        │ └─┘ │  │ └─┘ └───┘               │
//!        │     └──┘                         │
//!        │ ┌─┐ ┌─┐                          │  ← row 1 starts below row 0
//!        │ │g│ │y│                          │
//!        │ └─┘ └─┘                          │
//!        │                                  │
//!        └──────────────────────────────────┘ (size, size)
//! ```
//!
//! When a glyph does not fit, the atlas doubles in both dimensions and every
//! glyph baked so far is rasterized again, in bake order, into the fresh
//! texture. Old pixels are never copied. Each growth bumps [`GlyphAtlas::version`],
//! which is how text meshes learn that their UVs went stale.
//!
//! UVs follow the bottom-up convention used by all meshes: `v = 0` is the
//! bottom row of the texture.

use std::collections::HashMap;
use std::fmt;

use crate::math::{IVec2, UVec2, Vec2};
use crate::render::texture::TextureData;

/// Largest edge the atlas may grow to.
pub const MAX_ATLAS_SIZE: u32 = 8192;

/// Bitmap and metrics for one rasterized glyph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterizedGlyph {
    pub width: u32,
    pub height: u32,
    /// Single-channel coverage, row-major, top row first.
    pub bitmap: Vec<u8>,
    /// Offset from the pen position: x to the left edge, y up to the top edge.
    pub bearing: IVec2,
    /// Horizontal advance in 26.6 fixed point.
    pub advance: i32,
}

/// Source of glyph bitmaps. Returns `None` when the font has no glyph for
/// `ch`.
pub trait GlyphRasterizer {
    fn rasterize(&mut self, ch: char, pixel_size: u32) -> Option<RasterizedGlyph>;
}

/// A glyph baked into the atlas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Glyph {
    pub size: UVec2,
    pub bearing: IVec2,
    /// 26.6 fixed point.
    pub advance: i32,
    /// UV of the glyph's top-left corner.
    pub uv_top_left: Vec2,
    /// UV of the glyph's bottom-right corner.
    pub uv_bottom_right: Vec2,
}

impl Glyph {
    pub fn is_empty(&self) -> bool {
        self.size.x == 0 || self.size.y == 0
    }

    /// Advance in whole pixels.
    pub fn advance_px(&self) -> i32 {
        self.advance >> 6
    }
}

pub struct GlyphAtlas {
    rasterizer: Box<dyn GlyphRasterizer>,
    pixel_size: u32,
    padding: u32,
    size: u32,
    pixels: Vec<u8>,
    glyphs: HashMap<char, Glyph>,
    bake_order: Vec<char>,
    next_x: u32,
    next_y: u32,
    row_height: u32,
    version: u64,
    revision: u64,
}

impl GlyphAtlas {
    pub fn new(
        rasterizer: Box<dyn GlyphRasterizer>,
        pixel_size: u32,
        initial_size: u32,
        padding: u32,
    ) -> Self {
        let size = initial_size.clamp(1, MAX_ATLAS_SIZE);
        Self {
            rasterizer,
            pixel_size,
            padding,
            size,
            pixels: vec![0; (size * size) as usize],
            glyphs: HashMap::new(),
            bake_order: Vec::new(),
            next_x: padding,
            next_y: padding,
            row_height: 0,
            version: 0,
            revision: 0,
        }
    }

    pub fn pixel_size(&self) -> u32 {
        self.pixel_size
    }

    /// Edge length in pixels. The atlas is always square.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Incremented every time the atlas grows.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Incremented every time pixels change, growth included.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn glyph(&self, ch: char) -> Option<&Glyph> {
        self.glyphs.get(&ch)
    }

    pub fn baked_count(&self) -> usize {
        self.glyphs.len()
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn texture_data(&self) -> TextureData {
        TextureData::r8(self.size, self.size, self.pixels.clone())
    }

    /// Make sure `ch` is in the atlas. Returns `false` only when the
    /// rasterizer has no glyph for it or the atlas is at its size limit.
    pub fn bake(&mut self, ch: char) -> bool {
        if self.glyphs.contains_key(&ch) {
            return true;
        }
        let Some(raster) = self.rasterizer.rasterize(ch, self.pixel_size) else {
            return false;
        };

        let glyph = if raster.width == 0 || raster.height == 0 {
            self.empty_glyph(&raster)
        } else {
            let origin = loop {
                if let Some(origin) = self.place(raster.width, raster.height) {
                    break origin;
                }
                if !self.expand() {
                    log::error!(
                        "Glyph atlas is full at {0}x{0}; cannot bake '{ch}'",
                        self.size
                    );
                    return false;
                }
            };
            self.blit(&raster, origin)
        };

        self.glyphs.insert(ch, glyph);
        self.bake_order.push(ch);
        true
    }

    // ── Packing ─────────────────────────────────────────────────────────

    /// Reserve a `width`×`height` slot at the shelf cursor.
    fn place(&mut self, width: u32, height: u32) -> Option<UVec2> {
        let pad = self.padding;
        if self.next_x + width + pad > self.size {
            self.next_x = pad;
            self.next_y += self.row_height + pad;
            self.row_height = 0;
        }
        if self.next_x + width + pad > self.size || self.next_y + height + pad > self.size {
            return None;
        }
        let origin = UVec2::new(self.next_x, self.next_y);
        self.next_x += width + pad;
        self.row_height = self.row_height.max(height);
        Some(origin)
    }

    fn blit(&mut self, raster: &RasterizedGlyph, origin: UVec2) -> Glyph {
        let stride = self.size as usize;
        let width = raster.width as usize;
        for (row, src) in raster.bitmap.chunks_exact(width).enumerate() {
            let start = (origin.y as usize + row) * stride + origin.x as usize;
            self.pixels[start..start + width].copy_from_slice(src);
        }
        self.revision += 1;

        let size = self.size as f32;
        Glyph {
            size: UVec2::new(raster.width, raster.height),
            bearing: raster.bearing,
            advance: raster.advance,
            uv_top_left: Vec2::new(origin.x as f32 / size, 1.0 - origin.y as f32 / size),
            uv_bottom_right: Vec2::new(
                (origin.x + raster.width) as f32 / size,
                1.0 - (origin.y + raster.height) as f32 / size,
            ),
        }
    }

    fn empty_glyph(&self, raster: &RasterizedGlyph) -> Glyph {
        Glyph {
            size: UVec2::ZERO,
            bearing: raster.bearing,
            advance: raster.advance,
            uv_top_left: Vec2::ZERO,
            uv_bottom_right: Vec2::ZERO,
        }
    }

    /// Double the atlas and re-bake everything already in it. Keeps doubling
    /// until every existing glyph fits again.
    fn expand(&mut self) -> bool {
        loop {
            if self.size >= MAX_ATLAS_SIZE {
                return false;
            }
            self.size = (self.size * 2).min(MAX_ATLAS_SIZE);
            self.version += 1;
            log::debug!(
                "Glyph atlas grew to {0}x{0} (version {1})",
                self.size,
                self.version
            );
            if self.rebake() {
                return true;
            }
        }
    }

    fn rebake(&mut self) -> bool {
        self.pixels = vec![0; (self.size * self.size) as usize];
        self.next_x = self.padding;
        self.next_y = self.padding;
        self.row_height = 0;
        self.revision += 1;

        let order = std::mem::take(&mut self.bake_order);
        let mut fits = true;
        for &ch in &order {
            let Some(raster) = self.rasterizer.rasterize(ch, self.pixel_size) else {
                continue;
            };
            if raster.width == 0 || raster.height == 0 {
                continue;
            }
            match self.place(raster.width, raster.height) {
                Some(origin) => {
                    let glyph = self.blit(&raster, origin);
                    self.glyphs.insert(ch, glyph);
                }
                None => {
                    fits = false;
                    break;
                }
            }
        }
        self.bake_order = order;
        fits
    }
}

impl fmt::Debug for GlyphAtlas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlyphAtlas")
            .field("pixel_size", &self.pixel_size)
            .field("size", &self.size)
            .field("glyphs", &self.glyphs.len())
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Every printable char is a solid `side`×`side` square; space is empty.
    pub(crate) struct BoxRasterizer {
        pub side: u32,
    }

    impl GlyphRasterizer for BoxRasterizer {
        fn rasterize(&mut self, ch: char, _pixel_size: u32) -> Option<RasterizedGlyph> {
            match ch {
                ' ' => Some(RasterizedGlyph {
                    width: 0,
                    height: 0,
                    bitmap: Vec::new(),
                    bearing: IVec2::ZERO,
                    advance: (self.side as i32 / 2) << 6,
                }),
                '\u{1}'..='\u{1f}' => None,
                _ => Some(RasterizedGlyph {
                    width: self.side,
                    height: self.side,
                    bitmap: vec![255; (self.side * self.side) as usize],
                    bearing: IVec2::new(0, self.side as i32),
                    advance: (self.side as i32) << 6,
                }),
            }
        }
    }

    pub(crate) fn box_atlas(side: u32) -> GlyphAtlas {
        GlyphAtlas::new(Box::new(BoxRasterizer { side }), side, 128, 1)
    }

    fn distinct_chars(n: usize) -> impl Iterator<Item = char> {
        (0..n as u32).filter_map(|i| char::from_u32(0x4e00 + i))
    }

    #[test]
    fn baking_is_idempotent() {
        let mut atlas = box_atlas(20);
        assert!(atlas.bake('A'));
        let revision = atlas.revision();
        assert!(atlas.bake('A'));
        assert_eq!(atlas.baked_count(), 1);
        assert_eq!(atlas.revision(), revision);
    }

    #[test]
    fn space_is_recorded_without_pixels() {
        let mut atlas = box_atlas(20);
        assert!(atlas.bake(' '));
        let glyph = atlas.glyph(' ').unwrap();
        assert!(glyph.is_empty());
        assert_eq!(glyph.advance_px(), 10);
        assert_eq!(atlas.revision(), 0);
    }

    #[test]
    fn unknown_glyph_fails() {
        let mut atlas = box_atlas(20);
        assert!(!atlas.bake('\u{2}'));
        assert!(atlas.glyph('\u{2}').is_none());
    }

    #[test]
    fn glyphs_pack_into_shelves_with_padding() {
        let mut atlas = box_atlas(20);
        for ch in distinct_chars(7) {
            atlas.bake(ch);
        }
        let first = atlas.glyph('\u{4e00}').unwrap();
        let seventh = atlas.glyph('\u{4e06}').unwrap();
        // 6 glyphs of 20px + 1px padding fit in a 128px row
        assert_eq!(first.uv_top_left, Vec2::new(1.0 / 128.0, 1.0 - 1.0 / 128.0));
        assert_eq!(seventh.uv_top_left, Vec2::new(1.0 / 128.0, 1.0 - 22.0 / 128.0));
        assert_eq!(atlas.pixels()[128 + 1], 255);
        assert_eq!(atlas.pixels()[0], 0);
    }

    #[test]
    fn full_atlas_doubles_and_bumps_version() {
        let mut atlas = box_atlas(20);
        for ch in distinct_chars(36) {
            assert!(atlas.bake(ch));
        }
        assert_eq!((atlas.size(), atlas.version()), (128, 0));

        assert!(atlas.bake('\u{4e00}'));
        assert_eq!(atlas.version(), 0);

        assert!(atlas.bake('Z'));
        assert_eq!(atlas.size(), 256);
        assert_eq!(atlas.version(), 1);
        assert_eq!(atlas.baked_count(), 37);
        assert_eq!(atlas.pixels().len(), 256 * 256);
    }

    #[test]
    fn version_never_decreases_and_moves_only_on_growth() {
        let mut atlas = box_atlas(20);
        let mut last = atlas.version();
        let mut size = atlas.size();
        for ch in distinct_chars(200) {
            atlas.bake(ch);
            assert!(atlas.version() >= last);
            assert_eq!(atlas.version() != last, atlas.size() != size);
            last = atlas.version();
            size = atlas.size();
        }
        assert!(atlas.version() >= 2);
    }

    #[test]
    fn rebake_keeps_glyphs_readable() {
        let mut atlas = box_atlas(20);
        for ch in distinct_chars(40) {
            atlas.bake(ch);
        }
        let glyph = *atlas.glyph('\u{4e00}').unwrap();
        let size = atlas.size() as f32;
        let x = (glyph.uv_top_left.x * size).round() as usize;
        let y = ((1.0 - glyph.uv_top_left.y) * size).round() as usize;
        assert_eq!(atlas.pixels()[y * atlas.size() as usize + x], 255);
    }
}
