//! [fontdue](https://docs.rs/fontdue) glyph source for the atlas.

use std::path::Path;

use crate::error::EngineError;
use crate::math::IVec2;

use super::atlas::{GlyphRasterizer, RasterizedGlyph};

pub struct FontdueRasterizer {
    font: fontdue::Font,
}

impl FontdueRasterizer {
    pub fn from_bytes(bytes: &[u8], pixel_size: u32) -> Result<Self, String> {
        let font = fontdue::Font::from_bytes(
            bytes,
            fontdue::FontSettings {
                scale: pixel_size as f32,
                ..Default::default()
            },
        )?;
        Ok(Self { font })
    }

    pub fn from_file(path: impl AsRef<Path>, pixel_size: u32) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let load_error = |reason: String| EngineError::AssetLoad {
            path: path.display().to_string(),
            reason,
        };
        let bytes = std::fs::read(path).map_err(|e| load_error(e.to_string()))?;
        Self::from_bytes(&bytes, pixel_size).map_err(load_error)
    }
}

impl GlyphRasterizer for FontdueRasterizer {
    fn rasterize(&mut self, ch: char, pixel_size: u32) -> Option<RasterizedGlyph> {
        if self.font.lookup_glyph_index(ch) == 0 {
            return None;
        }
        let (metrics, bitmap) = self.font.rasterize(ch, pixel_size as f32);
        // fontdue's ymin is the offset from the baseline to the glyph bottom
        Some(RasterizedGlyph {
            width: metrics.width as u32,
            height: metrics.height as u32,
            bitmap,
            bearing: IVec2::new(metrics.xmin, metrics.ymin + metrics.height as i32),
            advance: (metrics.advance_width * 64.0).round() as i32,
        })
    }
}
