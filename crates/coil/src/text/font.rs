use crate::error::EngineError;
use crate::math::Vec2;
use crate::render::assets::{MaterialHandle, TextureHandle};

use super::atlas::GlyphAtlas;
use super::layout::{self, HorizontalAlign, TextMesh, VerticalAlign};

/// Pixel sizes a font may be rasterized at.
pub const FONT_SIZE_RANGE: std::ops::RangeInclusive<u32> = 4..=64;

/// A rasterized font: its glyph atlas plus the texture and material the
/// renderer created for it.
#[derive(Debug)]
pub struct Font {
    atlas: GlyphAtlas,
    texture: TextureHandle,
    material: MaterialHandle,
    uploaded_revision: Option<u64>,
}

impl Font {
    pub(crate) fn new(atlas: GlyphAtlas, texture: TextureHandle, material: MaterialHandle) -> Self {
        Self {
            atlas,
            texture,
            material,
            uploaded_revision: None,
        }
    }

    pub fn check_size(pixel_size: u32) -> Result<u32, EngineError> {
        if FONT_SIZE_RANGE.contains(&pixel_size) {
            Ok(pixel_size)
        } else {
            log::error!(
                "Font size {pixel_size} is outside {}..={}",
                FONT_SIZE_RANGE.start(),
                FONT_SIZE_RANGE.end()
            );
            Err(EngineError::FontSize(pixel_size))
        }
    }

    pub fn pixel_size(&self) -> u32 {
        self.atlas.pixel_size()
    }

    pub fn atlas(&self) -> &GlyphAtlas {
        &self.atlas
    }

    pub fn atlas_version(&self) -> u64 {
        self.atlas.version()
    }

    pub fn texture(&self) -> TextureHandle {
        self.texture
    }

    pub fn material(&self) -> MaterialHandle {
        self.material
    }

    pub fn generate_text_mesh(
        &mut self,
        text: &str,
        align_h: HorizontalAlign,
        align_v: VerticalAlign,
    ) -> TextMesh {
        layout::generate_text_mesh(&mut self.atlas, text, align_h, align_v)
    }

    pub fn text_size(&mut self, text: &str) -> Vec2 {
        layout::measure(&mut self.atlas, text)
    }

    /// Whether the atlas pixels changed since the last upload.
    pub(crate) fn needs_upload(&self) -> bool {
        self.uploaded_revision != Some(self.atlas.revision())
    }

    pub(crate) fn mark_uploaded(&mut self) {
        self.uploaded_revision = Some(self.atlas.revision());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::atlas::tests::box_atlas;

    #[test]
    fn size_limits() {
        assert_eq!(Font::check_size(4), Ok(4));
        assert_eq!(Font::check_size(64), Ok(64));
        assert_eq!(Font::check_size(65), Err(EngineError::FontSize(65)));
        assert_eq!(Font::check_size(0), Err(EngineError::FontSize(0)));
    }

    #[test]
    fn upload_tracking_follows_atlas_pixels() {
        let mut font = Font::new(box_atlas(10), TextureHandle(0), MaterialHandle(0));
        assert!(font.needs_upload());
        font.mark_uploaded();
        assert!(!font.needs_upload());
        font.text_size("a");
        assert!(font.needs_upload());
    }
}
