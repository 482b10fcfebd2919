//! # Texture — CPU-side Image Data
//!
//! [`TextureData`] is what the renderer hands to the backend for upload: raw
//! pixels plus the sampling settings the backend should use. The renderer
//! keeps only the dimensions afterwards; the pixels live on the GPU.
//!
//! Two textures are built in:
//!
//! - a 1x1 white pixel, for solid-colored materials
//! - an 8x8 yellow/black checkerboard, bound whenever a material has no
//!   texture so the missing binding is obvious on screen
//!
//! ```text
//!  ██  ██  ██  ██       yellow (255, 255, 0) / black, nearest filtering,
//!    ██  ██  ██  ██     mirrored-repeat addressing
//!  ██  ██  ██  ██
//! ```

use std::path::Path;

use crate::error::EngineError;

/// Pixel layout of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    /// Four bytes per pixel.
    Rgba8,
    /// One coverage byte per pixel (glyph atlases).
    R8,
}

impl TextureFormat {
    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            TextureFormat::Rgba8 => 4,
            TextureFormat::R8 => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterMode {
    Nearest,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WrapMode {
    ClampToEdge,
    Repeat,
    MirroredRepeat,
}

/// Pixels plus sampling settings, ready for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub pixels: Vec<u8>,
    pub filter: FilterMode,
    pub wrap: WrapMode,
}

impl TextureData {
    /// RGBA8 pixels, row 0 at the top. Panics if `pixels` has the wrong length.
    pub fn rgba(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        assert_eq!(pixels.len(), (width * height * 4) as usize, "RGBA8 size mismatch");
        Self {
            width,
            height,
            format: TextureFormat::Rgba8,
            pixels,
            filter: FilterMode::Nearest,
            wrap: WrapMode::ClampToEdge,
        }
    }

    /// Single-channel coverage pixels. Panics if `pixels` has the wrong length.
    pub fn r8(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        assert_eq!(pixels.len(), (width * height) as usize, "R8 size mismatch");
        Self {
            width,
            height,
            format: TextureFormat::R8,
            pixels,
            filter: FilterMode::Linear,
            wrap: WrapMode::ClampToEdge,
        }
    }

    /// Set the filter (builder pattern).
    pub fn filter(mut self, filter: FilterMode) -> Self {
        self.filter = filter;
        self
    }

    /// Set the wrap mode (builder pattern).
    pub fn wrap(mut self, wrap: WrapMode) -> Self {
        self.wrap = wrap;
        self
    }

    pub fn white() -> Self {
        Self::rgba(1, 1, vec![255, 255, 255, 255])
    }

    /// The error texture: 8x8 yellow/black checkerboard.
    pub fn checkerboard() -> Self {
        const SIZE: u32 = 8;
        let mut pixels = Vec::with_capacity((SIZE * SIZE * 4) as usize);
        for y in 0..SIZE {
            for x in 0..SIZE {
                if (x + y) % 2 == 0 {
                    pixels.extend_from_slice(&[255, 255, 0, 255]);
                } else {
                    pixels.extend_from_slice(&[0, 0, 0, 255]);
                }
            }
        }
        Self::rgba(SIZE, SIZE, pixels)
            .filter(FilterMode::Nearest)
            .wrap(WrapMode::MirroredRepeat)
    }

    /// Decode a PNG/JPEG file into RGBA8.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let img = image::open(path)
            .map_err(|e| EngineError::AssetLoad {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?
            .to_rgba8();
        let (width, height) = img.dimensions();
        Ok(Self::rgba(width, height, img.into_raw()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkerboard_alternates_yellow_and_black() {
        let tex = TextureData::checkerboard();
        assert_eq!((tex.width, tex.height), (8, 8));
        assert_eq!(&tex.pixels[0..4], &[255, 255, 0, 255]);
        assert_eq!(&tex.pixels[4..8], &[0, 0, 0, 255]);
        // second row starts black
        let row = 8 * 4;
        assert_eq!(&tex.pixels[row..row + 4], &[0, 0, 0, 255]);
        assert_eq!(tex.filter, FilterMode::Nearest);
        assert_eq!(tex.wrap, WrapMode::MirroredRepeat);
    }

    #[test]
    fn missing_file_is_an_asset_error() {
        let err = TextureData::from_file("definitely/not/here.png").unwrap_err();
        assert!(matches!(err, EngineError::AssetLoad { .. }));
    }
}
