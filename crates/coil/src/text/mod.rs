//! Text rendering: glyph atlas, layout, fonts and cached text meshes.

pub mod atlas;
pub mod font;
#[cfg(feature = "text")]
pub mod fontdue_rasterizer;
pub mod layout;
pub mod text_object;

pub use atlas::{Glyph, GlyphAtlas, GlyphRasterizer, RasterizedGlyph};
pub use font::Font;
#[cfg(feature = "text")]
pub use fontdue_rasterizer::FontdueRasterizer;
pub use layout::{HorizontalAlign, TextMesh, VerticalAlign};
pub use text_object::TextObject;
