//! Text meshing: UTF-8 string → one textured quad per visible glyph.
//!
//! Lines are separated by `\n` and are one pixel-size apart. Horizontal
//! alignment is applied per line, vertical alignment to the whole block:
//!
//! ```text
//!   Left:   line starts at x = 0          Top:    first baseline at y = -lh
//!   Center: line starts at x = -width/2   Middle: block centered on y = 0
//!   Right:  line ends at x = 0            Bottom: last baseline at y = 0
//! ```

use serde::{Deserialize, Serialize};

use crate::math::Vec2;
use crate::render::mesh::Mesh;
use crate::render::vertex::Vertex;

use super::atlas::{Glyph, GlyphAtlas};

/// Substituted for characters the font cannot render.
pub const FALLBACK_GLYPH: char = '?';

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HorizontalAlign {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VerticalAlign {
    #[default]
    Top,
    Middle,
    Bottom,
}

/// Geometry for a string plus the size of its bounding block.
#[derive(Debug, Clone, PartialEq)]
pub struct TextMesh {
    pub mesh: Mesh,
    pub size: Vec2,
}

/// Bake every glyph `text` needs, then lay it out.
///
/// All baking happens before any quad is emitted, so a growth triggered by a
/// late glyph cannot leave earlier quads pointing at stale UVs.
pub fn generate_text_mesh(
    atlas: &mut GlyphAtlas,
    text: &str,
    align_h: HorizontalAlign,
    align_v: VerticalAlign,
) -> TextMesh {
    let lines: Vec<Vec<Glyph>> = text
        .split('\n')
        .map(|line| line.chars().filter_map(|ch| resolve(atlas, ch)).collect())
        .collect();

    let line_height = atlas.pixel_size() as f32;
    let widths: Vec<f32> = lines.iter().map(|glyphs| line_width(glyphs)).collect();
    let size = Vec2::new(
        widths.iter().copied().fold(0.0, f32::max),
        line_height * lines.len() as f32,
    );

    let first_baseline = match align_v {
        VerticalAlign::Top => -line_height,
        VerticalAlign::Middle => size.y * 0.5 - line_height,
        VerticalAlign::Bottom => (lines.len() as f32 - 1.0) * line_height,
    };

    let mut vertices = Vec::new();
    let mut indices = Vec::new();
    for (index, (glyphs, width)) in lines.iter().zip(&widths).enumerate() {
        let baseline = first_baseline - index as f32 * line_height;
        let mut cursor = match align_h {
            HorizontalAlign::Left => 0.0,
            HorizontalAlign::Center => -width * 0.5,
            HorizontalAlign::Right => -width,
        };
        for glyph in glyphs {
            if !glyph.is_empty() {
                push_quad(&mut vertices, &mut indices, glyph, cursor, baseline);
            }
            cursor += glyph.advance_px() as f32;
        }
    }

    TextMesh {
        mesh: Mesh::new(vertices, indices),
        size,
    }
}

/// Width and height of the block `text` would occupy.
pub fn measure(atlas: &mut GlyphAtlas, text: &str) -> Vec2 {
    let mut width: f32 = 0.0;
    let mut lines = 0;
    for line in text.split('\n') {
        let glyphs: Vec<Glyph> = line.chars().filter_map(|ch| resolve(atlas, ch)).collect();
        width = width.max(line_width(&glyphs));
        lines += 1;
    }
    Vec2::new(width, atlas.pixel_size() as f32 * lines as f32)
}

fn resolve(atlas: &mut GlyphAtlas, ch: char) -> Option<Glyph> {
    if atlas.bake(ch) {
        return atlas.glyph(ch).copied();
    }
    if ch != FALLBACK_GLYPH && atlas.bake(FALLBACK_GLYPH) {
        return atlas.glyph(FALLBACK_GLYPH).copied();
    }
    log::warn!("No glyph for {ch:?} and no fallback");
    None
}

fn line_width(glyphs: &[Glyph]) -> f32 {
    glyphs.iter().map(|g| g.advance_px() as f32).sum()
}

fn push_quad(
    vertices: &mut Vec<Vertex>,
    indices: &mut Vec<u32>,
    glyph: &Glyph,
    cursor: f32,
    baseline: f32,
) {
    let left = cursor + glyph.bearing.x as f32;
    let bottom = baseline - (glyph.size.y as f32 - glyph.bearing.y as f32);
    let right = left + glyph.size.x as f32;
    let top = bottom + glyph.size.y as f32;
    let (tl, br) = (glyph.uv_top_left, glyph.uv_bottom_right);

    let base = vertices.len() as u32;
    vertices.extend([
        Vertex::new(left, top, tl.x, tl.y),
        Vertex::new(left, bottom, tl.x, br.y),
        Vertex::new(right, bottom, br.x, br.y),
        Vertex::new(right, top, br.x, tl.y),
    ]);
    indices.extend([base, base + 1, base + 2, base, base + 2, base + 3]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::atlas::tests::box_atlas;

    fn bounds(mesh: &Mesh) -> (Vec2, Vec2) {
        mesh.vertices().iter().fold(
            (Vec2::splat(f32::MAX), Vec2::splat(f32::MIN)),
            |(min, max), v| {
                let p = Vec2::new(v.position[0], v.position[1]);
                (min.min(p), max.max(p))
            },
        )
    }

    #[test]
    fn one_quad_per_visible_glyph() {
        let mut atlas = box_atlas(10);
        let text = generate_text_mesh(&mut atlas, "ab c", HorizontalAlign::Left, VerticalAlign::Top);
        assert_eq!(text.mesh.vertices().len(), 12);
        assert_eq!(text.mesh.indices().len(), 18);
        // space advances half a glyph
        assert_eq!(text.size, Vec2::new(35.0, 10.0));
    }

    #[test]
    fn horizontal_alignment_shifts_each_line() {
        let mut atlas = box_atlas(10);
        let left = generate_text_mesh(&mut atlas, "abcd", HorizontalAlign::Left, VerticalAlign::Top);
        let center = generate_text_mesh(&mut atlas, "abcd", HorizontalAlign::Center, VerticalAlign::Top);
        let right = generate_text_mesh(&mut atlas, "abcd", HorizontalAlign::Right, VerticalAlign::Top);
        assert_eq!(bounds(&left.mesh).0.x, 0.0);
        assert_eq!(bounds(&center.mesh).0.x, -20.0);
        assert_eq!(bounds(&right.mesh).1.x, 0.0);
    }

    #[test]
    fn vertical_alignment_places_the_block() {
        let mut atlas = box_atlas(10);
        let top = generate_text_mesh(&mut atlas, "a\nb", HorizontalAlign::Left, VerticalAlign::Top);
        let middle = generate_text_mesh(&mut atlas, "a\nb", HorizontalAlign::Left, VerticalAlign::Middle);
        let bottom = generate_text_mesh(&mut atlas, "a\nb", HorizontalAlign::Left, VerticalAlign::Bottom);
        // box glyphs sit exactly on the baseline and are one line tall
        assert_eq!(bounds(&top.mesh), (Vec2::new(0.0, -20.0), Vec2::new(10.0, 0.0)));
        assert_eq!(bounds(&middle.mesh), (Vec2::new(0.0, -10.0), Vec2::new(10.0, 10.0)));
        assert_eq!(bounds(&bottom.mesh), (Vec2::new(0.0, 0.0), Vec2::new(10.0, 20.0)));
        assert_eq!(top.size, Vec2::new(10.0, 20.0));
    }

    #[test]
    fn same_input_same_geometry() {
        let mut atlas = box_atlas(12);
        let a = generate_text_mesh(&mut atlas, "héllo\nwörld", HorizontalAlign::Center, VerticalAlign::Middle);
        let b = generate_text_mesh(&mut atlas, "héllo\nwörld", HorizontalAlign::Center, VerticalAlign::Middle);
        assert_eq!(a, b);
        assert_eq!(a.mesh.vertices().len(), 10 * 4);
    }

    #[test]
    fn unrenderable_chars_fall_back_to_placeholder() {
        let mut atlas = box_atlas(10);
        let text = generate_text_mesh(&mut atlas, "a\u{7}", HorizontalAlign::Left, VerticalAlign::Top);
        assert_eq!(text.mesh.vertices().len(), 8);
        assert!(atlas.glyph(FALLBACK_GLYPH).is_some());
    }

    #[test]
    fn measure_matches_generated_block() {
        let mut atlas = box_atlas(10);
        let size = measure(&mut atlas, "abc\nde");
        let text = generate_text_mesh(&mut atlas, "abc\nde", HorizontalAlign::Left, VerticalAlign::Top);
        assert_eq!(size, text.size);
        assert_eq!(size, Vec2::new(30.0, 20.0));
    }
}
