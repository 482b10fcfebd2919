use std::collections::HashMap;

use crate::render::assets::{FontHandle, MaterialHandle, MeshHandle};
use crate::render::backend::GraphicsBackend;
use crate::render::renderer::Renderer;

use super::layout::{HorizontalAlign, VerticalAlign};

type CacheKey = (String, HorizontalAlign, VerticalAlign);

#[derive(Debug, Clone, Copy)]
struct CachedMesh {
    mesh: MeshHandle,
    atlas_version: u64,
}

/// A string drawn with a font. Keeps generated meshes keyed by the exact
/// text and alignment so switching between strings does not re-mesh.
///
/// A cached mesh is only reused while the font's atlas version matches the
/// one it was built against. The cache is dropped wholesale once it holds
/// `capacity` entries.
#[derive(Debug)]
pub struct TextObject {
    pub font: FontHandle,
    text: String,
    align_h: HorizontalAlign,
    align_v: VerticalAlign,
    capacity: usize,
    cache: HashMap<CacheKey, CachedMesh>,
}

impl TextObject {
    pub const DEFAULT_CACHE_CAPACITY: usize = 500;

    pub fn new(font: FontHandle, text: &str) -> Self {
        Self {
            font,
            text: text.to_owned(),
            align_h: HorizontalAlign::default(),
            align_v: VerticalAlign::default(),
            capacity: Self::DEFAULT_CACHE_CAPACITY,
            cache: HashMap::new(),
        }
    }

    /// Set both alignments (builder pattern).
    pub fn with_align(mut self, align_h: HorizontalAlign, align_v: VerticalAlign) -> Self {
        self.set_alignment(align_h, align_v);
        self
    }

    /// Set the cache capacity (builder pattern). Zero means one entry.
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: &str) {
        if self.text != text {
            self.text = text.to_owned();
        }
    }

    pub fn alignment(&self) -> (HorizontalAlign, VerticalAlign) {
        (self.align_h, self.align_v)
    }

    pub fn set_alignment(&mut self, align_h: HorizontalAlign, align_v: VerticalAlign) {
        self.align_h = align_h;
        self.align_v = align_v;
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    /// Mesh and material for the current text, regenerating the mesh if it
    /// is missing or was built against an older atlas.
    pub fn prepare<B: GraphicsBackend>(
        &mut self,
        renderer: &mut Renderer<B>,
    ) -> Option<(MeshHandle, MaterialHandle)> {
        let material = renderer.assets().font(self.font)?.material();
        let key = (self.text.clone(), self.align_h, self.align_v);

        let stale = match self.cache.get(&key) {
            Some(cached) => {
                let version = renderer.assets().font(self.font)?.atlas_version();
                if cached.atlas_version == version {
                    return Some((cached.mesh, material));
                }
                Some(cached.mesh)
            }
            None => None,
        };

        if stale.is_none() && self.cache.len() >= self.capacity {
            log::debug!("Text mesh cache full ({}), clearing", self.cache.len());
            self.release(renderer);
        }

        let text_mesh = renderer.generate_text_mesh(self.font, &self.text, self.align_h, self.align_v)?;
        let atlas_version = renderer.assets().font(self.font)?.atlas_version();
        let mesh = renderer.store_text_mesh(stale, text_mesh.mesh)?;
        self.cache.insert(key, CachedMesh { mesh, atlas_version });
        Some((mesh, material))
    }

    /// Release every cached mesh.
    pub fn release<B: GraphicsBackend>(&mut self, renderer: &mut Renderer<B>) {
        for (_, cached) in self.cache.drain() {
            renderer.release_text_mesh(cached.mesh);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::render::backend::HeadlessBackend;
    use crate::text::atlas::tests::BoxRasterizer;

    fn renderer_with_font(side: u32) -> (Renderer<HeadlessBackend>, FontHandle) {
        let mut renderer = Renderer::new(HeadlessBackend::new(800, 600), &EngineConfig::default()).unwrap();
        let font = renderer
            .register_font_with("box", Box::new(BoxRasterizer { side }), side)
            .unwrap();
        (renderer, font)
    }

    #[test]
    fn same_text_reuses_the_cached_mesh() {
        let (mut renderer, font) = renderer_with_font(10);
        let mut text = TextObject::new(font, "hello");
        let (first, material) = text.prepare(&mut renderer).unwrap();
        let (second, _) = text.prepare(&mut renderer).unwrap();
        assert_eq!(first, second);
        assert_eq!(material, renderer.assets().font(font).unwrap().material());
        assert_eq!(text.cached_len(), 1);
    }

    #[test]
    fn switching_text_keeps_both_meshes() {
        let (mut renderer, font) = renderer_with_font(10);
        let mut text = TextObject::new(font, "a");
        let (a, _) = text.prepare(&mut renderer).unwrap();
        text.set_text("b");
        let (b, _) = text.prepare(&mut renderer).unwrap();
        text.set_text("a");
        let (a_again, _) = text.prepare(&mut renderer).unwrap();
        assert_ne!(a, b);
        assert_eq!(a, a_again);
        assert_eq!(text.cached_len(), 2);
    }

    #[test]
    fn atlas_growth_invalidates_cached_mesh() {
        let (mut renderer, font) = renderer_with_font(20);
        let mut label = TextObject::new(font, "A");
        label.prepare(&mut renderer).unwrap();
        let before = renderer.assets().font(font).unwrap().atlas_version();
        let old_vertices = {
            let (mesh, _) = label.prepare(&mut renderer).unwrap();
            renderer.assets().mesh(mesh).unwrap().vertices().to_vec()
        };

        // enough distinct glyphs to force the atlas to grow
        let filler: String = (0..40u32).filter_map(|i| char::from_u32(0x4e00 + i)).collect();
        let mut other = TextObject::new(font, &filler);
        other.prepare(&mut renderer).unwrap();
        assert!(renderer.assets().font(font).unwrap().atlas_version() > before);

        let (mesh, _) = label.prepare(&mut renderer).unwrap();
        let new_vertices = renderer.assets().mesh(mesh).unwrap().vertices().to_vec();
        assert_ne!(old_vertices, new_vertices);
        assert_eq!(label.cached_len(), 1);
    }

    #[test]
    fn full_cache_is_cleared() {
        let (mut renderer, font) = renderer_with_font(10);
        let mut text = TextObject::new(font, "0").with_cache_capacity(3);
        for i in 0..3 {
            text.set_text(&i.to_string());
            text.prepare(&mut renderer).unwrap();
        }
        assert_eq!(text.cached_len(), 3);
        text.set_text("x");
        text.prepare(&mut renderer).unwrap();
        assert_eq!(text.cached_len(), 1);
    }
}
