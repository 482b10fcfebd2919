//! # Renderer — Registries, Batching and the Draw Flush
//!
//! The renderer owns every render resource and turns submitted entities into
//! the fewest draw calls it can:
//!
//! ```text
//!   submit(entities, camera)  ──►  RenderMap (layer → shader → batch key)
//!                                        │
//!   flush_draw_commands()  ◄─────────────┘
//!     for layer in 0..16, shader, batch key:
//!       material changed?   → unbind old, bind new        (tracked across the whole flush)
//!       shader instanced?   → one draw_instanced per camera run
//!       otherwise           → one draw per entity
//!     clear the map
//!
//!   draw_debug_line(..)  ──►  DebugLineQueue  ──►  flush_debug_line_draw_commands()
//! ```
//!
//! A material without a texture is drawn with the built-in checkerboard so
//! the missing binding is visible. Registration never panics: duplicates
//! and unknown references are logged and returned as [`EngineError`].
//!
//! Everything GPU-specific sits behind [`GraphicsBackend`], so the whole
//! pipeline above runs against [`HeadlessBackend`](super::backend::HeadlessBackend)
//! in tests.

use std::path::Path;

use serde::Serialize;

use crate::animation::SpriteSheet;
use crate::camera::{Camera2D, ortho_for_size};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::math::{Color, Mat4, Vec2};
use crate::object::Entity;
use crate::text::{Font, GlyphAtlas, GlyphRasterizer, HorizontalAlign, TextMesh, VerticalAlign};

use super::assets::{
    FontHandle, MaterialHandle, MeshHandle, RenderAssets, ShaderHandle, SpriteSheetHandle,
    TextureHandle, TextureInfo,
};
use super::backend::GraphicsBackend;
use super::batch::{RenderItem, RenderMap, build_render_map};
use super::debug_lines::DebugLineQueue;
use super::layer::RenderLayerRegistry;
use super::material::{Material, Shader};
use super::mesh::Mesh;
use super::texture::TextureData;
use super::vertex::DrawUniforms;

/// Tag prefix reserved for built-in resources.
pub const BUILTIN_PREFIX: &str = "coil/";

const SPRITE_SHADER: &str = include_str!("shaders/sprite.wgsl");
const SPRITE_IMMEDIATE_SHADER: &str = include_str!("shaders/sprite_immediate.wgsl");
const TEXT_SHADER: &str = include_str!("shaders/text.wgsl");

/// Handles of the resources every renderer starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Defaults {
    /// Instanced sprite shader.
    pub sprite_shader: ShaderHandle,
    /// Per-draw sprite shader.
    pub immediate_shader: ShaderHandle,
    pub text_shader: ShaderHandle,
    pub quad: MeshHandle,
    pub white_texture: TextureHandle,
    pub error_texture: TextureHandle,
    /// Sprite shader with no texture: draws the checkerboard.
    pub material: MaterialHandle,
    /// Sprite shader with the white texture: draws the entity color.
    pub color_material: MaterialHandle,
}

/// Counters from the most recent flush.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RenderStats {
    pub batches: usize,
    pub instanced_draws: usize,
    pub immediate_draws: usize,
    pub instances: usize,
    pub material_binds: usize,
    pub texture_switches: usize,
    pub debug_line_draws: usize,
}

impl RenderStats {
    pub fn draw_calls(&self) -> usize {
        self.instanced_draws + self.immediate_draws + self.debug_line_draws
    }
}

pub struct Renderer<B: GraphicsBackend> {
    backend: B,
    assets: RenderAssets,
    layers: RenderLayerRegistry,
    render_map: RenderMap,
    debug_lines: DebugLineQueue,
    defaults: Defaults,
    atlas_initial_size: u32,
    glyph_padding: u32,
    stats: RenderStats,
}

impl<B: GraphicsBackend> Renderer<B> {
    /// Create a renderer and upload the built-in resources.
    pub fn new(mut backend: B, config: &EngineConfig) -> Result<Self, EngineError> {
        let mut assets = RenderAssets::new();
        let defaults = install_builtins(&mut backend, &mut assets)?;
        Ok(Self {
            backend,
            assets,
            layers: RenderLayerRegistry::new(),
            render_map: RenderMap::new(),
            debug_lines: DebugLineQueue::new(),
            defaults,
            atlas_initial_size: config.atlas_initial_size,
            glyph_padding: config.glyph_padding,
            stats: RenderStats::default(),
        })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn assets(&self) -> &RenderAssets {
        &self.assets
    }

    pub fn defaults(&self) -> &Defaults {
        &self.defaults
    }

    pub fn stats(&self) -> RenderStats {
        self.stats
    }

    pub fn render_map(&self) -> &RenderMap {
        &self.render_map
    }

    // ── Shaders ─────────────────────────────────────────────────────────

    /// Compile and register a shader. Nothing is registered if compilation
    /// fails.
    pub fn register_shader(&mut self, tag: &str, shader: Shader) -> Result<ShaderHandle, EngineError> {
        reject_duplicate(self.assets.shaders.contains_tag(tag), "shader", tag)?;
        let handle = ShaderHandle(self.assets.shaders.next_index());
        if let Err(e) = self.backend.create_shader(handle, &shader) {
            log::error!("Shader '{tag}' failed to compile: {e}");
            return Err(e);
        }
        self.assets.shaders.insert(Some(tag), shader)?;
        Ok(handle)
    }

    pub fn load_shader(&mut self, tag: &str, path: impl AsRef<Path>) -> Result<ShaderHandle, EngineError> {
        let shader = Shader::from_file(path).inspect_err(|e| log::error!("{e}"))?;
        self.register_shader(tag, shader)
    }

    pub fn shader(&self, tag: &str) -> Option<ShaderHandle> {
        self.assets.shaders.index_of(tag).map(ShaderHandle)
    }

    /// Remove a shader no material uses.
    pub fn unregister_shader(&mut self, tag: &str) -> Result<(), EngineError> {
        let handle = self.lookup(tag, "shader", |a| a.shaders.index_of(tag))?;
        let handle = ShaderHandle(handle);
        if self.assets.shader_in_use(handle) {
            return Err(in_use("shader", tag));
        }
        self.assets.shaders.remove(handle.0);
        self.backend.release_shader(handle);
        Ok(())
    }

    // ── Textures ────────────────────────────────────────────────────────

    pub fn register_texture(&mut self, tag: &str, data: &TextureData) -> Result<TextureHandle, EngineError> {
        let info = TextureInfo {
            width: data.width,
            height: data.height,
        };
        let handle = TextureHandle(self.assets.textures.insert(Some(tag), info)?);
        self.backend.create_texture(handle, data);
        Ok(handle)
    }

    pub fn load_texture(&mut self, tag: &str, path: impl AsRef<Path>) -> Result<TextureHandle, EngineError> {
        let data = TextureData::from_file(path).inspect_err(|e| log::error!("{e}"))?;
        self.register_texture(tag, &data)
    }

    pub fn texture(&self, tag: &str) -> Option<TextureHandle> {
        self.assets.textures.index_of(tag).map(TextureHandle)
    }

    /// The texture registered as `tag`, or the error texture.
    pub fn texture_or_default(&self, tag: &str) -> TextureHandle {
        self.texture(tag).unwrap_or_else(|| {
            log::warn!("Unknown texture '{tag}', using the error texture");
            self.defaults.error_texture
        })
    }

    /// Remove a texture no material, sprite sheet or font uses.
    pub fn unregister_texture(&mut self, tag: &str) -> Result<(), EngineError> {
        let handle = TextureHandle(self.lookup(tag, "texture", |a| a.textures.index_of(tag))?);
        if self.assets.texture_in_use(handle) {
            return Err(in_use("texture", tag));
        }
        self.assets.textures.remove(handle.0);
        self.backend.release_texture(handle);
        Ok(())
    }

    // ── Meshes ──────────────────────────────────────────────────────────

    pub fn register_mesh(&mut self, tag: &str, mesh: Mesh) -> Result<MeshHandle, EngineError> {
        let handle = MeshHandle(self.assets.meshes.insert(Some(tag), mesh)?);
        if let Some(mesh) = self.assets.meshes.get(handle.0) {
            self.backend.create_mesh(handle, mesh);
        }
        Ok(handle)
    }

    pub fn mesh(&self, tag: &str) -> Option<MeshHandle> {
        self.assets.meshes.index_of(tag).map(MeshHandle)
    }

    /// The mesh registered as `tag`, or the unit quad.
    pub fn mesh_or_default(&self, tag: &str) -> MeshHandle {
        self.mesh(tag).unwrap_or_else(|| {
            log::warn!("Unknown mesh '{tag}', using the default quad");
            self.defaults.quad
        })
    }

    pub fn unregister_mesh(&mut self, tag: &str) -> Result<(), EngineError> {
        let handle = MeshHandle(self.lookup(tag, "mesh", |a| a.meshes.index_of(tag))?);
        self.assets.meshes.remove(handle.0);
        self.backend.release_mesh(handle);
        Ok(())
    }

    // ── Materials ───────────────────────────────────────────────────────

    /// Register a material. Its shader and texture must already be
    /// registered.
    pub fn register_material(&mut self, tag: &str, mut material: Material) -> Result<MaterialHandle, EngineError> {
        let Some(shader) = self.assets.shader(material.shader) else {
            log::error!("Material '{tag}' refers to an unregistered shader");
            return Err(EngineError::UnknownTag {
                kind: "shader",
                tag: format!("{:?}", material.shader),
            });
        };
        if material.wants_instancing() && !shader.supports_instancing() {
            log::debug!("Material '{tag}': shader '{}' has no instance inputs, drawing per entity", shader.label);
            material.set_instancing(false);
        }
        if let Some(texture) = material.texture {
            if self.assets.texture(texture).is_none() {
                log::error!("Material '{tag}' refers to an unregistered texture");
                return Err(EngineError::UnknownTag {
                    kind: "texture",
                    tag: format!("{texture:?}"),
                });
            }
        }
        Ok(MaterialHandle(self.assets.materials.insert(Some(tag), material)?))
    }

    pub fn material(&self, tag: &str) -> Option<MaterialHandle> {
        self.assets.materials.index_of(tag).map(MaterialHandle)
    }

    /// The material registered as `tag`, or the default material.
    pub fn material_or_default(&self, tag: &str) -> MaterialHandle {
        self.material(tag).unwrap_or_else(|| {
            log::warn!("Unknown material '{tag}', using the default material");
            self.defaults.material
        })
    }

    pub fn material_mut(&mut self, handle: MaterialHandle) -> Option<&mut Material> {
        self.assets.materials.get_mut(handle.0)
    }

    pub fn unregister_material(&mut self, tag: &str) -> Result<(), EngineError> {
        let handle = MaterialHandle(self.lookup(tag, "material", |a| a.materials.index_of(tag))?);
        if self.assets.material_in_use(handle) {
            return Err(in_use("material", tag));
        }
        self.assets.materials.remove(handle.0);
        Ok(())
    }

    // ── Sprite sheets ───────────────────────────────────────────────────

    pub fn register_sprite_sheet(&mut self, tag: &str, sheet: SpriteSheet) -> Result<SpriteSheetHandle, EngineError> {
        if self.assets.texture(sheet.texture).is_none() {
            log::error!("Sprite sheet '{tag}' refers to an unregistered texture");
            return Err(EngineError::UnknownTag {
                kind: "texture",
                tag: format!("{:?}", sheet.texture),
            });
        }
        Ok(SpriteSheetHandle(self.assets.sprite_sheets.insert(Some(tag), sheet)?))
    }

    pub fn sprite_sheet(&self, tag: &str) -> Option<SpriteSheetHandle> {
        self.assets.sprite_sheets.index_of(tag).map(SpriteSheetHandle)
    }

    pub fn unregister_sprite_sheet(&mut self, tag: &str) -> Result<(), EngineError> {
        let handle = self.lookup(tag, "sprite sheet", |a| a.sprite_sheets.index_of(tag))?;
        self.assets.sprite_sheets.remove(handle);
        Ok(())
    }

    // ── Fonts ───────────────────────────────────────────────────────────

    /// Register a font rasterized by `rasterizer` at `pixel_size`. Creates
    /// the font's atlas texture and text material.
    pub fn register_font_with(
        &mut self,
        tag: &str,
        rasterizer: Box<dyn GlyphRasterizer>,
        pixel_size: u32,
    ) -> Result<FontHandle, EngineError> {
        Font::check_size(pixel_size)?;
        reject_duplicate(self.assets.fonts.contains_tag(tag), "font", tag)?;

        let atlas = GlyphAtlas::new(rasterizer, pixel_size, self.atlas_initial_size, self.glyph_padding);
        let data = atlas.texture_data();
        let texture = TextureHandle(self.assets.textures.insert(
            None,
            TextureInfo {
                width: data.width,
                height: data.height,
            },
        )?);
        self.backend.create_texture(texture, &data);

        let material = Material::new(self.defaults.text_shader)
            .texture(texture)
            .instancing(false);
        let material = MaterialHandle(self.assets.materials.insert(None, material)?);

        let mut font = Font::new(atlas, texture, material);
        font.mark_uploaded();
        Ok(FontHandle(self.assets.fonts.insert(Some(tag), font)?))
    }

    /// Load a TrueType/OpenType font file.
    #[cfg(feature = "text")]
    pub fn load_font(&mut self, tag: &str, path: impl AsRef<Path>, pixel_size: u32) -> Result<FontHandle, EngineError> {
        Font::check_size(pixel_size)?;
        let rasterizer = crate::text::FontdueRasterizer::from_file(path, pixel_size)
            .inspect_err(|e| log::error!("{e}"))?;
        self.register_font_with(tag, Box::new(rasterizer), pixel_size)
    }

    pub fn font(&self, tag: &str) -> Option<FontHandle> {
        self.assets.fonts.index_of(tag).map(FontHandle)
    }

    pub fn font_mut(&mut self, handle: FontHandle) -> Option<&mut Font> {
        self.assets.fonts.get_mut(handle.0)
    }

    /// Remove a font together with its atlas texture and text material.
    pub fn unregister_font(&mut self, tag: &str) -> Result<(), EngineError> {
        let index = self.lookup(tag, "font", |a| a.fonts.index_of(tag))?;
        if let Some(font) = self.assets.fonts.remove(index) {
            self.assets.materials.remove(font.material().0);
            self.assets.textures.remove(font.texture().0);
            self.backend.release_texture(font.texture());
        }
        Ok(())
    }

    pub fn generate_text_mesh(
        &mut self,
        font: FontHandle,
        text: &str,
        align_h: HorizontalAlign,
        align_v: VerticalAlign,
    ) -> Option<TextMesh> {
        let font = self.assets.fonts.get_mut(font.0)?;
        Some(font.generate_text_mesh(text, align_h, align_v))
    }

    /// Upload a text mesh, reusing `slot` if it is still registered.
    pub(crate) fn store_text_mesh(&mut self, slot: Option<MeshHandle>, mesh: Mesh) -> Option<MeshHandle> {
        if let Some(handle) = slot.filter(|h| self.assets.meshes.get(h.0).is_some()) {
            self.backend.create_mesh(handle, &mesh);
            self.assets.meshes.replace(handle.0, mesh);
            return Some(handle);
        }
        let handle = MeshHandle(self.assets.meshes.insert(None, mesh).ok()?);
        self.backend.create_mesh(handle, self.assets.meshes.get(handle.0)?);
        Some(handle)
    }

    pub(crate) fn release_text_mesh(&mut self, handle: MeshHandle) {
        if self.assets.meshes.remove(handle.0).is_some() {
            self.backend.release_mesh(handle);
        }
    }

    // ── Render layers ───────────────────────────────────────────────────

    pub fn register_render_layer(&mut self, tag: &str, ordinal: usize) -> Result<u8, EngineError> {
        self.layers.register(tag, ordinal)
    }

    pub fn register_render_layer_next(&mut self, tag: &str) -> Result<u8, EngineError> {
        self.layers.register_next(tag)
    }

    pub fn unregister_render_layer(&mut self, tag: &str) -> bool {
        self.layers.unregister(tag)
    }

    pub fn render_layers(&self) -> &RenderLayerRegistry {
        &self.layers
    }

    // ── Frame ───────────────────────────────────────────────────────────

    /// Queue `entities` for the next flush, viewed through `camera`.
    pub fn submit(&mut self, entities: &[&Entity], camera: Option<&Camera2D>) {
        build_render_map(entities, camera, &self.assets, &self.layers, &mut self.render_map);
    }

    /// Draw everything submitted since the last flush, then empty the
    /// render map.
    pub fn flush_draw_commands(&mut self) {
        self.sync_font_textures();

        let surface = self.backend.surface_size().as_vec2();
        let map = std::mem::take(&mut self.render_map);
        let mut stats = RenderStats {
            debug_line_draws: self.stats.debug_line_draws,
            ..RenderStats::default()
        };
        let mut bound_material: Option<MaterialHandle> = None;
        let mut bound_texture: Option<TextureHandle> = None;

        for (_, shaders) in map.layers() {
            for batches in shaders.values() {
                for (key, items) in batches {
                    let Some(first) = items.first() else {
                        continue;
                    };
                    let Some(material) = self.assets.material(key.material) else {
                        continue;
                    };
                    stats.batches += 1;

                    let material_texture = material
                        .texture
                        .filter(|t| self.assets.texture(*t).is_some())
                        .unwrap_or(self.defaults.error_texture);
                    let texture = first
                        .texture
                        .filter(|t| self.assets.texture(*t).is_some())
                        .unwrap_or(material_texture);

                    if bound_material != Some(key.material) {
                        if bound_material.is_some() {
                            self.backend.unbind_material();
                        }
                        self.backend.bind_material(material.shader, material_texture);
                        bound_material = Some(key.material);
                        bound_texture = Some(material_texture);
                        stats.material_binds += 1;
                    }
                    if bound_texture != Some(texture) {
                        self.backend.set_texture(texture);
                        bound_texture = Some(texture);
                        stats.texture_switches += 1;
                    }

                    if self.assets.can_instance(key.material) {
                        for run in items.chunk_by(|a, b| {
                            a.camera == b.camera && a.ignore_camera == b.ignore_camera
                        }) {
                            let instances: Vec<_> = run.iter().map(|item| item.instance).collect();
                            self.backend
                                .draw_instanced(key.mesh, view_projection(&run[0], surface), &instances);
                            stats.instanced_draws += 1;
                            stats.instances += instances.len();
                        }
                    } else {
                        for item in items {
                            let uniforms = DrawUniforms::new(view_projection(item, surface), &item.instance);
                            self.backend.draw(key.mesh, &uniforms);
                            stats.immediate_draws += 1;
                        }
                    }
                }
            }
        }

        if bound_material.is_some() {
            self.backend.unbind_material();
        }

        let mut map = map;
        map.clear();
        self.render_map = map;
        self.stats = stats;
    }

    /// Queue a debug segment. `width` is in world units.
    pub fn draw_debug_line(&mut self, from: Vec2, to: Vec2, camera: Option<&Camera2D>, color: Color, width: f32) {
        self.debug_lines.push(from, to, camera, color, width);
    }

    /// Draw and clear the queued debug segments, one draw per
    /// (camera, width) group.
    pub fn flush_debug_line_draw_commands(&mut self) {
        let surface = self.backend.surface_size().as_vec2();
        let mut draws = 0;
        for group in self.debug_lines.groups() {
            self.backend.draw_lines(group.view_proj(surface), &group.vertices);
            draws += 1;
        }
        self.debug_lines.clear();
        self.stats.debug_line_draws = draws;
    }

    // ── Internals ───────────────────────────────────────────────────────

    /// Re-upload atlases whose pixels changed since the last flush.
    fn sync_font_textures(&mut self) {
        let RenderAssets { fonts, textures, .. } = &mut self.assets;
        for (_, font) in fonts.iter_mut() {
            if !font.needs_upload() {
                continue;
            }
            let data = font.atlas().texture_data();
            self.backend.create_texture(font.texture(), &data);
            textures.replace(
                font.texture().0,
                TextureInfo {
                    width: data.width,
                    height: data.height,
                },
            );
            font.mark_uploaded();
        }
    }

    fn lookup(
        &self,
        tag: &str,
        kind: &'static str,
        find: impl FnOnce(&RenderAssets) -> Option<usize>,
    ) -> Result<usize, EngineError> {
        if tag.starts_with(BUILTIN_PREFIX) {
            return Err(in_use(kind, tag));
        }
        find(&self.assets).ok_or_else(|| {
            log::info!("Cannot unregister unknown {kind} '{tag}'");
            EngineError::UnknownTag {
                kind,
                tag: tag.to_owned(),
            }
        })
    }
}

fn reject_duplicate(exists: bool, kind: &'static str, tag: &str) -> Result<(), EngineError> {
    if exists {
        log::warn!("{kind} '{tag}' is already registered");
        return Err(EngineError::DuplicateTag {
            kind,
            tag: tag.to_owned(),
        });
    }
    Ok(())
}

fn in_use(kind: &'static str, tag: &str) -> EngineError {
    log::warn!("Cannot unregister {kind} '{tag}': still in use");
    EngineError::InUse {
        kind,
        tag: tag.to_owned(),
    }
}

/// Identity view for screen-space items or items without a camera;
/// projection sized to the camera's screen, or to the surface.
fn view_projection(item: &RenderItem, surface: Vec2) -> Mat4 {
    match &item.camera {
        Some(camera) if item.ignore_camera => camera.projection_matrix(),
        Some(camera) => camera.projection_matrix() * camera.view_matrix(),
        None => ortho_for_size(surface),
    }
}

fn install_builtins<B: GraphicsBackend>(backend: &mut B, assets: &mut RenderAssets) -> Result<Defaults, EngineError> {
    let mut shader = |tag: &str, source: &str| -> Result<ShaderHandle, EngineError> {
        let handle = ShaderHandle(assets.shaders.next_index());
        backend.create_shader(handle, &Shader::from_wgsl(tag, source))?;
        assets.shaders.insert(Some(tag), Shader::from_wgsl(tag, source))?;
        Ok(handle)
    };
    let sprite_shader = shader("coil/sprite", SPRITE_SHADER)?;
    let immediate_shader = shader("coil/sprite_immediate", SPRITE_IMMEDIATE_SHADER)?;
    let text_shader = shader("coil/text", TEXT_SHADER)?;

    let quad = MeshHandle(assets.meshes.insert(Some("coil/quad"), Mesh::quad())?);
    if let Some(mesh) = assets.meshes.get(quad.0) {
        backend.create_mesh(quad, mesh);
    }

    let mut texture = |tag: &str, data: TextureData| -> Result<TextureHandle, EngineError> {
        let info = TextureInfo {
            width: data.width,
            height: data.height,
        };
        let handle = TextureHandle(assets.textures.insert(Some(tag), info)?);
        backend.create_texture(handle, &data);
        Ok(handle)
    };
    let white_texture = texture("coil/white", TextureData::white())?;
    let error_texture = texture("coil/error", TextureData::checkerboard())?;

    let material = MaterialHandle(assets.materials.insert(Some("coil/default"), Material::new(sprite_shader))?);
    let color_material = MaterialHandle(
        assets
            .materials
            .insert(Some("coil/color"), Material::new(sprite_shader).texture(white_texture))?,
    );

    Ok(Defaults {
        sprite_shader,
        immediate_shader,
        text_shader,
        quad,
        white_texture,
        error_texture,
        material,
        color_material,
    })
}
