//! # Batching — the Render Map
//!
//! Everything submitted in a frame is sorted into a three-level map before
//! any GPU work happens:
//!
//! ```text
//!   layers[0..16]                       ascending ordinal = draw order
//!     └─ ShaderHandle                   one pipeline switch per shader
//!          └─ BatchKey {mesh, material, sprite sheet}
//!               └─ Vec<RenderItem>      submission order
//! ```
//!
//! Keys compare handles, not contents: two materials that happen to look the
//! same are still two batches. The map is rebuilt from scratch every frame
//! and emptied by the flush.

use std::collections::{BTreeMap, HashSet};

use crate::camera::Camera2D;
use crate::math::{Mat4, Vec2, Vec3};
use crate::object::{Entity, EntityId};

use super::assets::{MaterialHandle, MeshHandle, RenderAssets, ShaderHandle, SpriteSheetHandle, TextureHandle};
use super::layer::{MAX_LAYERS, RenderLayerRegistry};
use super::vertex::InstanceRaw;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BatchKey {
    pub mesh: MeshHandle,
    pub material: MaterialHandle,
    pub sprite_sheet: Option<SpriteSheetHandle>,
}

/// One entity queued for drawing, with everything the flush needs already
/// resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderItem {
    pub entity: EntityId,
    /// Camera the entity was submitted with, copied at submit time.
    pub camera: Option<Camera2D>,
    pub ignore_camera: bool,
    pub instance: InstanceRaw,
    /// Texture that replaces the material's, e.g. a sprite sheet.
    pub texture: Option<TextureHandle>,
}

pub type BatchMap = BTreeMap<BatchKey, Vec<RenderItem>>;
pub type ShaderMap = BTreeMap<ShaderHandle, BatchMap>;

#[derive(Debug, Clone)]
pub struct RenderMap {
    layers: [ShaderMap; MAX_LAYERS],
}

impl RenderMap {
    pub fn new() -> Self {
        Self {
            layers: std::array::from_fn(|_| BTreeMap::new()),
        }
    }

    pub fn push(&mut self, layer: u8, shader: ShaderHandle, key: BatchKey, item: RenderItem) {
        let layer = (layer as usize).min(MAX_LAYERS - 1);
        self.layers[layer]
            .entry(shader)
            .or_default()
            .entry(key)
            .or_default()
            .push(item);
    }

    /// Layers in draw order.
    pub fn layers(&self) -> impl Iterator<Item = (usize, &ShaderMap)> {
        self.layers.iter().enumerate()
    }

    pub fn batch(&self, layer: u8, shader: ShaderHandle, key: &BatchKey) -> Option<&[RenderItem]> {
        self.layers
            .get(layer as usize)?
            .get(&shader)?
            .get(key)
            .map(Vec::as_slice)
    }

    pub fn batch_count(&self) -> usize {
        self.layers
            .iter()
            .flat_map(|shaders| shaders.values())
            .map(BTreeMap::len)
            .sum()
    }

    pub fn item_count(&self) -> usize {
        self.layers
            .iter()
            .flat_map(|shaders| shaders.values())
            .flat_map(|batches| batches.values())
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.iter().all(BTreeMap::is_empty)
    }

    pub fn clear(&mut self) {
        for layer in &mut self.layers {
            layer.clear();
        }
    }
}

impl Default for RenderMap {
    fn default() -> Self {
        Self::new()
    }
}

/// Sort `entities` into `map`. Skips dead and hidden entities and anything
/// whose mesh, material or shader is not registered.
pub fn build_render_map(
    entities: &[&Entity],
    camera: Option<&Camera2D>,
    assets: &RenderAssets,
    layers: &RenderLayerRegistry,
    map: &mut RenderMap,
) {
    let mut unknown_layers: HashSet<&str> = HashSet::new();

    for entity in entities {
        if !entity.is_alive() || !entity.visible {
            continue;
        }
        let (Some(mesh), Some(material_handle)) = (entity.mesh, entity.material) else {
            continue;
        };
        if assets.mesh(mesh).is_none() {
            continue;
        }
        let Some(material) = assets.material(material_handle) else {
            continue;
        };
        if assets.shader(material.shader).is_none() {
            continue;
        }

        let layer = match entity.render_layer.as_deref() {
            None => 0,
            Some(tag) => match layers.ordinal(tag) {
                Some(ordinal) => ordinal,
                None => {
                    if unknown_layers.insert(tag) {
                        log::warn!("Unknown render layer '{tag}', drawing on layer 0");
                    }
                    0
                }
            },
        };

        let sheet = entity
            .animator
            .as_ref()
            .and_then(|a| assets.sprite_sheet(a.sheet).map(|s| (a, a.sheet, s.texture)));
        let (uv_offset, uv_scale) = match sheet {
            Some((animator, ..)) => (animator.uv_offset(), animator.uv_scale()),
            None => (Vec2::ZERO, Vec2::ONE),
        };

        let tint = material.color.to_array();
        let color = entity.color.to_array();
        let instance = InstanceRaw::new(
            model_matrix(entity),
            std::array::from_fn(|i| color[i] * tint[i]),
            uv_offset,
            uv_scale,
        );

        let key = BatchKey {
            mesh,
            material: material_handle,
            sprite_sheet: sheet.map(|(_, handle, _)| handle),
        };
        map.push(
            layer,
            material.shader,
            key,
            RenderItem {
                entity: entity.id(),
                camera: camera.copied(),
                ignore_camera: entity.ignores_camera(),
                instance,
                texture: sheet.map(|(.., texture)| texture),
            },
        );
    }
}

/// Transform matrix with UV flips applied. Camera-ignoring entities are
/// drawn from their screen-space transform; their anchored world position
/// only feeds collisions.
fn model_matrix(entity: &Entity) -> Mat4 {
    let base = entity.transform.matrix();
    if !entity.flip_x && !entity.flip_y {
        return base;
    }
    let flip = Vec3::new(
        if entity.flip_x { -1.0 } else { 1.0 },
        if entity.flip_y { -1.0 } else { 1.0 },
        1.0,
    );
    base * Mat4::from_scale(flip)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{SpriteAnimator, SpriteSheet};
    use crate::math::{Color, UVec2};
    use crate::render::material::{Material, Shader};
    use crate::render::mesh::Mesh;
    use crate::render::assets::TextureInfo;

    struct Fixture {
        assets: RenderAssets,
        shader: ShaderHandle,
        quad: MeshHandle,
        other_mesh: MeshHandle,
        material: MaterialHandle,
        other_material: MaterialHandle,
    }

    fn fixture() -> Fixture {
        let mut assets = RenderAssets::new();
        let shader = ShaderHandle(
            assets
                .shaders
                .insert(Some("s"), Shader::from_wgsl("s", "i_model"))
                .unwrap(),
        );
        let quad = MeshHandle(assets.meshes.insert(Some("quad"), Mesh::quad()).unwrap());
        let other_mesh = MeshHandle(assets.meshes.insert(Some("quad2"), Mesh::quad()).unwrap());
        let material = MaterialHandle(assets.materials.insert(Some("m"), Material::new(shader)).unwrap());
        let other_material = MaterialHandle(
            assets
                .materials
                .insert(Some("m2"), Material::new(shader).color(Color::RED))
                .unwrap(),
        );
        Fixture {
            assets,
            shader,
            quad,
            other_mesh,
            material,
            other_material,
        }
    }

    fn key(mesh: MeshHandle, material: MaterialHandle) -> BatchKey {
        BatchKey {
            mesh,
            material,
            sprite_sheet: None,
        }
    }

    #[test]
    fn same_handles_share_a_batch() {
        let f = fixture();
        let a = Entity::new().with_mesh(f.quad).with_material(f.material);
        let b = Entity::new().with_mesh(f.quad).with_material(f.material).at(5.0, 5.0);
        let mut map = RenderMap::new();
        build_render_map(&[&a, &b], None, &f.assets, &RenderLayerRegistry::new(), &mut map);
        assert_eq!(map.batch_count(), 1);
        assert_eq!(map.batch(0, f.shader, &key(f.quad, f.material)).map(<[_]>::len), Some(2));
    }

    #[test]
    fn changing_any_key_part_splits_the_batch() {
        let mut f = fixture();
        let texture = TextureHandle(
            f.assets.textures.insert(Some("t"), TextureInfo { width: 64, height: 64 }).unwrap(),
        );
        let sheet = SpriteSheet::new(texture, UVec2::new(64, 64), UVec2::new(32, 32));
        let sheet_handle = SpriteSheetHandle(f.assets.sprite_sheets.insert(Some("sheet"), sheet.clone()).unwrap());

        let base = Entity::new().with_mesh(f.quad).with_material(f.material);
        let mesh = Entity::new().with_mesh(f.other_mesh).with_material(f.material);
        let material = Entity::new().with_mesh(f.quad).with_material(f.other_material);
        let animated = Entity::new()
            .with_mesh(f.quad)
            .with_material(f.material)
            .with_animator(SpriteAnimator::new(sheet_handle, &sheet, 0.1));

        let mut map = RenderMap::new();
        build_render_map(
            &[&base, &mesh, &material, &animated],
            None,
            &f.assets,
            &RenderLayerRegistry::new(),
            &mut map,
        );
        assert_eq!(map.batch_count(), 4);
        let animated_key = BatchKey {
            sprite_sheet: Some(sheet_handle),
            ..key(f.quad, f.material)
        };
        let items = map.batch(0, f.shader, &animated_key).unwrap();
        assert_eq!(items[0].texture, Some(texture));
        assert_eq!(items[0].instance.uv_scale, [0.5, 0.5]);
    }

    #[test]
    fn incomplete_dead_and_hidden_entities_are_skipped() {
        let f = fixture();
        let no_mesh = Entity::new().with_material(f.material);
        let no_material = Entity::new().with_mesh(f.quad);
        let mut hidden = Entity::new().with_mesh(f.quad).with_material(f.material);
        hidden.visible = false;
        let mut dead = Entity::new().with_mesh(f.quad).with_material(f.material);
        dead.kill();
        let dangling = Entity::new().with_mesh(MeshHandle(99)).with_material(f.material);

        let mut map = RenderMap::new();
        build_render_map(
            &[&no_mesh, &no_material, &hidden, &dead, &dangling],
            None,
            &f.assets,
            &RenderLayerRegistry::new(),
            &mut map,
        );
        assert!(map.is_empty());
    }

    #[test]
    fn layers_resolve_by_tag_and_unknown_falls_back_to_zero() {
        let f = fixture();
        let mut layers = RenderLayerRegistry::new();
        layers.register("ui", 7).unwrap();
        let ui = Entity::new().with_mesh(f.quad).with_material(f.material).with_layer("ui");
        let lost = Entity::new().with_mesh(f.quad).with_material(f.material).with_layer("nope");

        let mut map = RenderMap::new();
        build_render_map(&[&ui, &lost], None, &f.assets, &layers, &mut map);
        let k = key(f.quad, f.material);
        assert_eq!(map.batch(7, f.shader, &k).map(<[_]>::len), Some(1));
        assert_eq!(map.batch(0, f.shader, &k).map(<[_]>::len), Some(1));
    }

    #[test]
    fn instance_color_combines_entity_and_material_tint() {
        let f = fixture();
        let e = Entity::new()
            .with_mesh(f.quad)
            .with_material(f.other_material)
            .with_color(Color::rgba(0.5, 1.0, 1.0, 0.5));
        let mut map = RenderMap::new();
        build_render_map(&[&e], None, &f.assets, &RenderLayerRegistry::new(), &mut map);
        let items = map.batch(0, f.shader, &key(f.quad, f.other_material)).unwrap();
        assert_eq!(items[0].instance.color, [0.5, 0.0, 0.0, 0.5]);
        assert_eq!(items[0].instance.uv_offset, [0.0, 0.0]);
        assert_eq!(items[0].instance.uv_scale, [1.0, 1.0]);
    }

    #[test]
    fn flips_mirror_the_model_matrix() {
        let mut e = Entity::new().at(10.0, 0.0);
        e.flip_x = true;
        let m = model_matrix(&e);
        assert_eq!(m.transform_point3(Vec3::new(1.0, 1.0, 0.0)), Vec3::new(9.0, 1.0, 0.0));
    }

    #[test]
    fn clear_empties_every_layer() {
        let f = fixture();
        let e = Entity::new().with_mesh(f.quad).with_material(f.material);
        let mut map = RenderMap::new();
        build_render_map(&[&e], None, &f.assets, &RenderLayerRegistry::new(), &mut map);
        map.clear();
        assert!(map.is_empty());
        assert_eq!(map.item_count(), 0);
    }
}
