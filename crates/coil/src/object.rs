//! Entities: the drawable, updatable, collidable unit managed by the
//! [`ObjectManager`](crate::object_manager::ObjectManager).
//!
//! An [`Entity`] is plain data plus an optional boxed [`Behavior`] that
//! receives lifecycle and collision callbacks. Render bindings are handles
//! into the renderer's registries; an entity without a mesh or material is
//! simply never batched.

use std::fmt;

use crate::animation::SpriteAnimator;
use crate::camera::{CameraId, CameraManager};
use crate::collision::{Collider, CollisionGroupRegistry};
use crate::math::{Color, Transform2D, Vec2};
use crate::render::assets::{MaterialHandle, MeshHandle, RenderAssets};
use crate::text::TextObject;

/// Stable id assigned when an entity is added to the object manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub(crate) u64);

impl EntityId {
    /// Placeholder carried by entities that were never added to a manager.
    pub const UNASSIGNED: Self = Self(u64::MAX);
}

/// Game logic hooks. All methods default to doing nothing.
pub trait Behavior {
    fn init(&mut self, _entity: &mut Entity) {}
    fn update(&mut self, _entity: &mut Entity, _dt: f32) {}
    fn on_collision(&mut self, _entity: &mut Entity, _other: &Entity) {}
    fn free(&mut self, _entity: &mut Entity) {}
}

/// What kind of entity this is.
#[derive(Debug)]
pub enum EntityKind {
    Game,
    Text(TextObject),
}

/// Position and zoom of the camera an entity is pinned to, refreshed by the
/// object manager every update.
#[derive(Debug, Clone, Copy, PartialEq)]
struct CameraAnchor {
    position: Vec2,
    zoom: f32,
}

pub struct Entity {
    pub(crate) id: EntityId,
    pub tag: Option<String>,
    pub kind: EntityKind,
    pub transform: Transform2D,
    pub mesh: Option<MeshHandle>,
    pub material: Option<MaterialHandle>,
    /// Render layer tag; `None` draws on layer 0.
    pub render_layer: Option<String>,
    pub color: Color,
    pub flip_x: bool,
    pub flip_y: bool,
    pub animator: Option<SpriteAnimator>,
    pub collider: Option<Collider>,
    pub visible: bool,
    alive: bool,
    category: u32,
    mask: u32,
    ignore_camera: bool,
    reference_camera: Option<CameraId>,
    anchor: Option<CameraAnchor>,
    pub(crate) behavior: Option<Box<dyn Behavior>>,
}

impl Entity {
    pub fn new() -> Self {
        Self {
            id: EntityId::UNASSIGNED,
            tag: None,
            kind: EntityKind::Game,
            transform: Transform2D::new(),
            mesh: None,
            material: None,
            render_layer: None,
            color: Color::WHITE,
            flip_x: false,
            flip_y: false,
            animator: None,
            collider: None,
            visible: true,
            alive: true,
            category: 0,
            mask: 0,
            ignore_camera: false,
            reference_camera: None,
            anchor: None,
            behavior: None,
        }
    }

    /// A text entity. Its mesh and material are filled in by the object
    /// manager from the text object's font.
    pub fn text(text: TextObject) -> Self {
        let mut entity = Self::new();
        entity.kind = EntityKind::Text(text);
        entity
    }

    // ── Builders ────────────────────────────────────────────────────────

    pub fn with_tag(mut self, tag: &str) -> Self {
        self.tag = Some(tag.to_owned());
        self
    }

    pub fn at(mut self, x: f32, y: f32) -> Self {
        self.transform.set_position(Vec2::new(x, y));
        self
    }

    pub fn with_scale(mut self, scale: Vec2) -> Self {
        self.transform.set_scale(scale);
        self
    }

    pub fn with_mesh(mut self, mesh: MeshHandle) -> Self {
        self.mesh = Some(mesh);
        self
    }

    pub fn with_material(mut self, material: MaterialHandle) -> Self {
        self.material = Some(material);
        self
    }

    pub fn with_layer(mut self, layer: &str) -> Self {
        self.render_layer = Some(layer.to_owned());
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn with_animator(mut self, animator: SpriteAnimator) -> Self {
        self.animator = Some(animator);
        self
    }

    pub fn with_collider(mut self, collider: Collider) -> Self {
        self.collider = Some(collider);
        self
    }

    pub fn with_behavior(mut self, behavior: impl Behavior + 'static) -> Self {
        self.behavior = Some(Box::new(behavior));
        self
    }

    // ── Identity and lifecycle ──────────────────────────────────────────

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Mark for removal at the end of the next update.
    pub fn kill(&mut self) {
        self.alive = false;
    }

    pub fn text_object(&self) -> Option<&TextObject> {
        match &self.kind {
            EntityKind::Text(text) => Some(text),
            EntityKind::Game => None,
        }
    }

    pub fn text_object_mut(&mut self) -> Option<&mut TextObject> {
        match &mut self.kind {
            EntityKind::Text(text) => Some(text),
            EntityKind::Game => None,
        }
    }

    // ── Collision filtering ─────────────────────────────────────────────

    /// Join group `tag` and collide with every group in `collides_with`.
    pub fn set_collision(
        &mut self,
        groups: &mut CollisionGroupRegistry,
        tag: &str,
        collides_with: &[&str],
    ) {
        self.category = groups.group_bit(tag);
        self.mask = groups.mask_of(collides_with);
    }

    pub fn category(&self) -> u32 {
        self.category
    }

    pub fn mask(&self) -> u32 {
        self.mask
    }

    // ── Camera relativity ───────────────────────────────────────────────

    /// Pin the entity to screen space. With a reference camera, its world
    /// position and scale are derived from that camera's position and zoom.
    pub fn set_ignore_camera(&mut self, ignore: bool, reference: Option<CameraId>) {
        self.ignore_camera = ignore;
        self.reference_camera = if ignore { reference } else { None };
        self.anchor = None;
    }

    pub fn ignores_camera(&self) -> bool {
        self.ignore_camera
    }

    pub fn reference_camera(&self) -> Option<CameraId> {
        self.reference_camera
    }

    pub(crate) fn refresh_anchor(&mut self, cameras: &CameraManager) {
        self.anchor = self
            .reference_camera
            .and_then(|id| cameras.get(id))
            .map(|camera| CameraAnchor {
                position: camera.position,
                zoom: camera.zoom,
            });
    }

    pub fn world_position(&self) -> Vec2 {
        match (self.ignore_camera, self.anchor) {
            (true, Some(anchor)) => (anchor.position + self.transform.position()) / anchor.zoom,
            _ => self.transform.position(),
        }
    }

    pub fn world_scale(&self) -> Vec2 {
        match (self.ignore_camera, self.anchor) {
            (true, Some(anchor)) => self.transform.scale() / anchor.zoom,
            _ => self.transform.scale(),
        }
    }

    // ── Render queries ──────────────────────────────────────────────────

    /// Radius of a circle enclosing the scaled mesh. Entities without a
    /// registered mesh are treated as unit quads.
    pub fn bounding_radius(&self, assets: &RenderAssets) -> f32 {
        let half = self
            .mesh
            .and_then(|m| assets.mesh(m))
            .map(|m| m.local_half_size())
            .unwrap_or(Vec2::splat(0.5));
        (half * self.world_scale()).length()
    }

    /// Has a mesh and a material whose shader accepts per-instance data.
    pub fn can_be_instanced(&self, assets: &RenderAssets) -> bool {
        match (self.mesh, self.material) {
            (Some(mesh), Some(material)) => {
                assets.mesh(mesh).is_some() && assets.can_instance(material)
            }
            _ => false,
        }
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("tag", &self.tag)
            .field("alive", &self.alive)
            .field("visible", &self.visible)
            .field("position", &self.transform.position())
            .field("mesh", &self.mesh)
            .field("material", &self.material)
            .field("layer", &self.render_layer)
            .field("has_behavior", &self.behavior.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Camera2D;

    #[test]
    fn set_collision_assigns_category_and_mask() {
        let mut groups = CollisionGroupRegistry::new();
        let mut e = Entity::new();
        e.set_collision(&mut groups, "enemy", &["player", "bullet"]);
        assert_eq!(e.category(), groups.group_bit("enemy"));
        assert_eq!(
            e.mask(),
            groups.group_bit("player") | groups.group_bit("bullet")
        );
    }

    #[test]
    fn fresh_entities_are_unconfigured() {
        let e = Entity::new();
        assert_eq!((e.category(), e.mask()), (0, 0));
        assert!(e.is_alive() && e.visible);
        assert_eq!(e.id(), EntityId::UNASSIGNED);
    }

    #[test]
    fn pinned_entities_follow_camera_anchor() {
        let mut cameras = CameraManager::new(800, 600);
        let hud = cameras.register("hud", Camera2D::new(800, 600).at(Vec2::new(100.0, 0.0)).with_zoom(2.0));
        let mut e = Entity::new().at(20.0, 40.0).with_scale(Vec2::splat(4.0));
        e.set_ignore_camera(true, Some(hud));
        e.refresh_anchor(&cameras);
        assert_eq!(e.world_position(), Vec2::new(60.0, 20.0));
        assert_eq!(e.world_scale(), Vec2::splat(2.0));

        e.set_ignore_camera(false, None);
        assert_eq!(e.world_position(), Vec2::new(20.0, 40.0));
    }

    #[test]
    fn bounding_radius_defaults_to_unit_quad() {
        let assets = RenderAssets::new();
        let e = Entity::new().with_scale(Vec2::new(6.0, 8.0));
        assert!((e.bounding_radius(&assets) - 5.0).abs() < 1e-5);
    }
}
