//! # Object Manager — Lifecycle, Collisions and Draw Submission
//!
//! Owns every [`Entity`] in the scene and runs the per-frame passes over them:
//!
//! ```text
//!   update_all(dt)
//!     refresh camera anchors → Behavior::update → animators
//!     dead entities: Behavior::free, removed
//!     queued entities admitted (and initialised if init_all already ran)
//!
//!   check_collisions()
//!     sync collider position/scale from the entity
//!     grid.clear() → grid.insert(every live collider)
//!     per bucket pair: masks_allow? → narrow phase? → on_collision both ways
//!
//!   draw_all(renderer, camera)
//!     text entities get their cached mesh → cull → renderer.submit
//! ```
//!
//! Entities are kept sorted by id. Ids are handed out when an entity is added
//! or queued, so queued entities are slotted back into id order when they are
//! admitted. The spatial grid is rebuilt from scratch on every collision pass.

use crate::camera::{Camera2D, CameraManager};
use crate::collision::{CollisionGroupRegistry, SpatialHashGrid, masks_allow};
use crate::config::EngineConfig;
use crate::math::Color;
use crate::object::{Behavior, Entity, EntityId, EntityKind};
use crate::render::assets::FontHandle;
use crate::render::backend::GraphicsBackend;
use crate::render::cull::cull_visible;
use crate::render::renderer::Renderer;
use crate::text::TextObject;

pub struct ObjectManager {
    objects: Vec<Entity>,
    pending: Vec<Entity>,
    next_id: u64,
    initialized: bool,
    groups: CollisionGroupRegistry,
    grid: SpatialHashGrid<usize>,
    debug_circle_segments: u32,
    text_cache_capacity: usize,
    /// Text objects of removed entities, released on the next draw.
    retired_text: Vec<TextObject>,
}

impl ObjectManager {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            objects: Vec::new(),
            pending: Vec::new(),
            next_id: 0,
            initialized: false,
            groups: CollisionGroupRegistry::new(),
            grid: SpatialHashGrid::new(config.collision_cell_size),
            debug_circle_segments: config.debug_circle_segments,
            text_cache_capacity: config.text_cache_capacity,
            retired_text: Vec::new(),
        }
    }

    pub fn groups(&self) -> &CollisionGroupRegistry {
        &self.groups
    }

    pub fn groups_mut(&mut self) -> &mut CollisionGroupRegistry {
        &mut self.groups
    }

    /// A text object using the configured mesh cache capacity.
    pub fn text_object(&self, font: FontHandle, text: &str) -> TextObject {
        TextObject::new(font, text).with_cache_capacity(self.text_cache_capacity)
    }

    // ── Lifecycle ───────────────────────────────────────────────────────

    /// Add `entity` right away. A tag already in use is allowed but logged.
    pub fn add_object(&mut self, entity: Entity) -> EntityId {
        let mut entity = self.assign_id(entity);
        let id = entity.id;
        if self.initialized {
            run_behavior(&mut entity, |b, e| b.init(e));
        }
        self.objects.push(entity);
        id
    }

    /// Add `entity` at the end of the next [`update_all`](Self::update_all).
    pub fn queue_object(&mut self, entity: Entity) -> EntityId {
        let entity = self.assign_id(entity);
        let id = entity.id;
        self.pending.push(entity);
        id
    }

    fn assign_id(&mut self, mut entity: Entity) -> Entity {
        if let Some(tag) = &entity.tag {
            let taken = self
                .objects
                .iter()
                .chain(&self.pending)
                .any(|e| e.tag.as_deref() == Some(tag.as_str()));
            if taken {
                log::warn!("An object tagged '{tag}' already exists");
            }
        }
        entity.id = EntityId(self.next_id);
        self.next_id += 1;
        entity
    }

    /// Run every behavior's `init`. Entities added afterwards are initialised
    /// as they are admitted.
    pub fn init_all(&mut self) {
        for entity in &mut self.objects {
            run_behavior(entity, |b, e| b.init(e));
        }
        self.initialized = true;
    }

    /// Advance every live entity by `dt`, drop dead ones, then admit queued
    /// entities.
    pub fn update_all(&mut self, dt: f32, cameras: &CameraManager) {
        for entity in &mut self.objects {
            if !entity.is_alive() {
                continue;
            }
            entity.refresh_anchor(cameras);
            run_behavior(entity, |b, e| b.update(e, dt));
            if let Some(animator) = &mut entity.animator {
                animator.update(dt);
            }
        }

        self.remove_dead();

        for mut entity in std::mem::take(&mut self.pending) {
            if self.initialized {
                run_behavior(&mut entity, |b, e| b.init(e));
            }
            entity.refresh_anchor(cameras);
            let at = self.objects.partition_point(|e| e.id < entity.id);
            self.objects.insert(at, entity);
        }
    }

    fn remove_dead(&mut self) {
        if self.objects.iter().all(Entity::is_alive) {
            return;
        }
        let (alive, dead): (Vec<_>, Vec<_>) = std::mem::take(&mut self.objects)
            .into_iter()
            .partition(Entity::is_alive);
        self.objects = alive;
        for entity in dead {
            self.retire(entity);
        }
    }

    fn retire(&mut self, mut entity: Entity) {
        run_behavior(&mut entity, |b, e| b.free(e));
        log::debug!("Removed {:?}", entity.id);
        if let EntityKind::Text(text) = entity.kind {
            self.retired_text.push(text);
        }
    }

    /// Free and remove every entity, queued ones included.
    pub fn free_all(&mut self) {
        let objects = std::mem::take(&mut self.objects);
        let pending = std::mem::take(&mut self.pending);
        for entity in objects.into_iter().chain(pending) {
            self.retire(entity);
        }
    }

    // ── Queries ─────────────────────────────────────────────────────────

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.index_of(id).map(|i| &self.objects[i])
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.index_of(id).map(|i| &mut self.objects[i])
    }

    fn index_of(&self, id: EntityId) -> Option<usize> {
        self.objects.binary_search_by_key(&id, |e| e.id).ok()
    }

    /// First live entity tagged `tag`.
    pub fn find_by_tag(&self, tag: &str) -> Option<&Entity> {
        self.objects
            .iter()
            .find(|e| e.is_alive() && e.tag.as_deref() == Some(tag))
    }

    pub fn find_by_tag_mut(&mut self, tag: &str) -> Option<&mut Entity> {
        self.objects
            .iter_mut()
            .find(|e| e.is_alive() && e.tag.as_deref() == Some(tag))
    }

    pub fn find_all_by_tag(&self, tag: &str) -> Vec<&Entity> {
        self.objects
            .iter()
            .filter(|e| e.is_alive() && e.tag.as_deref() == Some(tag))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.objects.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.objects.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    // ── Collisions ──────────────────────────────────────────────────────

    /// Run one collision pass and fire `on_collision` on both entities of
    /// every colliding pair. Returns the pairs in the order they fired.
    pub fn check_collisions(&mut self) -> Vec<(EntityId, EntityId)> {
        self.grid.clear();
        for (index, entity) in self.objects.iter_mut().enumerate() {
            if !entity.is_alive() {
                continue;
            }
            let position = entity.world_position();
            let scale = entity.world_scale();
            if let Some(collider) = &mut entity.collider {
                collider.set_position(position);
                collider.sync_with_transform_scale(scale);
                self.grid.insert(index, position);
            }
        }

        let objects = &self.objects;
        let mut hits = Vec::new();
        self.grid.compute_collisions(|a, b| {
            let (ea, eb) = (&objects[a], &objects[b]);
            if !masks_allow(ea.category(), ea.mask(), eb.category(), eb.mask()) {
                return;
            }
            if let (Some(ca), Some(cb)) = (&ea.collider, &eb.collider) {
                if ca.check_collision(cb) {
                    hits.push((a.min(b), a.max(b)));
                }
            }
        });
        hits.sort_unstable();

        let mut pairs = Vec::with_capacity(hits.len());
        for (a, b) in hits {
            let (left, right) = self.objects.split_at_mut(b);
            let (ea, eb) = (&mut left[a], &mut right[0]);
            run_behavior(ea, |behavior, e| behavior.on_collision(e, eb));
            run_behavior(eb, |behavior, e| behavior.on_collision(e, ea));
            pairs.push((ea.id, eb.id));
        }
        pairs
    }

    // ── Drawing ─────────────────────────────────────────────────────────

    /// Submit every visible entity seen by `camera`.
    pub fn draw_all<B: GraphicsBackend>(&mut self, renderer: &mut Renderer<B>, camera: &Camera2D) {
        self.prepare_for_draw(renderer);
        let candidates: Vec<&Entity> = self.objects.iter().collect();
        submit_visible(renderer, camera, &candidates);
    }

    /// Submit only the entities in `ids`.
    pub fn draw_objects<B: GraphicsBackend>(
        &mut self,
        renderer: &mut Renderer<B>,
        camera: &Camera2D,
        ids: &[EntityId],
    ) {
        self.prepare_for_draw(renderer);
        let candidates: Vec<&Entity> = ids.iter().filter_map(|&id| self.get(id)).collect();
        submit_visible(renderer, camera, &candidates);
    }

    /// Submit only the entities tagged `tag`.
    pub fn draw_objects_with_tag<B: GraphicsBackend>(
        &mut self,
        renderer: &mut Renderer<B>,
        camera: &Camera2D,
        tag: &str,
    ) {
        self.prepare_for_draw(renderer);
        let candidates = self.find_all_by_tag(tag);
        submit_visible(renderer, camera, &candidates);
    }

    /// Queue the outline of every live collider as debug lines.
    pub fn draw_collider_debug<B: GraphicsBackend>(
        &self,
        renderer: &mut Renderer<B>,
        camera: &Camera2D,
        color: Color,
        width: f32,
    ) {
        for entity in self.objects.iter().filter(|e| e.is_alive()) {
            let Some(collider) = &entity.collider else {
                continue;
            };
            for (from, to) in collider.debug_segments(self.debug_circle_segments) {
                renderer.draw_debug_line(from, to, Some(camera), color, width);
            }
        }
    }

    /// Release meshes of removed text entities and refresh the mesh of live
    /// ones.
    fn prepare_for_draw<B: GraphicsBackend>(&mut self, renderer: &mut Renderer<B>) {
        for mut text in self.retired_text.drain(..) {
            text.release(renderer);
        }
        for entity in &mut self.objects {
            if !entity.is_alive() || !entity.visible {
                continue;
            }
            if let EntityKind::Text(text) = &mut entity.kind {
                match text.prepare(renderer) {
                    Some((mesh, material)) => {
                        entity.mesh = Some(mesh);
                        entity.material = Some(material);
                    }
                    None => entity.mesh = None,
                }
            }
        }
    }
}

fn submit_visible<B: GraphicsBackend>(renderer: &mut Renderer<B>, camera: &Camera2D, candidates: &[&Entity]) {
    let mut visible = Vec::with_capacity(candidates.len());
    cull_visible(camera, candidates, camera.viewport(), renderer.assets(), &mut visible);
    renderer.submit(&visible, Some(camera));
}

/// Call into the entity's behavior with the entity itself borrowed mutably.
fn run_behavior(entity: &mut Entity, f: impl FnOnce(&mut dyn Behavior, &mut Entity)) {
    if let Some(mut behavior) = entity.behavior.take() {
        f(behavior.as_mut(), entity);
        if entity.behavior.is_none() {
            entity.behavior = Some(behavior);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::collision::Collider;
    use crate::math::Vec2;
    use crate::render::backend::HeadlessBackend;

    type Log = Rc<RefCell<Vec<String>>>;

    struct Recorder {
        log: Log,
    }

    impl Behavior for Recorder {
        fn init(&mut self, entity: &mut Entity) {
            self.log.borrow_mut().push(format!("init {:?}", entity.tag));
        }

        fn update(&mut self, entity: &mut Entity, _dt: f32) {
            if entity.tag.as_deref() == Some("doomed") {
                entity.kill();
            }
        }

        fn on_collision(&mut self, entity: &mut Entity, other: &Entity) {
            self.log
                .borrow_mut()
                .push(format!("{:?} hit {:?}", entity.tag, other.tag));
        }

        fn free(&mut self, entity: &mut Entity) {
            self.log.borrow_mut().push(format!("free {:?}", entity.tag));
        }
    }

    fn manager() -> ObjectManager {
        ObjectManager::new(&EngineConfig::default())
    }

    fn body(tag: &str, x: f32, y: f32) -> Entity {
        Entity::new()
            .with_tag(tag)
            .at(x, y)
            .with_collider(Collider::circle(5.0))
    }

    #[test]
    fn ids_are_unique_and_lookup_works() {
        let mut m = manager();
        let a = m.add_object(Entity::new().with_tag("a"));
        let b = m.add_object(Entity::new().with_tag("a"));
        assert_ne!(a, b);
        assert_eq!(m.get(b).map(|e| e.id()), Some(b));
        assert_eq!(m.find_all_by_tag("a").len(), 2);
        assert_eq!(m.find_by_tag("a").map(|e| e.id()), Some(a));
        assert!(m.find_by_tag("missing").is_none());
    }

    #[test]
    fn queued_entity_is_found_by_id_after_later_adds() {
        let mut m = manager();
        let cameras = CameraManager::new(800, 600);
        let queued = m.queue_object(Entity::new().with_tag("queued"));
        let added: Vec<EntityId> = ["a", "b", "c"]
            .iter()
            .map(|tag| m.add_object(Entity::new().with_tag(tag)))
            .collect();
        m.update_all(0.016, &cameras);

        assert_eq!(m.get(queued).map(|e| e.id()), Some(queued));
        for id in added {
            assert_eq!(m.get(id).map(|e| e.id()), Some(id));
        }
        let order: Vec<EntityId> = m.iter().map(Entity::id).collect();
        let mut sorted = order.clone();
        sorted.sort();
        assert_eq!(order, sorted);
    }

    #[test]
    fn enemy_masking_player_collides_one_way() {
        let mut m = manager();
        let mut enemy = body("enemy", 10.0, 10.0);
        enemy.set_collision(m.groups_mut(), "enemy", &["player"]);
        let mut player = body("player", 12.0, 10.0);
        player.set_collision(m.groups_mut(), "player", &[]);
        let mut rock = body("rock", 14.0, 10.0);
        rock.set_collision(m.groups_mut(), "rock", &[]);

        let enemy = m.add_object(enemy);
        let player = m.add_object(player);
        m.add_object(rock);

        assert_eq!(m.check_collisions(), vec![(enemy, player)]);
    }

    #[test]
    fn unconfigured_entities_never_collide() {
        let mut m = manager();
        m.add_object(body("a", 10.0, 10.0));
        m.add_object(body("b", 10.0, 10.0));
        assert!(m.check_collisions().is_empty());
    }

    #[test]
    fn entities_in_different_cells_are_not_tested() {
        let mut m = manager();
        let mut a = body("a", 49.0, 10.0);
        a.set_collision(m.groups_mut(), "x", &["x"]);
        let mut b = body("b", 51.0, 10.0);
        b.set_collision(m.groups_mut(), "x", &["x"]);
        m.add_object(a);
        m.add_object(b);
        assert!(m.check_collisions().is_empty());
    }

    #[test]
    fn collision_callbacks_fire_on_both_entities() {
        let log: Log = Rc::default();
        let mut m = manager();
        for (tag, x) in [("left", 10.0), ("right", 15.0)] {
            let mut e = body(tag, x, 10.0).with_behavior(Recorder { log: log.clone() });
            e.set_collision(m.groups_mut(), "ball", &["ball"]);
            m.add_object(e);
        }
        assert_eq!(m.check_collisions().len(), 1);
        assert_eq!(
            *log.borrow(),
            vec![
                "Some(\"left\") hit Some(\"right\")".to_owned(),
                "Some(\"right\") hit Some(\"left\")".to_owned(),
            ]
        );
    }

    #[test]
    fn colliders_follow_transform_scale() {
        let mut m = manager();
        let mut a = Entity::new()
            .at(10.0, 10.0)
            .with_scale(Vec2::splat(3.0))
            .with_collider(Collider::circle(1.0).use_transform_scale(true));
        a.set_collision(m.groups_mut(), "x", &["x"]);
        let mut b = body("b", 15.0, 10.0).with_collider(Collider::circle(1.0));
        b.set_collision(m.groups_mut(), "x", &["x"]);
        m.add_object(a);
        m.add_object(b);
        // 3 + 1 < 5
        assert!(m.check_collisions().is_empty());

        m.iter_mut().for_each(|e| e.transform.set_scale(Vec2::splat(4.0)));
        assert_eq!(m.check_collisions().len(), 1);
    }

    #[test]
    fn dead_entities_are_freed_and_removed() {
        let log: Log = Rc::default();
        let mut m = manager();
        let cameras = CameraManager::new(800, 600);
        let keep = m.add_object(Entity::new().with_tag("keep"));
        let doomed = m.add_object(
            Entity::new()
                .with_tag("doomed")
                .with_behavior(Recorder { log: log.clone() }),
        );
        m.update_all(0.016, &cameras);
        assert!(m.get(doomed).is_none());
        assert!(m.get(keep).is_some());
        assert_eq!(*log.borrow(), vec!["free Some(\"doomed\")".to_owned()]);
    }

    #[test]
    fn queued_entities_join_after_update_and_are_initialised() {
        let log: Log = Rc::default();
        let mut m = manager();
        let cameras = CameraManager::new(800, 600);
        m.init_all();
        let id = m.queue_object(
            Entity::new()
                .with_tag("late")
                .with_behavior(Recorder { log: log.clone() }),
        );
        assert!(m.get(id).is_none());
        m.update_all(0.016, &cameras);
        assert!(m.get(id).is_some());
        assert_eq!(*log.borrow(), vec!["init Some(\"late\")".to_owned()]);
    }

    #[test]
    fn draw_all_culls_and_submits() {
        let mut renderer =
            Renderer::new(HeadlessBackend::new(800, 600), &EngineConfig::default()).unwrap();
        let mut m = manager();
        let quad = renderer.defaults().quad;
        let material = renderer.defaults().color_material;
        for x in [0.0, 10.0, 5000.0] {
            m.add_object(
                Entity::new()
                    .with_mesh(quad)
                    .with_material(material)
                    .at(x, 0.0)
                    .with_scale(Vec2::splat(20.0)),
            );
        }
        let camera = Camera2D::new(800, 600);
        m.draw_all(&mut renderer, &camera);
        assert_eq!(renderer.render_map().item_count(), 2);
        renderer.flush_draw_commands();
        assert_eq!(renderer.backend().instanced_draw_count(), 1);
    }

    #[test]
    fn collider_outlines_become_debug_lines() {
        let mut renderer =
            Renderer::new(HeadlessBackend::new(800, 600), &EngineConfig::default()).unwrap();
        let mut m = manager();
        m.add_object(Entity::new().with_collider(Collider::circle(4.0)));
        m.add_object(Entity::new().with_collider(Collider::aabb(Vec2::ONE)));
        let camera = Camera2D::new(800, 600);
        m.draw_collider_debug(&mut renderer, &camera, Color::GREEN, 1.0);
        renderer.flush_debug_line_draw_commands();
        assert_eq!(renderer.stats().debug_line_draws, 1);
    }
}
