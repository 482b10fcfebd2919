//! Visibility culling: bounding circle against the camera's view rectangle.
//!
//! Coarse on purpose. An entity whose circle grazes the view is kept even if
//! its actual shape is just outside; nothing visible is ever dropped.

use crate::camera::Camera2D;
use crate::math::Vec2;
use crate::object::Entity;

use super::assets::RenderAssets;

/// Fill `out` with the entities of `candidates` that may be visible through
/// `camera`, in their original order. `out` is cleared first.
///
/// Camera-ignoring entities are screen-space and always kept.
pub fn cull_visible<'a>(
    camera: &Camera2D,
    candidates: &[&'a Entity],
    viewport: Vec2,
    assets: &RenderAssets,
    out: &mut Vec<&'a Entity>,
) {
    out.clear();
    out.extend(candidates.iter().copied().filter(|entity| {
        if !entity.is_alive() || !entity.visible {
            return false;
        }
        entity.ignores_camera()
            || camera.is_in_view(entity.world_position(), entity.bounding_radius(assets), viewport)
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_order_and_drops_offscreen() {
        let assets = RenderAssets::new();
        let camera = Camera2D::new(200, 100);
        let a = Entity::new().with_tag("a").at(0.0, 0.0);
        let far = Entity::new().with_tag("far").at(500.0, 0.0);
        let b = Entity::new().with_tag("b").at(-90.0, 40.0);
        let mut out = Vec::new();
        cull_visible(&camera, &[&a, &far, &b], camera.viewport(), &assets, &mut out);
        let tags: Vec<_> = out.iter().map(|e| e.tag.as_deref().unwrap()).collect();
        assert_eq!(tags, ["a", "b"]);
    }

    #[test]
    fn edge_overlap_counts_as_visible() {
        let assets = RenderAssets::new();
        let camera = Camera2D::new(200, 100);
        // unit quad scaled to 20: radius ~14.1, center just outside the right edge
        let grazing = Entity::new().at(110.0, 0.0).with_scale(Vec2::splat(20.0));
        let mut out = Vec::new();
        cull_visible(&camera, &[&grazing], camera.viewport(), &assets, &mut out);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn zoom_shrinks_the_view() {
        let assets = RenderAssets::new();
        let camera = Camera2D::new(200, 100).with_zoom(2.0);
        let e = Entity::new().at(80.0, 0.0);
        let mut out = Vec::new();
        cull_visible(&camera, &[&e], camera.viewport(), &assets, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn screen_space_entities_skip_the_test_but_not_visibility() {
        let assets = RenderAssets::new();
        let camera = Camera2D::new(200, 100);
        let mut hud = Entity::new().at(5000.0, 5000.0);
        hud.set_ignore_camera(true, None);
        let mut hidden_hud = Entity::new();
        hidden_hud.set_ignore_camera(true, None);
        hidden_hud.visible = false;
        let mut out = vec![&hidden_hud];
        cull_visible(&camera, &[&hud, &hidden_hud], camera.viewport(), &assets, &mut out);
        assert_eq!(out.len(), 1);
        assert!(std::ptr::eq(out[0], &hud));
    }
}
