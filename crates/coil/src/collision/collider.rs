//! Narrow-phase collider shapes.
//!
//! Shapes are a closed enum and every pair test goes through one `match` on
//! `(a, b)`. Box-vs-circle reuses circle-vs-box with the arguments swapped, so
//! `a.check_collision(&b) == b.check_collision(&a)` holds for every pair.
//!
//! ```text
//!              Circle            Aabb
//!   Circle   circle_circle    circle_aabb
//!   Aabb     circle_aabb ⇄    aabb_aabb
//! ```

use crate::math::Vec2;

/// Shape dimensions, either as authored or after scaling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColliderShape {
    Circle { radius: f32 },
    Aabb { half_size: Vec2 },
}

impl ColliderShape {
    fn scaled(self, scale: Vec2) -> Self {
        match self {
            ColliderShape::Circle { radius } => ColliderShape::Circle {
                radius: radius * scale.x.abs().max(scale.y.abs()),
            },
            ColliderShape::Aabb { half_size } => ColliderShape::Aabb {
                half_size: half_size * scale.abs(),
            },
        }
    }
}

/// A collider owned by one entity.
///
/// `position` is normally copied from the owner's world position once per
/// frame by the object manager.
#[derive(Debug, Clone, PartialEq)]
pub struct Collider {
    base: ColliderShape,
    scaled: ColliderShape,
    position: Vec2,
    use_transform_scale: bool,
}

impl Collider {
    pub fn circle(radius: f32) -> Self {
        Self::from_shape(ColliderShape::Circle { radius })
    }

    pub fn aabb(half_size: Vec2) -> Self {
        Self::from_shape(ColliderShape::Aabb { half_size })
    }

    pub fn from_shape(shape: ColliderShape) -> Self {
        Self {
            base: shape,
            scaled: shape,
            position: Vec2::ZERO,
            use_transform_scale: true,
        }
    }

    /// Set whether the owner's scale multiplies the base dimensions (builder pattern).
    pub fn use_transform_scale(mut self, enabled: bool) -> Self {
        self.use_transform_scale = enabled;
        if !enabled {
            self.scaled = self.base;
        }
        self
    }

    /// Place the collider (builder pattern).
    pub fn at(mut self, position: Vec2) -> Self {
        self.position = position;
        self
    }

    pub fn uses_transform_scale(&self) -> bool {
        self.use_transform_scale
    }

    /// Dimensions as authored.
    pub fn base_shape(&self) -> ColliderShape {
        self.base
    }

    /// Dimensions used by the collision tests.
    pub fn shape(&self) -> ColliderShape {
        self.scaled
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    /// Replace the base dimensions, keeping the current scale factor unapplied
    /// until the next sync.
    pub fn set_shape(&mut self, shape: ColliderShape) {
        self.base = shape;
        self.scaled = shape;
    }

    /// Recompute the scaled dimensions from the owner's scale. No-op when
    /// transform scaling is disabled.
    pub fn sync_with_transform_scale(&mut self, scale: Vec2) {
        if self.use_transform_scale {
            self.scaled = self.base.scaled(scale);
        }
    }

    /// Radius of a circle enclosing the shape.
    pub fn bounding_radius(&self) -> f32 {
        match self.scaled {
            ColliderShape::Circle { radius } => radius,
            ColliderShape::Aabb { half_size } => half_size.length(),
        }
    }

    pub fn check_point_collision(&self, point: Vec2) -> bool {
        match self.scaled {
            ColliderShape::Circle { radius } => {
                self.position.distance_squared(point) <= radius * radius
            }
            ColliderShape::Aabb { half_size } => {
                let d = (point - self.position).abs();
                d.x <= half_size.x && d.y <= half_size.y
            }
        }
    }

    pub fn check_collision(&self, other: &Collider) -> bool {
        use ColliderShape::{Aabb, Circle};
        match (self.scaled, other.scaled) {
            (Circle { radius: ra }, Circle { radius: rb }) => {
                circle_circle(self.position, ra, other.position, rb)
            }
            (Circle { radius }, Aabb { half_size }) => {
                circle_aabb(self.position, radius, other.position, half_size)
            }
            (Aabb { half_size }, Circle { radius }) => {
                circle_aabb(other.position, radius, self.position, half_size)
            }
            (Aabb { half_size: ha }, Aabb { half_size: hb }) => {
                aabb_aabb(self.position, ha, other.position, hb)
            }
        }
    }

    /// Outline as line segments in world space: `segments` edges for a
    /// circle, four edges for a box.
    pub fn debug_segments(&self, segments: u32) -> Vec<(Vec2, Vec2)> {
        match self.scaled {
            ColliderShape::Circle { radius } => {
                let segments = segments.max(3);
                let step = std::f32::consts::TAU / segments as f32;
                (0..segments)
                    .map(|i| {
                        let a = i as f32 * step;
                        let b = (i + 1) as f32 * step;
                        (
                            self.position + Vec2::new(a.cos(), a.sin()) * radius,
                            self.position + Vec2::new(b.cos(), b.sin()) * radius,
                        )
                    })
                    .collect()
            }
            ColliderShape::Aabb { half_size } => {
                let p = self.position;
                let corners = [
                    p + Vec2::new(-half_size.x, -half_size.y),
                    p + Vec2::new(half_size.x, -half_size.y),
                    p + Vec2::new(half_size.x, half_size.y),
                    p + Vec2::new(-half_size.x, half_size.y),
                ];
                (0..4).map(|i| (corners[i], corners[(i + 1) % 4])).collect()
            }
        }
    }
}

fn circle_circle(ca: Vec2, ra: f32, cb: Vec2, rb: f32) -> bool {
    let r = ra + rb;
    ca.distance_squared(cb) <= r * r
}

fn circle_aabb(center: Vec2, radius: f32, box_center: Vec2, half_size: Vec2) -> bool {
    let closest = center.clamp(box_center - half_size, box_center + half_size);
    center.distance_squared(closest) <= radius * radius
}

fn aabb_aabb(ca: Vec2, ha: Vec2, cb: Vec2, hb: Vec2) -> bool {
    let d = (ca - cb).abs();
    d.x <= ha.x + hb.x && d.y <= ha.y + hb.y
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circle_circle_concrete_cases() {
        let a = Collider::circle(5.0);
        let b = Collider::circle(4.0).at(Vec2::new(8.0, 0.0));
        assert!(a.check_collision(&b));
        let b = Collider::circle(4.0).at(Vec2::new(10.0, 0.0));
        assert!(!a.check_collision(&b));
    }

    #[test]
    fn aabb_overlap_concrete_cases() {
        let a = Collider::aabb(Vec2::ONE);
        let b = Collider::aabb(Vec2::ONE).at(Vec2::new(1.5, 0.0));
        assert!(a.check_collision(&b));
        let b = Collider::aabb(Vec2::ONE).at(Vec2::new(2.5, 0.0));
        assert!(!a.check_collision(&b));
    }

    #[test]
    fn aabb_overlap_needs_both_axes() {
        let a = Collider::aabb(Vec2::ONE);
        let b = Collider::aabb(Vec2::ONE).at(Vec2::new(1.0, 3.0));
        assert!(!a.check_collision(&b));
    }

    #[test]
    fn circle_box_uses_closest_point() {
        let circle = Collider::circle(1.0).at(Vec2::new(2.5, 2.5));
        let square = Collider::aabb(Vec2::splat(2.0));
        // closest corner is (2, 2), about 0.707 away
        assert!(circle.check_collision(&square));
        let circle = Collider::circle(0.5).at(Vec2::new(2.5, 2.5));
        assert!(!circle.check_collision(&square));
    }

    #[test]
    fn every_pair_is_symmetric() {
        let colliders = [
            Collider::circle(1.0),
            Collider::circle(2.0).at(Vec2::new(2.5, 0.5)),
            Collider::circle(0.3).at(Vec2::new(-4.0, 4.0)),
            Collider::aabb(Vec2::new(1.0, 0.5)).at(Vec2::new(1.8, 0.0)),
            Collider::aabb(Vec2::new(0.5, 3.0)).at(Vec2::new(-3.9, 2.0)),
            Collider::aabb(Vec2::ONE).at(Vec2::new(10.0, 10.0)),
        ];
        for a in &colliders {
            for b in &colliders {
                assert_eq!(a.check_collision(b), b.check_collision(a));
            }
        }
    }

    #[test]
    fn scale_sync_uses_largest_axis_for_circles() {
        let mut c = Collider::circle(2.0);
        c.sync_with_transform_scale(Vec2::new(-3.0, 1.5));
        assert_eq!(c.shape(), ColliderShape::Circle { radius: 6.0 });
        assert_eq!(c.base_shape(), ColliderShape::Circle { radius: 2.0 });
    }

    #[test]
    fn scale_sync_is_skipped_when_disabled() {
        let mut b = Collider::aabb(Vec2::new(1.0, 2.0)).use_transform_scale(false);
        b.sync_with_transform_scale(Vec2::splat(10.0));
        assert_eq!(b.shape(), ColliderShape::Aabb { half_size: Vec2::new(1.0, 2.0) });
    }

    #[test]
    fn bounding_radius_encloses_box() {
        let b = Collider::aabb(Vec2::new(3.0, 4.0));
        assert_eq!(b.bounding_radius(), 5.0);
        assert_eq!(Collider::circle(2.5).bounding_radius(), 2.5);
    }

    #[test]
    fn point_tests() {
        let c = Collider::circle(1.0).at(Vec2::new(5.0, 5.0));
        assert!(c.check_point_collision(Vec2::new(5.5, 5.5)));
        assert!(!c.check_point_collision(Vec2::new(6.0, 6.0)));
        let b = Collider::aabb(Vec2::new(2.0, 1.0));
        assert!(b.check_point_collision(Vec2::new(-2.0, 1.0)));
        assert!(!b.check_point_collision(Vec2::new(0.0, 1.1)));
    }

    #[test]
    fn debug_outline_segment_counts() {
        assert_eq!(Collider::circle(1.0).debug_segments(20).len(), 20);
        let edges = Collider::aabb(Vec2::ONE).debug_segments(20);
        assert_eq!(edges.len(), 4);
        assert_eq!(edges[3].1, edges[0].0);
    }
}
