//! Math types and glam re-exports.
//!
//! [`Transform2D`] holds position, rotation and scale for a 2D entity and
//! caches its model matrix behind a dirty flag. [`Color`] is the RGBA tint
//! type shared by entities, materials, and debug lines.

use std::cell::Cell;

use serde::{Deserialize, Serialize};

pub use glam::{IVec2, Mat4, UVec2, Vec2, Vec3, Vec4};

/// A 2D transform: position, rotation (radians about Z) and non-uniform scale.
///
/// The model matrix `T × R(z) × S` is computed on first read and cached until
/// a setter is called. Recomputing is a pure function of the stored fields, so
/// reading it any number of times is safe.
#[derive(Debug, Clone)]
pub struct Transform2D {
    position: Vec2,
    rotation: f32,
    scale: Vec2,
    cached: Cell<Option<Mat4>>,
}

impl Transform2D {
    /// Origin, no rotation, unit scale.
    pub fn new() -> Self {
        Self {
            position: Vec2::ZERO,
            rotation: 0.0,
            scale: Vec2::ONE,
            cached: Cell::new(None),
        }
    }

    /// Create a transform at the given position.
    pub fn from_xy(x: f32, y: f32) -> Self {
        let mut t = Self::new();
        t.position = Vec2::new(x, y);
        t
    }

    /// Return a copy with the given scale (builder pattern).
    pub fn with_scale(mut self, scale: Vec2) -> Self {
        self.set_scale(scale);
        self
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    pub fn scale(&self) -> Vec2 {
        self.scale
    }

    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
        self.cached.set(None);
    }

    pub fn add_position(&mut self, delta: Vec2) {
        self.set_position(self.position + delta);
    }

    pub fn set_rotation(&mut self, radians: f32) {
        self.rotation = radians;
        self.cached.set(None);
    }

    pub fn add_rotation(&mut self, radians: f32) {
        self.set_rotation(self.rotation + radians);
    }

    pub fn set_scale(&mut self, scale: Vec2) {
        self.scale = scale;
        self.cached.set(None);
    }

    pub fn add_scale(&mut self, delta: Vec2) {
        self.set_scale(self.scale + delta);
    }

    /// Returns `true` if the next [`matrix`](Self::matrix) call will recompute.
    pub fn is_dirty(&self) -> bool {
        self.cached.get().is_none()
    }

    /// The 4x4 model matrix, recomputed only after a setter ran.
    pub fn matrix(&self) -> Mat4 {
        if let Some(m) = self.cached.get() {
            return m;
        }
        let m = Mat4::from_translation(self.position.extend(0.0))
            * Mat4::from_rotation_z(self.rotation)
            * Mat4::from_scale(self.scale.extend(1.0));
        self.cached.set(Some(m));
        m
    }
}

impl Default for Transform2D {
    fn default() -> Self {
        Self::new()
    }
}

/// An RGBA color with floating-point components in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Self = Self::rgba(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Self = Self::rgba(0.0, 0.0, 0.0, 1.0);
    pub const RED: Self = Self::rgba(1.0, 0.0, 0.0, 1.0);
    pub const GREEN: Self = Self::rgba(0.0, 1.0, 0.0, 1.0);
    pub const BLUE: Self = Self::rgba(0.0, 0.0, 1.0, 1.0);
    pub const YELLOW: Self = Self::rgba(1.0, 1.0, 0.0, 1.0);

    /// Create a color from RGB (alpha = 1).
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix_is_cached_until_setter() {
        let mut t = Transform2D::from_xy(3.0, 4.0);
        assert!(t.is_dirty());
        let first = t.matrix();
        assert!(!t.is_dirty());
        assert_eq!(first, t.matrix());

        t.set_rotation(1.0);
        assert!(t.is_dirty());
        assert_ne!(first, t.matrix());
    }

    #[test]
    fn matrix_applies_scale_then_rotation_then_translation() {
        let mut t = Transform2D::from_xy(10.0, 0.0).with_scale(Vec2::new(2.0, 1.0));
        t.set_rotation(std::f32::consts::FRAC_PI_2);
        let p = t.matrix().transform_point3(Vec3::new(1.0, 0.0, 0.0));
        assert!((p.x - 10.0).abs() < 1e-5);
        assert!((p.y - 2.0).abs() < 1e-5);
    }

    #[test]
    fn recompute_is_idempotent() {
        let t = Transform2D::from_xy(-2.0, 7.5).with_scale(Vec2::splat(3.0));
        let a = t.matrix();
        let b = t.clone().matrix();
        assert_eq!(a, b);
    }
}
