//! Deferred debug lines.
//!
//! Segments are queued during the frame and grouped by the camera they were
//! queued with and their width. Each group becomes one vertex buffer and one
//! draw. Widths are in world units; every segment is expanded into a quad.

use crate::camera::Camera2D;
use crate::math::{Color, Mat4, Vec2};

use super::vertex::LineVertex;

#[derive(Debug, Clone, PartialEq)]
pub struct LineGroup {
    pub camera: Option<Camera2D>,
    pub width: f32,
    pub vertices: Vec<LineVertex>,
}

impl LineGroup {
    pub fn segment_count(&self) -> usize {
        self.vertices.len() / 6
    }

    /// View-projection for this group. Without a camera lines are in
    /// screen pixels centered on the window.
    pub fn view_proj(&self, surface: Vec2) -> Mat4 {
        match &self.camera {
            Some(camera) => camera.projection_matrix() * camera.view_matrix(),
            None => crate::camera::ortho_for_size(surface),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DebugLineQueue {
    groups: Vec<LineGroup>,
}

impl DebugLineQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, from: Vec2, to: Vec2, camera: Option<&Camera2D>, color: Color, width: f32) {
        let width = if width > 0.0 { width } else { 1.0 };
        let camera = camera.copied();
        let index = match self
            .groups
            .iter()
            .position(|g| g.camera == camera && g.width == width)
        {
            Some(index) => index,
            None => {
                self.groups.push(LineGroup {
                    camera,
                    width,
                    vertices: Vec::new(),
                });
                self.groups.len() - 1
            }
        };
        push_segment(&mut self.groups[index].vertices, from, to, color, width);
    }

    pub fn groups(&self) -> &[LineGroup] {
        &self.groups
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn clear(&mut self) {
        self.groups.clear();
    }
}

fn push_segment(out: &mut Vec<LineVertex>, from: Vec2, to: Vec2, color: Color, width: f32) {
    let direction = (to - from).normalize_or_zero();
    let normal = if direction == Vec2::ZERO {
        Vec2::Y
    } else {
        direction.perp()
    } * (width * 0.5);
    let color = color.to_array();
    let corner = |p: Vec2| LineVertex {
        position: p.to_array(),
        color,
    };
    let (a, b, c, d) = (from + normal, from - normal, to - normal, to + normal);
    out.extend([corner(a), corner(b), corner(c), corner(a), corner(c), corner(d)]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_by_camera_and_width() {
        let mut queue = DebugLineQueue::new();
        let cam = Camera2D::new(800, 600);
        queue.push(Vec2::ZERO, Vec2::X, Some(&cam), Color::RED, 1.0);
        queue.push(Vec2::ZERO, Vec2::Y, Some(&cam), Color::GREEN, 1.0);
        queue.push(Vec2::ZERO, Vec2::Y, Some(&cam), Color::GREEN, 3.0);
        queue.push(Vec2::ZERO, Vec2::Y, None, Color::GREEN, 1.0);
        assert_eq!(queue.groups().len(), 3);
        assert_eq!(queue.groups()[0].segment_count(), 2);
        queue.clear();
        assert!(queue.is_empty());
    }

    #[test]
    fn segments_become_quads_of_the_given_width() {
        let mut queue = DebugLineQueue::new();
        queue.push(Vec2::ZERO, Vec2::new(10.0, 0.0), None, Color::WHITE, 2.0);
        let v = &queue.groups()[0].vertices;
        assert_eq!(v.len(), 6);
        assert_eq!(v[0].position, [0.0, 1.0]);
        assert_eq!(v[1].position, [0.0, -1.0]);
        assert_eq!(v[2].position, [10.0, -1.0]);
        assert_eq!(v[5].position, [10.0, 1.0]);
    }

    #[test]
    fn zero_length_segment_still_produces_geometry() {
        let mut queue = DebugLineQueue::new();
        queue.push(Vec2::ONE, Vec2::ONE, None, Color::WHITE, 0.0);
        assert_eq!(queue.groups()[0].width, 1.0);
        assert_eq!(queue.groups()[0].vertices.len(), 6);
    }
}
