//! # Camera — 2D View and Projection
//!
//! A [`Camera2D`] has a world position, a zoom factor and the pixel size of the
//! screen it renders to. It produces two matrices:
//!
//! ```text
//!   view       = scale(zoom) × translate(-position)
//!   projection = ortho(-w/2, w/2, -h/2, h/2, -1, 1)      w, h in pixels
//! ```
//!
//! At zoom 1 one world unit is one pixel and the camera position sits at the
//! center of the screen. Zooming in shrinks the visible area: the region of the
//! world the camera sees is `screen_size / zoom`, which is what the culler
//! passes to [`Camera2D::is_in_view`] as the viewport.
//!
//! [`CameraManager`] keeps cameras by tag and tracks which one is active.

use std::collections::HashMap;

use crate::math::{Mat4, UVec2, Vec2, Vec3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera2D {
    pub position: Vec2,
    pub zoom: f32,
    pub screen_size: UVec2,
}

impl Camera2D {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            position: Vec2::ZERO,
            zoom: 1.0,
            screen_size: UVec2::new(width, height),
        }
    }

    /// Place the camera (builder pattern).
    pub fn at(mut self, position: Vec2) -> Self {
        self.position = position;
        self
    }

    /// Set the zoom (builder pattern).
    pub fn with_zoom(mut self, zoom: f32) -> Self {
        self.set_zoom(zoom);
        self
    }

    pub fn add_position(&mut self, delta: Vec2) {
        self.position += delta;
    }

    /// Set the zoom factor. Non-positive values are ignored.
    pub fn set_zoom(&mut self, zoom: f32) {
        if zoom > 0.0 {
            self.zoom = zoom;
        } else {
            log::warn!("Ignoring non-positive camera zoom {zoom}");
        }
    }

    pub fn set_screen_size(&mut self, width: u32, height: u32) {
        self.screen_size = UVec2::new(width, height);
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_scale(Vec3::new(self.zoom, self.zoom, 1.0))
            * Mat4::from_translation(-self.position.extend(0.0))
    }

    pub fn projection_matrix(&self) -> Mat4 {
        ortho_for_size(self.screen_size.as_vec2())
    }

    /// World-space extent visible through this camera.
    pub fn viewport(&self) -> Vec2 {
        self.screen_size.as_vec2() / self.zoom
    }

    /// Coarse test: does the circle at `pos` with `radius` touch the
    /// `viewport`-sized rectangle centered on the camera?
    pub fn is_in_view(&self, pos: Vec2, radius: f32, viewport: Vec2) -> bool {
        let half = viewport * 0.5;
        !(pos.x + radius < self.position.x - half.x
            || pos.x - radius > self.position.x + half.x
            || pos.y + radius < self.position.y - half.y
            || pos.y - radius > self.position.y + half.y)
    }
}

impl Default for Camera2D {
    fn default() -> Self {
        Self::new(800, 600)
    }
}

/// Orthographic projection centered at the origin, one unit per pixel.
pub fn ortho_for_size(size: Vec2) -> Mat4 {
    let half = size * 0.5;
    Mat4::orthographic_rh(-half.x, half.x, -half.y, half.y, -1.0, 1.0)
}

/// Handle to a camera in the [`CameraManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CameraId(pub(crate) usize);

/// Cameras stored by tag plus the active one.
///
/// Starts with a `"main"` camera that is active.
#[derive(Debug)]
pub struct CameraManager {
    cameras: Vec<Camera2D>,
    tags: HashMap<String, CameraId>,
    active: CameraId,
}

impl CameraManager {
    pub const MAIN: &'static str = "main";

    pub fn new(width: u32, height: u32) -> Self {
        let mut tags = HashMap::new();
        tags.insert(Self::MAIN.to_owned(), CameraId(0));
        Self {
            cameras: vec![Camera2D::new(width, height)],
            tags,
            active: CameraId(0),
        }
    }

    /// Register `camera` under `tag`. An existing tag keeps its id and gets
    /// the new camera.
    pub fn register(&mut self, tag: &str, camera: Camera2D) -> CameraId {
        if let Some(&id) = self.tags.get(tag) {
            log::debug!("Replacing camera '{tag}'");
            self.cameras[id.0] = camera;
            return id;
        }
        let id = CameraId(self.cameras.len());
        self.cameras.push(camera);
        self.tags.insert(tag.to_owned(), id);
        id
    }

    pub fn id(&self, tag: &str) -> Option<CameraId> {
        self.tags.get(tag).copied()
    }

    pub fn get(&self, id: CameraId) -> Option<&Camera2D> {
        self.cameras.get(id.0)
    }

    pub fn get_mut(&mut self, id: CameraId) -> Option<&mut Camera2D> {
        self.cameras.get_mut(id.0)
    }

    pub fn by_tag(&self, tag: &str) -> Option<&Camera2D> {
        self.id(tag).and_then(|id| self.get(id))
    }

    pub fn by_tag_mut(&mut self, tag: &str) -> Option<&mut Camera2D> {
        let id = self.id(tag)?;
        self.get_mut(id)
    }

    /// Make `tag` the active camera. Unknown tags leave the active camera unchanged.
    pub fn set_active(&mut self, tag: &str) -> bool {
        match self.id(tag) {
            Some(id) => {
                self.active = id;
                true
            }
            None => {
                log::warn!("Cannot activate unknown camera '{tag}'");
                false
            }
        }
    }

    pub fn active_id(&self) -> CameraId {
        self.active
    }

    pub fn active(&self) -> &Camera2D {
        &self.cameras[self.active.0]
    }

    pub fn active_mut(&mut self) -> &mut Camera2D {
        &mut self.cameras[self.active.0]
    }

    pub fn set_screen_size_all(&mut self, width: u32, height: u32) {
        for camera in &mut self.cameras {
            camera.set_screen_size(width, height);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_projection_maps_camera_edges_to_clip_edges() {
        let camera = Camera2D::new(800, 600).at(Vec2::new(100.0, 50.0)).with_zoom(2.0);
        let vp = camera.projection_matrix() * camera.view_matrix();
        // visible half-extent is 400 / 2 = 200 world units on x
        let right = vp.transform_point3(Vec3::new(300.0, 50.0, 0.0));
        assert!((right.x - 1.0).abs() < 1e-5);
        let center = vp.transform_point3(Vec3::new(100.0, 50.0, 0.0));
        assert!(center.x.abs() < 1e-5 && center.y.abs() < 1e-5);
    }

    #[test]
    fn viewport_shrinks_with_zoom() {
        let camera = Camera2D::new(800, 600).with_zoom(2.0);
        assert_eq!(camera.viewport(), Vec2::new(400.0, 300.0));
    }

    #[test]
    fn in_view_accepts_partial_overlap() {
        let camera = Camera2D::new(100, 100);
        let viewport = camera.viewport();
        assert!(camera.is_in_view(Vec2::ZERO, 1.0, viewport));
        assert!(camera.is_in_view(Vec2::new(55.0, 0.0), 6.0, viewport));
        assert!(!camera.is_in_view(Vec2::new(57.0, 0.0), 6.0, viewport));
        assert!(!camera.is_in_view(Vec2::new(0.0, -80.0), 10.0, viewport));
    }

    #[test]
    fn manager_starts_with_active_main_camera() {
        let cameras = CameraManager::new(640, 480);
        assert_eq!(cameras.id(CameraManager::MAIN), Some(cameras.active_id()));
        assert_eq!(cameras.active().screen_size, UVec2::new(640, 480));
    }

    #[test]
    fn register_replaces_and_unknown_activation_is_ignored() {
        let mut cameras = CameraManager::new(640, 480);
        let id = cameras.register("ui", Camera2D::new(10, 10));
        let again = cameras.register("ui", Camera2D::new(20, 20));
        assert_eq!(id, again);
        assert_eq!(cameras.get(id).map(|c| c.screen_size.x), Some(20));

        assert!(!cameras.set_active("missing"));
        assert_eq!(cameras.active_id(), cameras.id("main").unwrap());
        assert!(cameras.set_active("ui"));
        assert_eq!(cameras.active_id(), id);
    }

    #[test]
    fn screen_size_propagates_to_all() {
        let mut cameras = CameraManager::new(1, 1);
        cameras.register("other", Camera2D::new(5, 5));
        cameras.set_screen_size_all(1280, 720);
        assert_eq!(cameras.by_tag("other").unwrap().screen_size, UVec2::new(1280, 720));
        assert_eq!(cameras.active().screen_size, UVec2::new(1280, 720));
    }
}
