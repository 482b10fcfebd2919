//! Keyboard and mouse input state.
//!
//! [`Input`] is filled by the window runner from winit events and cleared of
//! its per-frame edges after every frame.

use std::collections::HashSet;
use std::hash::Hash;

pub use winit::event::MouseButton;
pub use winit::keyboard::KeyCode;

use crate::math::Vec2;

/// Held / pressed-this-frame / released-this-frame sets for one device.
#[derive(Debug, Clone)]
pub struct ButtonState<T: Eq + Hash + Copy> {
    held: HashSet<T>,
    pressed: HashSet<T>,
    released: HashSet<T>,
}

impl<T: Eq + Hash + Copy> ButtonState<T> {
    pub fn new() -> Self {
        Self {
            held: HashSet::new(),
            pressed: HashSet::new(),
            released: HashSet::new(),
        }
    }

    /// Down right now.
    pub fn held(&self, button: T) -> bool {
        self.held.contains(&button)
    }

    /// Went down this frame.
    pub fn pressed(&self, button: T) -> bool {
        self.pressed.contains(&button)
    }

    /// Went up this frame.
    pub fn released(&self, button: T) -> bool {
        self.released.contains(&button)
    }

    pub(crate) fn press(&mut self, button: T) {
        // key repeat must not re-trigger the edge
        if self.held.insert(button) {
            self.pressed.insert(button);
        }
    }

    pub(crate) fn release(&mut self, button: T) {
        if self.held.remove(&button) {
            self.released.insert(button);
        }
    }

    pub(crate) fn clear_edges(&mut self) {
        self.pressed.clear();
        self.released.clear();
    }
}

impl<T: Eq + Hash + Copy> Default for ButtonState<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Input {
    pub(crate) keys: ButtonState<KeyCode>,
    pub(crate) mouse: ButtonState<MouseButton>,
    cursor: Vec2,
}

impl Input {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key_held(&self, key: KeyCode) -> bool {
        self.keys.held(key)
    }

    pub fn key_pressed(&self, key: KeyCode) -> bool {
        self.keys.pressed(key)
    }

    pub fn key_released(&self, key: KeyCode) -> bool {
        self.keys.released(key)
    }

    pub fn mouse_held(&self, button: MouseButton) -> bool {
        self.mouse.held(button)
    }

    pub fn mouse_pressed(&self, button: MouseButton) -> bool {
        self.mouse.pressed(button)
    }

    pub fn mouse_released(&self, button: MouseButton) -> bool {
        self.mouse.released(button)
    }

    /// Cursor position in window pixels, origin top-left.
    pub fn cursor(&self) -> Vec2 {
        self.cursor
    }

    /// Cursor position relative to the window center with Y up, the space
    /// camera-less draws use.
    pub fn cursor_centered(&self, window_size: Vec2) -> Vec2 {
        Vec2::new(
            self.cursor.x - window_size.x * 0.5,
            window_size.y * 0.5 - self.cursor.y,
        )
    }

    pub(crate) fn set_cursor(&mut self, position: Vec2) {
        self.cursor = position;
    }

    /// Forget this frame's edges. Held state carries over.
    pub(crate) fn end_frame(&mut self) {
        self.keys.clear_edges();
        self.mouse.clear_edges();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_is_an_edge_and_hold_persists() {
        let mut input = Input::new();
        input.keys.press(KeyCode::Space);
        assert!(input.key_pressed(KeyCode::Space));
        assert!(input.key_held(KeyCode::Space));

        input.end_frame();
        assert!(!input.key_pressed(KeyCode::Space));
        assert!(input.key_held(KeyCode::Space));

        // repeat events while held
        input.keys.press(KeyCode::Space);
        assert!(!input.key_pressed(KeyCode::Space));

        input.keys.release(KeyCode::Space);
        assert!(input.key_released(KeyCode::Space));
        assert!(!input.key_held(KeyCode::Space));
    }

    #[test]
    fn release_without_press_is_ignored() {
        let mut input = Input::new();
        input.mouse.release(MouseButton::Left);
        assert!(!input.mouse_released(MouseButton::Left));
    }

    #[test]
    fn centered_cursor_has_y_up() {
        let mut input = Input::new();
        input.set_cursor(Vec2::new(0.0, 0.0));
        assert_eq!(input.cursor_centered(Vec2::new(800.0, 600.0)), Vec2::new(-400.0, 300.0));
    }
}
