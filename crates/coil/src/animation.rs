//! # Animation — Sprite Sheets and Frame Playback
//!
//! A sprite sheet is a single texture holding a grid of equally sized frames.
//! [`SpriteSheet`] describes that grid plus a set of named [`AnimationClip`]s;
//! [`SpriteAnimator`] is attached to an entity and advances through a clip.
//!
//! ```text
//!  ┌────┬────┬────┬────┐
//!  │ 0  │ 1  │ 2  │ 3  │   4-column, 2-row sprite sheet
//!  ├────┼────┼────┼────┤   frame index = row * columns + column
//!  │ 4  │ 5  │ 6  │ 7  │   row 0 is the top of the image
//!  └────┴────┴────┴────┘
//! ```
//!
//! Texture V runs bottom-up in the quad mesh, so the frame's row is flipped
//! when computing its UV offset. The renderer reads `uv_offset` / `uv_scale`
//! from the animator and feeds them to the shader, either per instance or per
//! draw.

use std::collections::HashMap;

use crate::math::{UVec2, Vec2};
use crate::render::assets::{SpriteSheetHandle, TextureHandle};

/// A sequence of frames with playback settings.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    /// Frame indices into the sprite sheet (row-major order).
    pub frames: Vec<u32>,
    /// Seconds per frame.
    pub frame_time: f32,
    /// Whether to wrap around when the last frame is reached.
    pub looping: bool,
}

impl AnimationClip {
    /// Play frames `first..=last` sequentially.
    pub fn from_range(first: u32, last: u32, frame_time: f32) -> Self {
        Self {
            frames: (first..=last).collect(),
            frame_time,
            looping: false,
        }
    }

    /// Enable looping (builder pattern).
    pub fn looping(mut self) -> Self {
        self.looping = true;
        self
    }
}

/// Grid geometry of a sheet. Copied into animators so they can compute UVs
/// without a registry lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SheetLayout {
    pub frame_size: UVec2,
    pub texture_size: UVec2,
    pub columns: u32,
    pub rows: u32,
}

impl SheetLayout {
    pub fn new(texture_size: UVec2, frame_size: UVec2) -> Self {
        let frame_size = frame_size.max(UVec2::ONE);
        Self {
            frame_size,
            texture_size,
            columns: (texture_size.x / frame_size.x).max(1),
            rows: (texture_size.y / frame_size.y).max(1),
        }
    }

    pub fn frame_count(&self) -> u32 {
        self.columns * self.rows
    }

    /// Bottom-left UV of `frame`, with rows counted from the top of the image.
    pub fn uv_offset(&self, frame: u32) -> Vec2 {
        let col = frame % self.columns;
        let row = (frame / self.columns).min(self.rows - 1);
        let flipped_row = self.rows - 1 - row;
        Vec2::new(
            (col * self.frame_size.x) as f32 / self.texture_size.x as f32,
            (flipped_row * self.frame_size.y) as f32 / self.texture_size.y as f32,
        )
    }

    /// Size of one frame in UV units.
    pub fn uv_scale(&self) -> Vec2 {
        self.frame_size.as_vec2() / self.texture_size.as_vec2()
    }
}

/// A uniform grid of frames on one texture, with named clips.
#[derive(Debug, Clone)]
pub struct SpriteSheet {
    pub texture: TextureHandle,
    pub layout: SheetLayout,
    clips: HashMap<String, AnimationClip>,
}

impl SpriteSheet {
    pub fn new(texture: TextureHandle, texture_size: UVec2, frame_size: UVec2) -> Self {
        Self {
            texture,
            layout: SheetLayout::new(texture_size, frame_size),
            clips: HashMap::new(),
        }
    }

    pub fn frame_count(&self) -> u32 {
        self.layout.frame_count()
    }

    /// Add or replace a named clip.
    pub fn add_clip(&mut self, name: &str, clip: AnimationClip) {
        self.clips.insert(name.to_owned(), clip);
    }

    /// Add a clip (builder pattern).
    pub fn with_clip(mut self, name: &str, clip: AnimationClip) -> Self {
        self.add_clip(name, clip);
        self
    }

    pub fn clip(&self, name: &str) -> Option<&AnimationClip> {
        self.clips.get(name)
    }
}

/// Drives frame playback for one entity.
#[derive(Debug, Clone)]
pub struct SpriteAnimator {
    pub sheet: SpriteSheetHandle,
    layout: SheetLayout,
    clip: AnimationClip,
    /// Accumulated time within the current frame.
    timer: f32,
    /// Index into `clip.frames`.
    current_index: usize,
    finished: bool,
    /// Playback speed multiplier (1.0 = normal).
    pub speed: f32,
}

impl SpriteAnimator {
    /// Create an animator that loops over every frame of the sheet.
    pub fn new(handle: SpriteSheetHandle, sheet: &SpriteSheet, frame_time: f32) -> Self {
        let last = sheet.frame_count().saturating_sub(1);
        Self {
            sheet: handle,
            layout: sheet.layout,
            clip: AnimationClip::from_range(0, last, frame_time).looping(),
            timer: 0.0,
            current_index: 0,
            finished: false,
            speed: 1.0,
        }
    }

    /// Set playback speed multiplier (builder pattern).
    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    /// Play frames `start..=end` from the beginning.
    pub fn play(&mut self, start: u32, end: u32, frame_time: f32, looping: bool) {
        let mut clip = AnimationClip::from_range(start, end.max(start), frame_time);
        clip.looping = looping;
        self.play_clip(clip);
    }

    /// Replace the current clip and reset playback.
    pub fn play_clip(&mut self, clip: AnimationClip) {
        self.clip = clip;
        self.timer = 0.0;
        self.current_index = 0;
        self.finished = false;
    }

    /// Play a clip registered on `sheet`. Returns `false` if no clip has that name.
    pub fn play_named(&mut self, sheet: &SpriteSheet, name: &str) -> bool {
        match sheet.clip(name) {
            Some(clip) => {
                self.play_clip(clip.clone());
                true
            }
            None => {
                log::warn!("Sprite sheet has no clip named '{name}'");
                false
            }
        }
    }

    /// Jump to a position within the current clip.
    pub fn set_frame_index(&mut self, index: usize) {
        if !self.clip.frames.is_empty() {
            self.current_index = index.min(self.clip.frames.len() - 1);
            self.timer = 0.0;
        }
    }

    /// Sheet frame currently shown.
    pub fn current_frame(&self) -> u32 {
        self.clip.frames.get(self.current_index).copied().unwrap_or(0)
    }

    /// `true` once a non-looping clip reached its last frame.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn clip(&self) -> &AnimationClip {
        &self.clip
    }

    /// Advance playback by `dt` seconds.
    pub fn update(&mut self, dt: f32) {
        if self.finished || self.clip.frames.is_empty() || self.clip.frame_time <= 0.0 {
            return;
        }

        self.timer += dt * self.speed;

        while self.timer >= self.clip.frame_time {
            self.timer -= self.clip.frame_time;
            self.current_index += 1;

            if self.current_index >= self.clip.frames.len() {
                if self.clip.looping {
                    self.current_index = 0;
                } else {
                    self.current_index = self.clip.frames.len() - 1;
                    self.finished = true;
                    break;
                }
            }
        }
    }

    pub fn uv_offset(&self) -> Vec2 {
        self.layout.uv_offset(self.current_frame())
    }

    pub fn uv_scale(&self) -> Vec2 {
        self.layout.uv_scale()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet() -> SpriteSheet {
        SpriteSheet::new(TextureHandle(1), UVec2::new(128, 64), UVec2::new(32, 32))
    }

    #[test]
    fn layout_counts_frames() {
        let s = sheet();
        assert_eq!(s.layout.columns, 4);
        assert_eq!(s.layout.rows, 2);
        assert_eq!(s.frame_count(), 8);
    }

    #[test]
    fn uv_offset_flips_rows() {
        let s = sheet();
        // frame 0 is top-left in the image, which is the upper half in UV space
        assert_eq!(s.layout.uv_offset(0), Vec2::new(0.0, 0.5));
        assert_eq!(s.layout.uv_offset(5), Vec2::new(0.25, 0.0));
        assert_eq!(s.layout.uv_scale(), Vec2::new(0.25, 0.5));
    }

    #[test]
    fn looping_clip_wraps() {
        let s = sheet();
        let mut anim = SpriteAnimator::new(SpriteSheetHandle(0), &s, 0.1);
        anim.play(2, 4, 0.1, true);
        anim.update(0.25);
        assert_eq!(anim.current_frame(), 4);
        anim.update(0.1);
        assert_eq!(anim.current_frame(), 2);
        assert!(!anim.is_finished());
    }

    #[test]
    fn one_shot_clip_clamps_and_finishes() {
        let s = sheet();
        let mut anim = SpriteAnimator::new(SpriteSheetHandle(0), &s, 0.1);
        anim.play(0, 2, 0.1, false);
        anim.update(1.0);
        assert_eq!(anim.current_frame(), 2);
        assert!(anim.is_finished());
        anim.update(1.0);
        assert_eq!(anim.current_frame(), 2);
    }

    #[test]
    fn named_clip_lookup() {
        let s = sheet().with_clip("walk", AnimationClip::from_range(4, 7, 0.05).looping());
        let mut anim = SpriteAnimator::new(SpriteSheetHandle(0), &s, 0.1);
        assert!(anim.play_named(&s, "walk"));
        assert_eq!(anim.current_frame(), 4);
        assert!(!anim.play_named(&s, "run"));
        assert_eq!(anim.current_frame(), 4);
    }
}
