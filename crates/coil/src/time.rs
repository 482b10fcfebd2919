//! Frame timing.

use std::time::{Duration, Instant};

/// Updated by the window runner at the start of every frame.
#[derive(Debug, Clone, Copy)]
pub struct Time {
    startup: Instant,
    frame_start: Instant,
    delta: Duration,
    frame_count: u64,
}

impl Time {
    pub(crate) fn new() -> Self {
        let now = Instant::now();
        Self {
            startup: now,
            frame_start: now,
            delta: Duration::ZERO,
            frame_count: 0,
        }
    }

    pub(crate) fn tick(&mut self) {
        let now = Instant::now();
        self.delta = now - self.frame_start;
        self.frame_start = now;
        self.frame_count += 1;
    }

    /// Seconds since the previous frame.
    pub fn delta_secs(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    pub fn elapsed_secs(&self) -> f32 {
        (self.frame_start - self.startup).as_secs_f32()
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn fps(&self) -> f32 {
        let dt = self.delta.as_secs_f32();
        if dt > 0.0 { 1.0 / dt } else { 0.0 }
    }
}
