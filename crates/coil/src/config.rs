//! Engine configuration.
//!
//! [`EngineConfig`] collects the knobs the runtime reads once at startup. It
//! can be built in code with builder methods or deserialized from JSON:
//!
//! ```ignore
//! let config = EngineConfig::from_json_file("assets/engine.json")?
//!     .title("Asteroids");
//! ```
//!
//! Missing JSON fields take their [`Default`] values.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::math::Color;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub vsync: bool,
    pub clear_color: Color,
    /// Side length of a spatial hash cell in world units.
    pub collision_cell_size: f32,
    /// Starting width and height of every glyph atlas, in pixels.
    pub atlas_initial_size: u32,
    /// Empty pixels left between packed glyphs.
    pub glyph_padding: u32,
    /// Text meshes kept per text object before the cache is flushed.
    pub text_cache_capacity: usize,
    /// Line segments used to draw circle colliders.
    pub debug_circle_segments: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            title: "coil".to_owned(),
            width: 800,
            height: 600,
            vsync: true,
            clear_color: Color::rgb(0.1, 0.1, 0.15),
            collision_cell_size: 50.0,
            atlas_initial_size: 128,
            glyph_padding: 1,
            text_cache_capacity: 500,
            debug_circle_segments: 20,
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, EngineError> {
        serde_json::from_str(json).map_err(|e| EngineError::AssetLoad {
            path: "<inline>".to_owned(),
            reason: e.to_string(),
        })
    }

    /// Read and parse a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| EngineError::AssetLoad {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&text).map_err(|e| EngineError::AssetLoad {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = title.to_owned();
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn clear_color(mut self, color: Color) -> Self {
        self.clear_color = color;
        self
    }

    pub fn collision_cell_size(mut self, size: f32) -> Self {
        self.collision_cell_size = size;
        self
    }
}
