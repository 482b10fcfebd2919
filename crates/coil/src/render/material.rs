//! Shaders and materials.
//!
//! A [`Shader`] is WGSL source plus what the renderer needs to know about its
//! inputs. Every shader follows the same binding contract:
//!
//! ```text
//!   group(0) binding(0)  DrawUniforms (dynamic offset)
//!   group(1) binding(0)  texture_2d<f32>
//!   group(1) binding(1)  sampler
//!   vertex buffer 0      Vertex       @location(0..=1)
//!   vertex buffer 1      InstanceRaw  @location(2..=8), instanced shaders only
//! ```
//!
//! A shader is instancing-capable when its source declares the per-instance
//! model input named [`INSTANCE_MODEL_ATTRIBUTE`].

use std::path::Path;

use crate::error::EngineError;
use crate::math::Color;

use super::assets::{ShaderHandle, TextureHandle};

/// Input name whose presence marks a shader as instancing-capable.
pub const INSTANCE_MODEL_ATTRIBUTE: &str = "i_model";

#[derive(Debug, Clone, PartialEq)]
pub struct Shader {
    pub label: String,
    pub source: String,
    instancing: bool,
}

impl Shader {
    pub fn from_wgsl(label: &str, source: &str) -> Self {
        Self {
            label: label.to_owned(),
            source: source.to_owned(),
            instancing: source.contains(INSTANCE_MODEL_ATTRIBUTE),
        }
    }

    /// Read WGSL source from disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| EngineError::AssetLoad {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::from_wgsl(&path.display().to_string(), &source))
    }

    pub fn supports_instancing(&self) -> bool {
        self.instancing
    }
}

/// A shader plus its texture and tint.
///
/// The tint multiplies every entity color drawn with this material.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub shader: ShaderHandle,
    pub texture: Option<TextureHandle>,
    pub color: Color,
    instancing: bool,
}

impl Material {
    /// A material that asks for instanced drawing.
    pub fn new(shader: ShaderHandle) -> Self {
        Self {
            shader,
            texture: None,
            color: Color::WHITE,
            instancing: true,
        }
    }

    /// Set the texture (builder pattern).
    pub fn texture(mut self, texture: TextureHandle) -> Self {
        self.texture = Some(texture);
        self
    }

    /// Set the tint (builder pattern).
    pub fn color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    /// Request or refuse instancing (builder pattern). The request only takes
    /// effect if the shader supports it.
    pub fn instancing(mut self, enabled: bool) -> Self {
        self.instancing = enabled;
        self
    }

    pub fn wants_instancing(&self) -> bool {
        self.instancing
    }

    pub(crate) fn set_instancing(&mut self, enabled: bool) {
        self.instancing = enabled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instancing_is_detected_from_source() {
        let instanced = Shader::from_wgsl("a", "@location(2) i_model_0: vec4<f32>");
        let immediate = Shader::from_wgsl("b", "@location(0) position: vec3<f32>");
        assert!(instanced.supports_instancing());
        assert!(!immediate.supports_instancing());
    }
}
