//! # Vertex — Data Sent to the GPU
//!
//! Four plain-old-data structs cross the CPU/GPU boundary. Each is
//! `#[repr(C)]` with `bytemuck` `Pod`/`Zeroable` so slices can be cast to
//! bytes for upload without copying.
//!
//! ```text
//! Vertex (20 bytes, step = vertex, buffer slot 0)
//! ┌────────────────┬──────────────┐
//! │ position [f32;3] │ uv [f32;2] │
//! │ location(0)    │ location(1)  │
//! └────────────────┴──────────────┘
//!
//! InstanceRaw (96 bytes, step = instance, buffer slot 1)
//! ┌──────────────────────┬─────────────┬──────────────┬─────────────┐
//! │ model [[f32;4];4]    │ color [f32;4] │ uv_offset  │ uv_scale    │
//! │ location(2..=5)      │ location(6) │ location(7)  │ location(8) │
//! └──────────────────────┴─────────────┴──────────────┴─────────────┘
//!
//! DrawUniforms (160 bytes, group 0 binding 0, dynamic offset)
//!   view_proj mat4 │ model mat4 │ color vec4 │ uv_offset vec2 │ uv_scale vec2
//!
//! LineVertex (24 bytes, debug lines only)
//!   position [f32;2] │ color [f32;4]
//! ```
//!
//! Instanced shaders read the per-entity data from `InstanceRaw` and only use
//! `view_proj` from the uniform block. Immediate shaders read everything from
//! the uniform block, one slot per draw.
//!
//! UVs are bottom-up (v = 0 is the bottom edge of the image). Shaders flip V
//! when sampling, since wgpu addresses texture rows top-down.

use bytemuck::{Pod, Zeroable};

use crate::math::{Mat4, Vec2};

/// Mesh vertex: local-space position and texture coordinate.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    pub const fn new(x: f32, y: f32, u: f32, v: f32) -> Self {
        Self {
            position: [x, y, 0.0],
            uv: [u, v],
        }
    }

    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            // position
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x3,
            },
            // uv
            wgpu::VertexAttribute {
                offset: 12,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x2,
            },
        ],
    };
}

/// Per-instance data for one entity in an instanced batch.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct InstanceRaw {
    pub model: [[f32; 4]; 4],
    pub color: [f32; 4],
    pub uv_offset: [f32; 2],
    pub uv_scale: [f32; 2],
}

impl InstanceRaw {
    pub fn new(model: Mat4, color: [f32; 4], uv_offset: Vec2, uv_scale: Vec2) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            color,
            uv_offset: uv_offset.to_array(),
            uv_scale: uv_scale.to_array(),
        }
    }

    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<InstanceRaw>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &[
            // model matrix, one column per location
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 2,
                format: wgpu::VertexFormat::Float32x4,
            },
            wgpu::VertexAttribute {
                offset: 16,
                shader_location: 3,
                format: wgpu::VertexFormat::Float32x4,
            },
            wgpu::VertexAttribute {
                offset: 32,
                shader_location: 4,
                format: wgpu::VertexFormat::Float32x4,
            },
            wgpu::VertexAttribute {
                offset: 48,
                shader_location: 5,
                format: wgpu::VertexFormat::Float32x4,
            },
            // color
            wgpu::VertexAttribute {
                offset: 64,
                shader_location: 6,
                format: wgpu::VertexFormat::Float32x4,
            },
            // uv offset
            wgpu::VertexAttribute {
                offset: 80,
                shader_location: 7,
                format: wgpu::VertexFormat::Float32x2,
            },
            // uv scale
            wgpu::VertexAttribute {
                offset: 88,
                shader_location: 8,
                format: wgpu::VertexFormat::Float32x2,
            },
        ],
    };
}

/// Uniform block written once per draw call.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct DrawUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
    pub color: [f32; 4],
    pub uv_offset: [f32; 2],
    pub uv_scale: [f32; 2],
}

impl DrawUniforms {
    /// Uniforms for an instanced draw: only the camera matrix matters.
    pub fn camera_only(view_proj: Mat4) -> Self {
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            model: Mat4::IDENTITY.to_cols_array_2d(),
            color: [1.0; 4],
            uv_offset: [0.0, 0.0],
            uv_scale: [1.0, 1.0],
        }
    }

    pub fn new(view_proj: Mat4, instance: &InstanceRaw) -> Self {
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            model: instance.model,
            color: instance.color,
            uv_offset: instance.uv_offset,
            uv_scale: instance.uv_scale,
        }
    }
}

/// Interleaved position + color for debug line geometry.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LineVertex {
    pub position: [f32; 2],
    pub color: [f32; 4],
}

impl LineVertex {
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<LineVertex>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x2,
            },
            wgpu::VertexAttribute {
                offset: 8,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x4,
            },
        ],
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn struct_sizes_match_layouts() {
        assert_eq!(std::mem::size_of::<Vertex>(), 20);
        assert_eq!(std::mem::size_of::<InstanceRaw>(), 96);
        assert_eq!(std::mem::size_of::<DrawUniforms>(), 160);
        assert_eq!(std::mem::size_of::<LineVertex>(), 24);
    }
}
