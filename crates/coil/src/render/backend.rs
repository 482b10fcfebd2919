//! # Backend — the GPU Seam
//!
//! The renderer decides *what* to draw; a [`GraphicsBackend`] decides *how*.
//! Resources are created under the renderer's handles, so the backend never
//! hands out ids of its own.
//!
//! ```text
//!   Renderer ──create_*──► backend resources keyed by handle
//!            ──bind_material / set_texture──► current pipeline + bind group
//!            ──draw_instanced / draw──► recorded work
//!            ──draw_lines──► debug geometry
//! ```
//!
//! [`WgpuBackend`](super::wgpu_backend::WgpuBackend) records the calls and
//! replays them in one render pass per frame. [`HeadlessBackend`] only keeps
//! a log, which is what the renderer tests assert against.

use crate::error::EngineError;
use crate::math::{Mat4, UVec2};

use super::assets::{MeshHandle, ShaderHandle, TextureHandle};
use super::material::Shader;
use super::mesh::Mesh;
use super::texture::TextureData;
use super::vertex::{DrawUniforms, InstanceRaw, LineVertex};

pub trait GraphicsBackend {
    /// Pixel size of the render target.
    fn surface_size(&self) -> UVec2;

    /// Compile a shader. Fails on invalid source.
    fn create_shader(&mut self, handle: ShaderHandle, shader: &Shader) -> Result<(), EngineError>;

    /// Upload texture pixels. Uploading to an existing handle replaces it.
    fn create_texture(&mut self, handle: TextureHandle, data: &TextureData);

    /// Upload mesh geometry. Uploading to an existing handle replaces it.
    fn create_mesh(&mut self, handle: MeshHandle, mesh: &Mesh);

    fn release_shader(&mut self, handle: ShaderHandle);
    fn release_texture(&mut self, handle: TextureHandle);
    fn release_mesh(&mut self, handle: MeshHandle);

    /// Make `shader` current with `texture` bound.
    fn bind_material(&mut self, shader: ShaderHandle, texture: TextureHandle);

    /// Swap the texture without changing the shader.
    fn set_texture(&mut self, texture: TextureHandle);

    fn unbind_material(&mut self);

    /// One draw of `mesh` per element of `instances`.
    fn draw_instanced(&mut self, mesh: MeshHandle, view_proj: Mat4, instances: &[InstanceRaw]);

    /// One draw of `mesh` with per-draw uniforms.
    fn draw(&mut self, mesh: MeshHandle, uniforms: &DrawUniforms);

    /// Triangle-list debug geometry drawn with the built-in line shader.
    fn draw_lines(&mut self, view_proj: Mat4, vertices: &[LineVertex]);
}

// ── Headless ────────────────────────────────────────────────────────────

/// One call made to a [`HeadlessBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    CreateShader(ShaderHandle),
    CreateTexture {
        handle: TextureHandle,
        width: u32,
        height: u32,
    },
    CreateMesh(MeshHandle),
    ReleaseShader(ShaderHandle),
    ReleaseTexture(TextureHandle),
    ReleaseMesh(MeshHandle),
    BindMaterial {
        shader: ShaderHandle,
        texture: TextureHandle,
    },
    SetTexture(TextureHandle),
    UnbindMaterial,
    DrawInstanced {
        mesh: MeshHandle,
        view_proj: Mat4,
        instances: Vec<InstanceRaw>,
    },
    Draw {
        mesh: MeshHandle,
        uniforms: DrawUniforms,
    },
    DrawLines {
        view_proj: Mat4,
        vertex_count: usize,
    },
}

/// Backend that draws nothing and logs every call.
#[derive(Debug, Clone)]
pub struct HeadlessBackend {
    size: UVec2,
    calls: Vec<BackendCall>,
}

impl HeadlessBackend {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: UVec2::new(width, height),
            calls: Vec::new(),
        }
    }

    pub fn set_surface_size(&mut self, width: u32, height: u32) {
        self.size = UVec2::new(width, height);
    }

    pub fn calls(&self) -> &[BackendCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Calls that draw, in order.
    pub fn draws(&self) -> impl Iterator<Item = &BackendCall> {
        self.calls.iter().filter(|c| {
            matches!(
                c,
                BackendCall::DrawInstanced { .. } | BackendCall::Draw { .. } | BackendCall::DrawLines { .. }
            )
        })
    }

    pub fn instanced_draw_count(&self) -> usize {
        self.draws()
            .filter(|c| matches!(c, BackendCall::DrawInstanced { .. }))
            .count()
    }

    pub fn immediate_draw_count(&self) -> usize {
        self.draws()
            .filter(|c| matches!(c, BackendCall::Draw { .. }))
            .count()
    }

    pub fn bind_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, BackendCall::BindMaterial { .. }))
            .count()
    }
}

impl GraphicsBackend for HeadlessBackend {
    fn surface_size(&self) -> UVec2 {
        self.size
    }

    fn create_shader(&mut self, handle: ShaderHandle, shader: &Shader) -> Result<(), EngineError> {
        if shader.source.trim().is_empty() {
            return Err(EngineError::Shader(format!("'{}' has no source", shader.label)));
        }
        self.calls.push(BackendCall::CreateShader(handle));
        Ok(())
    }

    fn create_texture(&mut self, handle: TextureHandle, data: &TextureData) {
        self.calls.push(BackendCall::CreateTexture {
            handle,
            width: data.width,
            height: data.height,
        });
    }

    fn create_mesh(&mut self, handle: MeshHandle, _mesh: &Mesh) {
        self.calls.push(BackendCall::CreateMesh(handle));
    }

    fn release_shader(&mut self, handle: ShaderHandle) {
        self.calls.push(BackendCall::ReleaseShader(handle));
    }

    fn release_texture(&mut self, handle: TextureHandle) {
        self.calls.push(BackendCall::ReleaseTexture(handle));
    }

    fn release_mesh(&mut self, handle: MeshHandle) {
        self.calls.push(BackendCall::ReleaseMesh(handle));
    }

    fn bind_material(&mut self, shader: ShaderHandle, texture: TextureHandle) {
        self.calls.push(BackendCall::BindMaterial { shader, texture });
    }

    fn set_texture(&mut self, texture: TextureHandle) {
        self.calls.push(BackendCall::SetTexture(texture));
    }

    fn unbind_material(&mut self) {
        self.calls.push(BackendCall::UnbindMaterial);
    }

    fn draw_instanced(&mut self, mesh: MeshHandle, view_proj: Mat4, instances: &[InstanceRaw]) {
        self.calls.push(BackendCall::DrawInstanced {
            mesh,
            view_proj,
            instances: instances.to_vec(),
        });
    }

    fn draw(&mut self, mesh: MeshHandle, uniforms: &DrawUniforms) {
        self.calls.push(BackendCall::Draw {
            mesh,
            uniforms: *uniforms,
        });
    }

    fn draw_lines(&mut self, view_proj: Mat4, vertices: &[LineVertex]) {
        self.calls.push(BackendCall::DrawLines {
            view_proj,
            vertex_count: vertices.len(),
        });
    }
}
