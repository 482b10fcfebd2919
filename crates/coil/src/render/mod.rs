//! Rendering: resource registries, batching, culling and the GPU backends.
//!
//! [`Renderer`] is generic over a [`GraphicsBackend`]. The window runner uses
//! [`WgpuBackend`]; tests use [`HeadlessBackend`], which records calls.

pub mod assets;
pub mod backend;
pub mod batch;
pub mod cull;
pub mod debug_lines;
pub mod gpu;
pub mod layer;
pub mod material;
pub mod mesh;
pub mod renderer;
pub mod texture;
pub mod vertex;
pub mod wgpu_backend;

pub use assets::{
    FontHandle, MaterialHandle, MeshHandle, RenderAssets, ShaderHandle, SpriteSheetHandle,
    TextureHandle, TextureInfo,
};
pub use backend::{BackendCall, GraphicsBackend, HeadlessBackend};
pub use batch::{BatchKey, RenderItem, RenderMap};
pub use cull::cull_visible;
pub use gpu::GpuContext;
pub use layer::{MAX_LAYERS, RenderLayerRegistry};
pub use material::{Material, Shader};
pub use mesh::{Mesh, Topology};
pub use renderer::{BUILTIN_PREFIX, Defaults, RenderStats, Renderer};
pub use texture::{FilterMode, TextureData, TextureFormat, WrapMode};
pub use vertex::{DrawUniforms, InstanceRaw, LineVertex, Vertex};
pub use wgpu_backend::WgpuBackend;
