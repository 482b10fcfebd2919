//! # wgpu Backend — Record, then Replay in One Pass
//!
//! The renderer calls the [`GraphicsBackend`] methods while it walks the
//! render map. Nothing touches the GPU at that point: each call appends a
//! command and its data to CPU-side staging.
//!
//! ```text
//!   draw(mesh, uniforms)          ──► uniforms: [u8]  (stride-aligned slot)
//!   draw_instanced(mesh, vp, [i]) ──► uniforms slot + instances: [InstanceRaw]
//!   draw_lines(vp, [v])           ──► uniforms slot + lines: [LineVertex]
//!
//!   present(clear)
//!     grow GPU buffers if needed, write all staging in three uploads
//!     build missing pipelines  (shader × topology × instanced)
//!     one render pass: replay commands, dynamic offset per draw
//!     submit + present, reset staging
//! ```
//!
//! Pipelines are created lazily because the vertex layout depends on whether
//! a draw is instanced and the primitive topology on the mesh.

use std::collections::{HashMap, HashSet};
use std::num::NonZeroU64;
use std::ops::Range;

use wgpu::util::DeviceExt;

use crate::error::EngineError;
use crate::math::{Color, Mat4, UVec2};

use super::assets::{MeshHandle, ShaderHandle, TextureHandle};
use super::backend::GraphicsBackend;
use super::gpu::GpuContext;
use super::material::Shader;
use super::mesh::{Mesh, Topology};
use super::texture::{FilterMode, TextureData, TextureFormat, WrapMode};
use super::vertex::{DrawUniforms, InstanceRaw, LineVertex, Vertex};

const DEBUG_LINE_SHADER: &str = include_str!("shaders/debug_line.wgsl");
const UNIFORM_SIZE: u64 = std::mem::size_of::<DrawUniforms>() as u64;

type PipelineKey = (ShaderHandle, Topology, bool);

struct GpuTexture {
    bind_group: wgpu::BindGroup,
}

struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: Option<wgpu::Buffer>,
    count: u32,
    topology: Topology,
}

enum Command {
    Bind {
        shader: ShaderHandle,
        texture: TextureHandle,
    },
    SetTexture(TextureHandle),
    Unbind,
    Draw {
        mesh: MeshHandle,
        uniform_offset: u32,
        instances: Option<Range<u32>>,
    },
    Lines {
        uniform_offset: u32,
        vertices: Range<u32>,
    },
}

/// A growable GPU buffer.
struct StagingBuffer {
    label: &'static str,
    usage: wgpu::BufferUsages,
    buffer: wgpu::Buffer,
    capacity: u64,
}

impl StagingBuffer {
    fn new(device: &wgpu::Device, label: &'static str, usage: wgpu::BufferUsages, capacity: u64) -> Self {
        let usage = usage | wgpu::BufferUsages::COPY_DST;
        Self {
            label,
            usage,
            buffer: create_buffer(device, label, usage, capacity),
            capacity,
        }
    }

    /// Upload `bytes`, reallocating if they don't fit. Returns `true` if the
    /// buffer was replaced.
    fn write(&mut self, gpu: &GpuContext, bytes: &[u8]) -> bool {
        if bytes.is_empty() {
            return false;
        }
        let mut grown = false;
        if bytes.len() as u64 > self.capacity {
            self.capacity = (bytes.len() as u64).next_power_of_two();
            self.buffer = create_buffer(&gpu.device, self.label, self.usage, self.capacity);
            grown = true;
        }
        gpu.queue.write_buffer(&self.buffer, 0, bytes);
        grown
    }
}

fn create_buffer(device: &wgpu::Device, label: &str, usage: wgpu::BufferUsages, size: u64) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size,
        usage,
        mapped_at_creation: false,
    })
}

pub struct WgpuBackend {
    gpu: GpuContext,
    uniform_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    line_pipeline: wgpu::RenderPipeline,
    shaders: HashMap<ShaderHandle, wgpu::ShaderModule>,
    /// Shaders whose vertex stage reads per-instance inputs.
    instanced_shaders: HashSet<ShaderHandle>,
    pipelines: HashMap<PipelineKey, Option<wgpu::RenderPipeline>>,
    textures: HashMap<TextureHandle, GpuTexture>,
    meshes: HashMap<MeshHandle, GpuMesh>,
    uniform_stride: u64,
    uniform_buffer: StagingBuffer,
    uniform_bind_group: wgpu::BindGroup,
    instance_buffer: StagingBuffer,
    line_buffer: StagingBuffer,
    // per-frame recording
    recording_shader: Option<ShaderHandle>,
    uniforms: Vec<u8>,
    instances: Vec<InstanceRaw>,
    lines: Vec<LineVertex>,
    commands: Vec<Command>,
}

impl WgpuBackend {
    pub fn new(gpu: GpuContext) -> Self {
        let device = &gpu.device;

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("draw uniforms layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(UNIFORM_SIZE),
                },
                count: None,
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("texture layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("material pipeline layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        let line_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("debug line pipeline layout"),
            bind_group_layouts: &[&uniform_layout],
            push_constant_ranges: &[],
        });
        let line_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("debug line shader"),
            source: wgpu::ShaderSource::Wgsl(DEBUG_LINE_SHADER.into()),
        });
        let line_pipeline = build_pipeline(
            &gpu,
            "debug line pipeline",
            &line_layout,
            &line_module,
            &[LineVertex::LAYOUT],
            wgpu::PrimitiveTopology::TriangleList,
        );

        let alignment = device.limits().min_uniform_buffer_offset_alignment as u64;
        let uniform_stride = UNIFORM_SIZE.div_ceil(alignment) * alignment;
        let uniform_buffer = StagingBuffer::new(
            device,
            "draw uniforms",
            wgpu::BufferUsages::UNIFORM,
            uniform_stride * 64,
        );
        let uniform_bind_group = create_uniform_bind_group(device, &uniform_layout, &uniform_buffer.buffer);
        let instance_buffer = StagingBuffer::new(
            device,
            "instances",
            wgpu::BufferUsages::VERTEX,
            std::mem::size_of::<InstanceRaw>() as u64 * 1024,
        );
        let line_buffer = StagingBuffer::new(
            device,
            "debug lines",
            wgpu::BufferUsages::VERTEX,
            std::mem::size_of::<LineVertex>() as u64 * 1024,
        );

        Self {
            gpu,
            uniform_layout,
            texture_layout,
            pipeline_layout,
            line_pipeline,
            shaders: HashMap::new(),
            instanced_shaders: HashSet::new(),
            pipelines: HashMap::new(),
            textures: HashMap::new(),
            meshes: HashMap::new(),
            uniform_stride,
            uniform_buffer,
            uniform_bind_group,
            instance_buffer,
            line_buffer,
            recording_shader: None,
            uniforms: Vec::new(),
            instances: Vec::new(),
            lines: Vec::new(),
            commands: Vec::new(),
        }
    }

    pub fn gpu(&self) -> &GpuContext {
        &self.gpu
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.gpu.resize(width, height);
    }

    /// Execute everything recorded since the last present and show the frame.
    pub fn present(&mut self, clear_color: Color) -> Result<(), wgpu::SurfaceError> {
        let result = self.replay(clear_color);
        self.recording_shader = None;
        self.uniforms.clear();
        self.instances.clear();
        self.lines.clear();
        self.commands.clear();
        result
    }

    fn replay(&mut self, clear_color: Color) -> Result<(), wgpu::SurfaceError> {
        if self.uniform_buffer.write(&self.gpu, &self.uniforms) {
            self.uniform_bind_group =
                create_uniform_bind_group(&self.gpu.device, &self.uniform_layout, &self.uniform_buffer.buffer);
        }
        self.instance_buffer
            .write(&self.gpu, bytemuck::cast_slice(&self.instances));
        self.line_buffer.write(&self.gpu, bytemuck::cast_slice(&self.lines));
        self.prepare_pipelines();

        let output = self.gpu.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("coil frame encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("coil main pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: clear_color.r as f64,
                            g: clear_color.g as f64,
                            b: clear_color.b as f64,
                            a: clear_color.a as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            let mut shader: Option<ShaderHandle> = None;
            for command in &self.commands {
                match command {
                    Command::Bind { shader: s, texture } => {
                        shader = Some(*s);
                        if let Some(t) = self.textures.get(texture) {
                            pass.set_bind_group(1, &t.bind_group, &[]);
                        }
                    }
                    Command::SetTexture(texture) => {
                        if let Some(t) = self.textures.get(texture) {
                            pass.set_bind_group(1, &t.bind_group, &[]);
                        }
                    }
                    Command::Unbind => shader = None,
                    Command::Draw {
                        mesh,
                        uniform_offset,
                        instances,
                    } => {
                        let (Some(shader), Some(mesh)) = (shader, self.meshes.get(mesh)) else {
                            continue;
                        };
                        if mesh.count == 0 {
                            continue;
                        }
                        let key = (shader, mesh.topology, instances.is_some());
                        let Some(Some(pipeline)) = self.pipelines.get(&key) else {
                            continue;
                        };
                        pass.set_pipeline(pipeline);
                        pass.set_bind_group(0, &self.uniform_bind_group, &[*uniform_offset]);
                        pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                        let instances = match instances {
                            Some(range) => {
                                pass.set_vertex_buffer(1, self.instance_buffer.buffer.slice(..));
                                range.clone()
                            }
                            None => 0..1,
                        };
                        match &mesh.index_buffer {
                            Some(indices) => {
                                pass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint32);
                                pass.draw_indexed(0..mesh.count, 0, instances);
                            }
                            None => pass.draw(0..mesh.count, instances),
                        }
                    }
                    Command::Lines {
                        uniform_offset,
                        vertices,
                    } => {
                        pass.set_pipeline(&self.line_pipeline);
                        pass.set_bind_group(0, &self.uniform_bind_group, &[*uniform_offset]);
                        pass.set_vertex_buffer(0, self.line_buffer.buffer.slice(..));
                        pass.draw(vertices.clone(), 0..1);
                    }
                }
            }
        }

        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }

    /// Create every pipeline the recorded draws need.
    fn prepare_pipelines(&mut self) {
        let mut shader = None;
        let mut needed = Vec::new();
        for command in &self.commands {
            match command {
                Command::Bind { shader: s, .. } => shader = Some(*s),
                Command::Unbind => shader = None,
                Command::Draw { mesh, instances, .. } => {
                    if let (Some(shader), Some(mesh)) = (shader, self.meshes.get(mesh)) {
                        let key = (shader, mesh.topology, instances.is_some());
                        if !self.pipelines.contains_key(&key) {
                            needed.push(key);
                        }
                    }
                }
                Command::SetTexture(_) | Command::Lines { .. } => {}
            }
        }
        for key in needed {
            if self.pipelines.contains_key(&key) {
                continue;
            }
            let pipeline = self.create_material_pipeline(key);
            self.pipelines.insert(key, pipeline);
        }
    }

    fn create_material_pipeline(&self, (shader, topology, instanced): PipelineKey) -> Option<wgpu::RenderPipeline> {
        let module = self.shaders.get(&shader)?;
        let buffers: &[wgpu::VertexBufferLayout<'static>] = if instanced {
            &[Vertex::LAYOUT, InstanceRaw::LAYOUT]
        } else {
            &[Vertex::LAYOUT]
        };

        self.gpu.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = build_pipeline(
            &self.gpu,
            "material pipeline",
            &self.pipeline_layout,
            module,
            buffers,
            topology.to_wgpu(),
        );
        match pollster::block_on(self.gpu.device.pop_error_scope()) {
            Some(err) => {
                log::error!("Pipeline for {shader:?} ({topology:?}, instanced: {instanced}) failed: {err}");
                None
            }
            None => Some(pipeline),
        }
    }

    fn push_uniforms(&mut self, uniforms: &DrawUniforms) -> u32 {
        let offset = self.uniforms.len();
        self.uniforms.extend_from_slice(bytemuck::bytes_of(uniforms));
        self.uniforms.resize(offset + self.uniform_stride as usize, 0);
        offset as u32
    }
}

impl GraphicsBackend for WgpuBackend {
    fn surface_size(&self) -> UVec2 {
        let (w, h) = self.gpu.surface_size();
        UVec2::new(w, h)
    }

    fn create_shader(&mut self, handle: ShaderHandle, shader: &Shader) -> Result<(), EngineError> {
        self.gpu.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = self
            .gpu
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(shader.label.as_str()),
                source: wgpu::ShaderSource::Wgsl(shader.source.as_str().into()),
            });
        if let Some(err) = pollster::block_on(self.gpu.device.pop_error_scope()) {
            return Err(EngineError::Shader(format!("{}: {err}", shader.label)));
        }
        self.shaders.insert(handle, module);
        if shader.supports_instancing() {
            self.instanced_shaders.insert(handle);
        } else {
            self.instanced_shaders.remove(&handle);
        }
        self.pipelines.retain(|(s, ..), _| *s != handle);
        Ok(())
    }

    fn create_texture(&mut self, handle: TextureHandle, data: &TextureData) {
        let device = &self.gpu.device;
        let format = match data.format {
            TextureFormat::Rgba8 => wgpu::TextureFormat::Rgba8UnormSrgb,
            TextureFormat::R8 => wgpu::TextureFormat::R8Unorm,
        };
        let texture = device.create_texture_with_data(
            &self.gpu.queue,
            &wgpu::TextureDescriptor {
                label: Some("coil texture"),
                size: wgpu::Extent3d {
                    width: data.width,
                    height: data.height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            &data.pixels,
        );

        let filter = match data.filter {
            FilterMode::Nearest => wgpu::FilterMode::Nearest,
            FilterMode::Linear => wgpu::FilterMode::Linear,
        };
        let address = match data.wrap {
            WrapMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
            WrapMode::Repeat => wgpu::AddressMode::Repeat,
            WrapMode::MirroredRepeat => wgpu::AddressMode::MirrorRepeat,
        };
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("coil sampler"),
            address_mode_u: address,
            address_mode_v: address,
            mag_filter: filter,
            min_filter: filter,
            ..Default::default()
        });

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("coil texture bind group"),
            layout: &self.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });
        self.textures.insert(handle, GpuTexture { bind_group });
    }

    fn create_mesh(&mut self, handle: MeshHandle, mesh: &Mesh) {
        let device = &self.gpu.device;
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("mesh vertices"),
            contents: bytemuck::cast_slice(mesh.vertices()),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = mesh.is_indexed().then(|| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("mesh indices"),
                contents: bytemuck::cast_slice(mesh.indices()),
                usage: wgpu::BufferUsages::INDEX,
            })
        });
        let count = if mesh.is_indexed() {
            mesh.indices().len()
        } else {
            mesh.vertices().len()
        } as u32;
        self.meshes.insert(
            handle,
            GpuMesh {
                vertex_buffer,
                index_buffer,
                count,
                topology: mesh.topology(),
            },
        );
    }

    fn release_shader(&mut self, handle: ShaderHandle) {
        self.shaders.remove(&handle);
        self.instanced_shaders.remove(&handle);
        self.pipelines.retain(|(s, ..), _| *s != handle);
    }

    fn release_texture(&mut self, handle: TextureHandle) {
        self.textures.remove(&handle);
    }

    fn release_mesh(&mut self, handle: MeshHandle) {
        self.meshes.remove(&handle);
    }

    fn bind_material(&mut self, shader: ShaderHandle, texture: TextureHandle) {
        self.recording_shader = Some(shader);
        self.commands.push(Command::Bind { shader, texture });
    }

    fn set_texture(&mut self, texture: TextureHandle) {
        self.commands.push(Command::SetTexture(texture));
    }

    fn unbind_material(&mut self) {
        self.recording_shader = None;
        self.commands.push(Command::Unbind);
    }

    fn draw_instanced(&mut self, mesh: MeshHandle, view_proj: Mat4, instances: &[InstanceRaw]) {
        if instances.is_empty() {
            return;
        }
        let uniform_offset = self.push_uniforms(&DrawUniforms::camera_only(view_proj));
        let start = self.instances.len() as u32;
        self.instances.extend_from_slice(instances);
        self.commands.push(Command::Draw {
            mesh,
            uniform_offset,
            instances: Some(start..self.instances.len() as u32),
        });
    }

    fn draw(&mut self, mesh: MeshHandle, uniforms: &DrawUniforms) {
        // an instancing shader has no per-draw inputs; feed it one instance
        if self
            .recording_shader
            .is_some_and(|s| self.instanced_shaders.contains(&s))
        {
            let instance = InstanceRaw {
                model: uniforms.model,
                color: uniforms.color,
                uv_offset: uniforms.uv_offset,
                uv_scale: uniforms.uv_scale,
            };
            let view_proj = Mat4::from_cols_array_2d(&uniforms.view_proj);
            self.draw_instanced(mesh, view_proj, &[instance]);
            return;
        }
        let uniform_offset = self.push_uniforms(uniforms);
        self.commands.push(Command::Draw {
            mesh,
            uniform_offset,
            instances: None,
        });
    }

    fn draw_lines(&mut self, view_proj: Mat4, vertices: &[LineVertex]) {
        if vertices.is_empty() {
            return;
        }
        let uniform_offset = self.push_uniforms(&DrawUniforms::camera_only(view_proj));
        let start = self.lines.len() as u32;
        self.lines.extend_from_slice(vertices);
        self.commands.push(Command::Lines {
            uniform_offset,
            vertices: start..self.lines.len() as u32,
        });
    }
}

fn create_uniform_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    buffer: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("draw uniforms bind group"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer,
                offset: 0,
                size: NonZeroU64::new(UNIFORM_SIZE),
            }),
        }],
    })
}

fn build_pipeline(
    gpu: &GpuContext,
    label: &str,
    layout: &wgpu::PipelineLayout,
    module: &wgpu::ShaderModule,
    buffers: &[wgpu::VertexBufferLayout<'_>],
    topology: wgpu::PrimitiveTopology,
) -> wgpu::RenderPipeline {
    gpu.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module,
            entry_point: Some("vs_main"),
            buffers,
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: gpu.surface_format(),
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None, // 2D geometry is double-sided
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}
