use std::collections::HashMap;

use anyhow::{ensure, Result};

use crate::batch::{BlendFunc, SpriteVertex, TextureId, TextureRegion};
use crate::gpu::{DrawError, GpuContext};

use super::ctx::{RenderCtx, RenderTarget};
use super::shader::{self, Globals, WgpuShader, SPRITE_WGSL};

const GLOBALS_SIZE: u64 = std::mem::size_of::<Globals>() as u64;

/// Initialization parameters for [`WgpuBatchContext`].
#[derive(Debug, Clone)]
pub struct WgpuInit {
    /// Sampler filter for every registered texture. `Nearest` for pixel art.
    pub filter: wgpu::FilterMode,
}

impl Default for WgpuInit {
    fn default() -> Self {
        Self {
            filter: wgpu::FilterMode::Linear,
        }
    }
}

struct TextureEntry {
    _texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
    width: u32,
    height: u32,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
struct PipelineKey {
    shader: u32,
    blend: BlendFunc,
}

/// One batch flush, replayed at encode time.
#[derive(Debug)]
struct RecordedDraw {
    key: PipelineKey,
    texture: TextureId,
    first_index: u32,
    index_count: u32,
    base_vertex: i32,
    globals_offset: u32,
}

/// wgpu implementation of the batch's GPU context.
///
/// wgpu has no immediate-mode state, so each flush is recorded (vertices,
/// indices, texture, blend function, shader uniforms) into the frame and
/// replayed by [`encode`](Self::encode) in a single render pass:
/// - one pipeline per (shader, blend function) pair, created on first use
/// - one bind group per registered texture
/// - shader uniforms in a dynamic-offset uniform buffer, one slot per flush
///
/// The sprite pass has no depth attachment; `depth_mask` is tracked only.
pub struct WgpuBatchContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
    format: wgpu::TextureFormat,

    globals_bgl: wgpu::BindGroupLayout,
    texture_bgl: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    sampler: wgpu::Sampler,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,

    textures: HashMap<TextureId, TextureEntry>,
    next_texture: u64,
    next_shader: u32,

    vertex_buffer: Option<wgpu::Buffer>,
    vertex_capacity: usize,
    index_buffer: Option<wgpu::Buffer>,
    index_capacity: usize,
    globals_buffer: Option<wgpu::Buffer>,
    globals_bind_group: Option<wgpu::BindGroup>,
    globals_capacity: usize,
    globals_stride: u32,

    frame_vertices: Vec<SpriteVertex>,
    frame_indices: Vec<u16>,
    frame_globals: Vec<u8>,
    frame_draws: Vec<RecordedDraw>,

    bound: Option<TextureId>,
    blend: BlendFunc,
    depth_write: bool,
}

impl WgpuBatchContext {
    pub fn new(ctx: &RenderCtx<'_>, init: WgpuInit) -> Result<Self> {
        ensure!(
            !ctx.surface_format.is_depth_stencil_format(),
            "sprite batch target must be a color format, got {:?}",
            ctx.surface_format
        );

        let device = ctx.device.clone();

        let globals_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("sprig batch globals bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(GLOBALS_SIZE),
                },
                count: None,
            }],
        });

        let texture_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("sprig batch texture bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
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
            label: Some("sprig batch pipeline layout"),
            bind_group_layouts: &[&globals_bgl, &texture_bgl],
            immediate_size: 0,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("sprig batch sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: init.filter,
            min_filter: init.filter,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });

        let globals_stride = align_to(GLOBALS_SIZE as u32, device.limits().min_uniform_buffer_offset_alignment);

        log::debug!(
            "sprig batch context: format {:?}, uniform stride {globals_stride}",
            ctx.surface_format
        );

        Ok(Self {
            device,
            queue: ctx.queue.clone(),
            format: ctx.surface_format,
            globals_bgl,
            texture_bgl,
            pipeline_layout,
            sampler,
            pipelines: HashMap::new(),
            textures: HashMap::new(),
            next_texture: 0,
            next_shader: 0,
            vertex_buffer: None,
            vertex_capacity: 0,
            index_buffer: None,
            index_capacity: 0,
            globals_buffer: None,
            globals_bind_group: None,
            globals_capacity: 0,
            globals_stride,
            frame_vertices: Vec::new(),
            frame_indices: Vec::new(),
            frame_globals: Vec::new(),
            frame_draws: Vec::new(),
            bound: None,
            blend: BlendFunc::default(),
            depth_write: true,
        })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn depth_write(&self) -> bool {
        self.depth_write
    }

    /// Flushes recorded since the last [`encode`](Self::encode).
    pub fn pending_draws(&self) -> usize {
        self.frame_draws.len()
    }

    // ── shaders ───────────────────────────────────────────────────────────

    /// Compiles a caller-owned WGSL program.
    ///
    /// Failures are reported through [`Shader::is_compiled`](crate::gpu::Shader::is_compiled)
    /// and the compiler log, as for the default program.
    pub fn create_shader(&mut self, label: &str, wgsl: &str) -> WgpuShader {
        self.next_shader += 1;
        shader::compile(&self.device, self.next_shader, label, wgsl)
    }

    // ── textures ──────────────────────────────────────────────────────────

    /// Makes an existing texture drawable by the batch.
    ///
    /// The texture must have `TEXTURE_BINDING` usage and a filterable float format.
    pub fn register_texture(&mut self, texture: &wgpu::Texture) -> TextureRegion {
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("sprig batch texture bind group"),
            layout: &self.texture_bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });

        self.next_texture += 1;
        let id = TextureId(self.next_texture);
        let (width, height) = (texture.width(), texture.height());
        self.textures.insert(
            id,
            TextureEntry {
                _texture: texture.clone(),
                bind_group,
                width,
                height,
            },
        );
        log::debug!("sprig batch context: registered {id} ({width}x{height})");

        TextureRegion::new(id, width as f32, height as f32)
    }

    /// Uploads tightly packed RGBA8 pixels as a new texture.
    ///
    /// Pixels are straight alpha. They are stored as sRGB when the target
    /// format is sRGB.
    pub fn upload_rgba8(&mut self, width: u32, height: u32, pixels: &[u8]) -> Result<TextureRegion> {
        ensure!(width > 0 && height > 0, "texture size must be non-zero, got {width}x{height}");
        let expected = width as usize * height as usize * 4;
        ensure!(
            pixels.len() == expected,
            "expected {expected} bytes of RGBA8 data for {width}x{height}, got {}",
            pixels.len()
        );

        let format = if self.format.is_srgb() {
            wgpu::TextureFormat::Rgba8UnormSrgb
        } else {
            wgpu::TextureFormat::Rgba8Unorm
        };
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("sprig batch texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * 4),
                rows_per_image: Some(height),
            },
            size,
        );

        Ok(self.register_texture(&texture))
    }

    /// 1x1 opaque white texture for `fill_rect` / `draw_point`.
    pub fn solid_texture(&mut self) -> Result<TextureRegion> {
        self.upload_rgba8(1, 1, &[0xff; 4])
    }

    /// Forgets a texture. Recorded draws that use it are skipped at encode time.
    pub fn remove_texture(&mut self, id: TextureId) -> bool {
        if self.bound == Some(id) {
            self.bound = None;
        }
        self.textures.remove(&id).is_some()
    }

    pub fn texture_size(&self, id: TextureId) -> Option<(u32, u32)> {
        self.textures.get(&id).map(|t| (t.width, t.height))
    }

    // ── encode ────────────────────────────────────────────────────────────

    /// Uploads the frame's recorded flushes and replays them into `target`
    /// in one render pass, then starts a new frame.
    ///
    /// Call after the batch's `end()`; flushes recorded later land in the
    /// next frame.
    pub fn encode(&mut self, target: &mut RenderTarget<'_>) {
        if self.frame_draws.is_empty() && target.clear.is_none() {
            return;
        }

        if !self.frame_draws.is_empty() {
            self.upload_frame();
        }

        {
            let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("sprig batch pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target.color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: target.load_op(),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            if let (Some(vbo), Some(ibo), Some(globals)) = (
                self.vertex_buffer.as_ref(),
                self.index_buffer.as_ref(),
                self.globals_bind_group.as_ref(),
            ) {
                rpass.set_vertex_buffer(0, vbo.slice(..));
                rpass.set_index_buffer(ibo.slice(..), wgpu::IndexFormat::Uint16);

                for draw in &self.frame_draws {
                    let Some(pipeline) = self.pipelines.get(&draw.key) else { continue };
                    let Some(texture) = self.textures.get(&draw.texture) else {
                        log::warn!("sprig batch context: {} removed before encode; draw skipped", draw.texture);
                        continue;
                    };

                    rpass.set_pipeline(pipeline);
                    rpass.set_bind_group(0, globals, &[draw.globals_offset]);
                    rpass.set_bind_group(1, &texture.bind_group, &[]);
                    rpass.draw_indexed(
                        draw.first_index..draw.first_index + draw.index_count,
                        draw.base_vertex,
                        0..1,
                    );
                }
            }
        }

        log::trace!(
            "sprig batch context: encoded {} draws, {} vertices",
            self.frame_draws.len(),
            self.frame_vertices.len()
        );

        self.frame_vertices.clear();
        self.frame_indices.clear();
        self.frame_globals.clear();
        self.frame_draws.clear();
    }

    fn upload_frame(&mut self) {
        // write_buffer sizes must be multiples of 4 bytes.
        if self.frame_indices.len() % 2 == 1 {
            self.frame_indices.push(0);
        }

        self.ensure_vertex_capacity(self.frame_vertices.len());
        self.ensure_index_capacity(self.frame_indices.len());
        self.ensure_globals_capacity(self.frame_draws.len());

        if let Some(vbo) = self.vertex_buffer.as_ref() {
            self.queue.write_buffer(vbo, 0, bytemuck::cast_slice(&self.frame_vertices));
        }
        if let Some(ibo) = self.index_buffer.as_ref() {
            self.queue.write_buffer(ibo, 0, bytemuck::cast_slice(&self.frame_indices));
        }
        if let Some(ubo) = self.globals_buffer.as_ref() {
            self.queue.write_buffer(ubo, 0, &self.frame_globals);
        }
    }

    // ── lazy-init helpers ─────────────────────────────────────────────────

    fn ensure_vertex_capacity(&mut self, vertices: usize) {
        if vertices <= self.vertex_capacity && self.vertex_buffer.is_some() {
            return;
        }
        let cap = vertices.next_power_of_two().max(1024);
        self.vertex_buffer = Some(self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("sprig batch vbo"),
            size: (cap * std::mem::size_of::<SpriteVertex>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));
        self.vertex_capacity = cap;
    }

    fn ensure_index_capacity(&mut self, indices: usize) {
        if indices <= self.index_capacity && self.index_buffer.is_some() {
            return;
        }
        let cap = indices.next_power_of_two().max(1536);
        self.index_buffer = Some(self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("sprig batch ibo"),
            size: (cap * std::mem::size_of::<u16>()) as u64,
            usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));
        self.index_capacity = cap;
    }

    fn ensure_globals_capacity(&mut self, slots: usize) {
        if slots <= self.globals_capacity && self.globals_bind_group.is_some() {
            return;
        }
        let cap = slots.next_power_of_two().max(16);
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("sprig batch globals ubo"),
            size: cap as u64 * self.globals_stride as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("sprig batch globals bind group"),
            layout: &self.globals_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(GLOBALS_SIZE),
                }),
            }],
        });
        self.globals_buffer = Some(buffer);
        self.globals_bind_group = Some(bind_group);
        self.globals_capacity = cap;
    }

    fn ensure_pipeline(&mut self, key: PipelineKey, module: &wgpu::ShaderModule) -> Result<(), DrawError> {
        if self.pipelines.contains_key(&key) {
            return Ok(());
        }

        let (pipeline, error) = shader::with_validation_scope(&self.device, || {
            self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("sprig batch pipeline"),
                layout: Some(&self.pipeline_layout),
                vertex: wgpu::VertexState {
                    module,
                    entry_point: Some("vs_main"),
                    compilation_options: Default::default(),
                    buffers: &[sprite_vertex_layout()],
                },
                fragment: Some(wgpu::FragmentState {
                    module,
                    entry_point: Some("fs_main"),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.format,
                        blend: Some(key.blend.to_blend_state()),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            })
        });

        if let Some(err) = error {
            return Err(DrawError::Backend(format!("pipeline creation failed: {err}")));
        }

        log::debug!(
            "sprig batch context: pipeline for shader {} with {:?}/{:?}",
            key.shader,
            key.blend.src,
            key.blend.dst
        );
        self.pipelines.insert(key, pipeline);
        Ok(())
    }
}

impl GpuContext for WgpuBatchContext {
    type Shader = WgpuShader;

    fn create_default_shader(&mut self) -> WgpuShader {
        self.create_shader("sprig sprite shader", SPRITE_WGSL)
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureId) {
        if unit != 0 {
            log::warn!("sprig batch context: texture unit {unit} unsupported; {texture} not bound");
            return;
        }
        self.bound = Some(texture);
    }

    fn blend_function(&self) -> BlendFunc {
        self.blend
    }

    fn set_blend_function(&mut self, func: BlendFunc) {
        self.blend = func;
    }

    fn depth_mask(&mut self, write: bool) {
        self.depth_write = write;
    }

    fn draw_indexed(
        &mut self,
        shader: &WgpuShader,
        vertices: &[SpriteVertex],
        indices: &[u16],
    ) -> Result<(), DrawError> {
        let texture = self.bound.ok_or(DrawError::NoTexture)?;
        if !self.textures.contains_key(&texture) {
            return Err(DrawError::Backend(format!("{texture} is not registered")));
        }
        if let Some(&index) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
            return Err(DrawError::IndexOutOfRange {
                index,
                vertices: vertices.len(),
            });
        }
        let module = shader
            .module()
            .ok_or_else(|| DrawError::Backend(format!("shader {} is not compiled", shader.id())))?;

        let key = PipelineKey {
            shader: shader.id(),
            blend: self.blend,
        };
        self.ensure_pipeline(key, module)?;

        let globals_offset = self.frame_globals.len() as u32;
        self.frame_globals.extend_from_slice(bytemuck::bytes_of(&shader.globals()));
        self.frame_globals
            .resize(globals_offset as usize + self.globals_stride as usize, 0);

        self.frame_draws.push(RecordedDraw {
            key,
            texture,
            first_index: self.frame_indices.len() as u32,
            index_count: indices.len() as u32,
            base_vertex: self.frame_vertices.len() as i32,
            globals_offset,
        });
        self.frame_vertices.extend_from_slice(vertices);
        self.frame_indices.extend_from_slice(indices);
        Ok(())
    }
}

const SPRITE_ATTRS: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
    0 => Float32x2, // pos
    1 => Unorm8x4,  // packed color
    2 => Float32x2  // uv
];

fn sprite_vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<SpriteVertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &SPRITE_ATTRS,
    }
}

#[inline]
fn align_to(value: u32, alignment: u32) -> u32 {
    let alignment = alignment.max(1);
    value.div_ceil(alignment) * alignment
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_slots_respect_offset_alignment() {
        assert_eq!(align_to(80, 256), 256);
        assert_eq!(align_to(256, 256), 256);
        assert_eq!(align_to(257, 256), 512);
        assert_eq!(align_to(80, 0), 80);
    }

    #[test]
    fn vertex_layout_matches_sprite_vertex() {
        let layout = sprite_vertex_layout();
        assert_eq!(layout.array_stride, 20);
        let offsets: Vec<u64> = layout.attributes.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 8, 12]);
    }
}
