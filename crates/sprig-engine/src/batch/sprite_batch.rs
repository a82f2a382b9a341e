use glam::Mat4;

use crate::coords::{Vec2, Viewport};
use crate::gpu::{GpuContext, Shader, PROJ_TRANS_UNIFORM, TEXTURE_UNIFORM};
use crate::paint::{Color, PackedColor};

use super::blend::BlendMode;
use super::config::BatchConfig;
use super::error::{BatchError, BatchState};
use super::geometry::build_quad;
use super::stats::BatchStats;
use super::texture::{self, Texture, TextureId};
use super::vertex::{quad_indices, VertexBuffer, INDICES_PER_QUAD, MAX_QUADS};

/// Quad batcher.
///
/// Collects textured quads into one vertex buffer and submits them with as
/// few draw calls as possible. A flush happens when:
/// - the resolved texture changes between two draws
/// - the buffer reaches `capacity` quads
/// - the shader is swapped mid-batch
/// - `end()` is called
///
/// Lifecycle is `Unloaded -> Idle <-> Drawing`. Vertex storage and (unless one
/// was supplied) the default shader are created on the first `begin()`.
///
/// The batch owns its GPU context; use [`gpu`](Self::gpu) /
/// [`gpu_mut`](Self::gpu_mut) to reach it between frames.
pub struct SpriteBatch<G: GpuContext> {
    gpu: G,
    capacity: usize,

    vertices: Option<VertexBuffer>,
    indices: Vec<u16>,
    drawing: bool,

    shader: Option<G::Shader>,
    owns_shader: bool,
    custom_shader: Option<G::Shader>,

    bound_texture: Option<TextureId>,
    inv_tex_size: Vec2,

    blend_mode: BlendMode,
    color: Color,
    alpha: f32,

    projection: Mat4,
    transform: Mat4,

    lock_submit: bool,
    stats: BatchStats,
}

impl<G: GpuContext> SpriteBatch<G> {
    /// Creates a batch that compiles and owns the default shader on first `begin()`.
    pub fn new(gpu: G, config: BatchConfig) -> Result<Self, BatchError> {
        Self::build(gpu, config, None)
    }

    /// Creates a batch drawing with a caller-supplied shader.
    ///
    /// The shader is never disposed by the batch; [`close`](Self::close) hands it back.
    pub fn with_shader(gpu: G, config: BatchConfig, shader: G::Shader) -> Result<Self, BatchError> {
        Self::build(gpu, config, Some(shader))
    }

    fn build(gpu: G, config: BatchConfig, shader: Option<G::Shader>) -> Result<Self, BatchError> {
        if !config.capacity_is_valid() {
            return Err(BatchError::Capacity {
                requested: config.capacity,
                max: MAX_QUADS,
            });
        }
        if let Some(shader) = &shader {
            check_compiled(shader)?;
        }

        Ok(Self {
            gpu,
            capacity: config.capacity,
            vertices: None,
            indices: Vec::new(),
            drawing: false,
            shader,
            owns_shader: false,
            custom_shader: None,
            bound_texture: None,
            inv_tex_size: Vec2::zero(),
            blend_mode: config.blend_mode,
            color: Color::WHITE,
            alpha: 1.0,
            projection: config.viewport.projection(),
            transform: Mat4::IDENTITY,
            lock_submit: false,
            stats: BatchStats::default(),
        })
    }

    // ── lifecycle ─────────────────────────────────────────────────────────

    pub fn state(&self) -> BatchState {
        if self.drawing {
            BatchState::Drawing
        } else if self.vertices.is_some() {
            BatchState::Idle
        } else {
            BatchState::Unloaded
        }
    }

    #[inline]
    pub fn is_drawing(&self) -> bool {
        self.drawing
    }

    /// Starts a batch.
    ///
    /// Allocates vertex storage and the default shader on first use, disables
    /// depth writes, binds the active shader and uploads the combined
    /// projection/transform matrix.
    pub fn begin(&mut self) -> Result<(), BatchError> {
        if self.drawing {
            return Err(self.invalid_state("begin"));
        }
        self.ensure_loaded()?;

        self.stats.begin_frame();
        self.gpu.depth_mask(false);
        if let Some(shader) = self.active_shader_mut() {
            shader.begin();
        }
        self.setup_matrices();
        self.drawing = true;
        Ok(())
    }

    /// Flushes pending quads, restores depth writes and unbinds the shader.
    ///
    /// The batch returns to idle even if the final flush fails; the error is
    /// still reported.
    pub fn end(&mut self) -> Result<(), BatchError> {
        if !self.drawing {
            return Err(self.invalid_state("end"));
        }

        let flushed = self.flush();

        self.bound_texture = None;
        self.drawing = false;
        self.gpu.depth_mask(true);
        if let Some(shader) = self.active_shader_mut() {
            shader.end();
        }
        flushed
    }

    fn ensure_loaded(&mut self) -> Result<(), BatchError> {
        if self.vertices.is_some() {
            return Ok(());
        }

        if self.shader.is_none() {
            let shader = self.gpu.create_default_shader();
            check_compiled(&shader)?;
            log::debug!("sprite batch: compiled default shader");
            self.shader = Some(shader);
            self.owns_shader = true;
        }

        self.vertices = Some(VertexBuffer::with_quad_capacity(self.capacity));
        self.indices = quad_indices(self.capacity);
        log::debug!("sprite batch: allocated storage for {} quads", self.capacity);
        Ok(())
    }

    /// Releases batch resources and returns to `Unloaded`.
    ///
    /// Only the default shader the batch compiled itself is disposed.
    /// Caller-supplied shaders (constructor or [`set_shader`](Self::set_shader))
    /// are returned untouched.
    ///
    /// Closing mid-batch ends it first, so pending quads are flushed and the
    /// active shader is unbound. A failed final flush is logged and the
    /// resources are released anyway.
    pub fn close(&mut self) -> Vec<G::Shader> {
        if self.drawing {
            if let Err(err) = self.end() {
                log::warn!("sprite batch: final flush on close failed: {err}");
            }
        }

        let mut returned = Vec::new();
        if let Some(mut shader) = self.shader.take() {
            if self.owns_shader {
                shader.dispose();
                log::debug!("sprite batch: disposed default shader");
            } else {
                returned.push(shader);
            }
        }
        returned.extend(self.custom_shader.take());

        self.owns_shader = false;
        self.vertices = None;
        self.indices = Vec::new();
        self.bound_texture = None;
        returned
    }

    fn invalid_state(&self, op: &'static str) -> BatchError {
        BatchError::InvalidState { op, state: self.state() }
    }

    /// `Ok(false)` while unloaded (draws are skipped), an error while idle.
    pub(crate) fn accepts_draws(&self, op: &'static str) -> Result<bool, BatchError> {
        match self.state() {
            BatchState::Drawing => Ok(true),
            BatchState::Unloaded => Ok(false),
            BatchState::Idle => Err(self.invalid_state(op)),
        }
    }

    // ── shader ────────────────────────────────────────────────────────────

    fn active_shader_mut(&mut self) -> Option<&mut G::Shader> {
        match self.custom_shader.as_mut() {
            Some(shader) => Some(shader),
            None => self.shader.as_mut(),
        }
    }

    pub fn shader(&self) -> Option<&G::Shader> {
        self.custom_shader.as_ref().or(self.shader.as_ref())
    }

    /// Replaces the custom shader (`None` restores the default one) and
    /// returns the previous custom shader.
    ///
    /// Mid-batch, pending quads are flushed with the old shader first and the
    /// new one is bound with fresh matrices before drawing resumes.
    ///
    /// A shader that failed to compile is rejected before anything is flushed.
    pub fn set_shader(&mut self, shader: Option<G::Shader>) -> Result<Option<G::Shader>, BatchError> {
        if let Some(shader) = &shader {
            check_compiled(shader)?;
        }
        if self.drawing {
            self.flush()?;
            if let Some(active) = self.active_shader_mut() {
                active.end();
            }
        }

        let previous = std::mem::replace(&mut self.custom_shader, shader);
        log::debug!(
            "sprite batch: shader swapped ({} custom)",
            if self.custom_shader.is_some() { "using" } else { "no" }
        );

        if self.drawing {
            if let Some(active) = self.active_shader_mut() {
                active.begin();
            }
            self.setup_matrices();
        }
        Ok(previous)
    }

    /// Uploads a color uniform to the active shader.
    pub fn set_shader_uniform_color(&mut self, name: &str, color: Color) {
        if let Some(shader) = self.active_shader_mut() {
            shader.set_uniform_color(name, color);
        }
    }

    // ── matrices ──────────────────────────────────────────────────────────

    pub fn projection_matrix(&self) -> Mat4 {
        self.projection
    }

    pub fn transform_matrix(&self) -> Mat4 {
        self.transform
    }

    /// Replaces the projection. Takes effect at the next `begin()` or shader swap.
    pub fn set_projection_matrix(&mut self, projection: Mat4) {
        self.projection = projection;
    }

    /// Replaces the view transform. Takes effect at the next `begin()` or shader swap.
    pub fn set_transform_matrix(&mut self, transform: Mat4) {
        self.transform = transform;
    }

    /// Resets the projection to the orthographic projection of `viewport`.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.projection = viewport.projection();
    }

    fn setup_matrices(&mut self) {
        let combined = self.projection * self.transform;
        if let Some(shader) = self.active_shader_mut() {
            shader.set_uniform_matrix(PROJ_TRANS_UNIFORM, &combined);
            shader.set_uniform_int(TEXTURE_UNIFORM, 0);
        }
    }

    // ── color ─────────────────────────────────────────────────────────────

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    /// Sets the ambient color. While an alpha multiplier other than 1 is
    /// active it replaces `a`.
    pub fn set_color_rgba(&mut self, r: f32, g: f32, b: f32, a: f32) {
        let a = if self.alpha == 1.0 { a } else { self.alpha };
        self.color = Color::new(r, g, b, a);
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Sets the alpha multiplier and applies it to the ambient color.
    pub fn set_alpha(&mut self, alpha: f32) {
        self.alpha = alpha;
        self.color = self.color.with_alpha(alpha);
    }

    /// White at half opacity.
    pub fn half_alpha(&mut self) {
        self.alpha = 0.5;
        self.color = Color::WHITE.with_alpha(0.5);
    }

    /// Opaque white, multiplier 1.
    pub fn reset_color(&mut self) {
        self.alpha = 1.0;
        self.color = Color::WHITE;
    }

    /// Vertex-ready form of the ambient color.
    #[inline]
    pub fn packed_color(&self) -> PackedColor {
        self.color.pack()
    }

    /// Runs `f` with `color` as the ambient color, then restores the previous one.
    pub fn with_color<R>(&mut self, color: Color, f: impl FnOnce(&mut Self) -> R) -> R {
        let previous = self.color;
        self.color = color;
        let out = f(self);
        self.color = previous;
        out
    }

    // ── blend ─────────────────────────────────────────────────────────────

    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    /// Blend mode for subsequent implicit flushes. Already buffered quads are
    /// submitted with whichever mode is current when they flush.
    pub fn set_blend_mode(&mut self, mode: BlendMode) {
        self.blend_mode = mode;
    }

    // ── texture switching ─────────────────────────────────────────────────

    /// Prepares the batch to append a quad textured with `texture`.
    ///
    /// Returns `Ok(false)` (skip the draw) while the batch is unloaded.
    /// Flushes when the resolved texture changes or the buffer is full.
    pub(crate) fn check_texture<T: Texture + ?Sized>(&mut self, texture: &T) -> Result<bool, BatchError> {
        if !self.accepts_draws("draw")? {
            return Ok(false);
        }

        if !texture.is_loaded() {
            texture.load();
        }

        let resolved = texture::resolve(texture);
        if self.bound_texture != Some(resolved) {
            self.flush()?;
            self.bound_texture = Some(resolved);
        } else if self.vertices.as_ref().is_some_and(VertexBuffer::is_full) {
            self.flush()?;
        }

        // Sub-regions of one atlas share a binding but not a size.
        self.inv_tex_size = texture::inverse_size(texture);
        Ok(true)
    }

    #[inline]
    pub(crate) fn inv_tex_size(&self) -> Vec2 {
        self.inv_tex_size
    }

    pub fn bound_texture(&self) -> Option<TextureId> {
        self.bound_texture
    }

    // ── accumulation ──────────────────────────────────────────────────────

    /// Appends one quad in the ambient color. Must follow a successful `check_texture`.
    pub(crate) fn push_quad(&mut self, corners: [Vec2; 4], uvs: [[f32; 2]; 4]) {
        let color = self.packed_color();
        if let Some(buffer) = self.vertices.as_mut() {
            buffer.push_quad(build_quad(corners, uvs, color));
        }
    }

    /// Copies pre-built vertices, flushing each time the buffer fills.
    pub(crate) fn append_vertices(&mut self, mut pending: &[super::SpriteVertex]) -> Result<(), BatchError> {
        while !pending.is_empty() {
            if self.vertices.as_ref().is_some_and(VertexBuffer::is_full) {
                self.flush()?;
            }
            let Some(buffer) = self.vertices.as_mut() else { return Ok(()) };
            let taken = buffer.extend_from(pending);
            pending = &pending[taken..];
        }
        Ok(())
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Quads buffered since the last flush.
    pub fn pending_quads(&self) -> usize {
        self.vertices.as_ref().map_or(0, VertexBuffer::quad_count)
    }

    /// Write cursor in scalar vertex fields.
    pub fn cursor(&self) -> usize {
        self.vertices.as_ref().map_or(0, VertexBuffer::cursor)
    }

    // ── submit ────────────────────────────────────────────────────────────

    /// Submits pending quads with the batch's blend mode.
    pub fn flush(&mut self) -> Result<(), BatchError> {
        self.submit(self.blend_mode)
    }

    /// Submits pending quads with `mode`.
    ///
    /// No-op when nothing is pending. Binds the current texture to unit 0,
    /// applies `mode`, issues one indexed draw and restores the previous
    /// native blend function. The cursor is reset even when the draw fails.
    pub fn submit(&mut self, mode: BlendMode) -> Result<(), BatchError> {
        let Some(buffer) = self.vertices.as_mut() else { return Ok(()) };
        if buffer.is_empty() {
            return Ok(());
        }

        let quads = buffer.quad_count();
        self.stats.record_flush(quads);

        if let Some(texture) = self.bound_texture {
            self.gpu.bind_texture(0, texture);
        }

        let previous = self.gpu.blend_function();
        self.gpu.set_blend_function(mode.blend_func());

        let shader = match self.custom_shader.as_ref() {
            Some(shader) => Some(shader),
            None => self.shader.as_ref(),
        };
        let result = match shader {
            Some(shader) => self.gpu.draw_indexed(
                shader,
                buffer.as_slice(),
                &self.indices[..quads * INDICES_PER_QUAD],
            ),
            None => Ok(()),
        };

        self.gpu.set_blend_function(previous);
        buffer.clear();

        log::trace!(
            "sprite batch: flushed {quads} quads (texture {:?}, {mode:?})",
            self.bound_texture
        );

        result.map_err(|err| {
            log::warn!("sprite batch: draw call failed, {quads} quads lost: {err}");
            BatchError::from(err)
        })
    }

    // ── accessors ─────────────────────────────────────────────────────────

    pub fn stats(&self) -> BatchStats {
        self.stats
    }

    pub fn is_lock_submit(&self) -> bool {
        self.lock_submit
    }

    /// When set, text draws do not flush pending sprite geometry first.
    pub fn set_lock_submit(&mut self, lock: bool) {
        self.lock_submit = lock;
    }

    pub fn gpu(&self) -> &G {
        &self.gpu
    }

    pub fn gpu_mut(&mut self) -> &mut G {
        &mut self.gpu
    }
}

fn check_compiled<S: Shader>(shader: &S) -> Result<(), BatchError> {
    if shader.is_compiled() {
        Ok(())
    } else {
        Err(BatchError::ShaderCompile {
            log: shader.log().to_owned(),
        })
    }
}
