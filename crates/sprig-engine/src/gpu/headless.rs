use std::collections::HashMap;

use glam::Mat4;

use crate::batch::{BlendFunc, SpriteVertex, TextureId};
use crate::paint::Color;

use super::{DrawError, GpuContext, Shader, PROJ_TRANS_UNIFORM};

/// Value last uploaded to a named uniform.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Uniform {
    Matrix(Mat4),
    Int(i32),
    Color(Color),
}

/// Shader that records its uniforms and bind state.
#[derive(Debug, Clone)]
pub struct HeadlessShader {
    id: u32,
    compiled: bool,
    log: String,
    active: bool,
    begin_count: u32,
    disposed: bool,
    uniforms: HashMap<String, Uniform>,
}

impl HeadlessShader {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            compiled: true,
            log: String::new(),
            active: false,
            begin_count: 0,
            disposed: false,
            uniforms: HashMap::new(),
        }
    }

    /// A program whose compilation failed with `log`.
    pub fn failed(id: u32, log: impl Into<String>) -> Self {
        Self {
            compiled: false,
            log: log.into(),
            ..Self::new(id)
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn begin_count(&self) -> u32 {
        self.begin_count
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn uniform(&self, name: &str) -> Option<Uniform> {
        self.uniforms.get(name).copied()
    }

    /// Matrix last uploaded to `u_projTrans`.
    pub fn projection(&self) -> Option<Mat4> {
        match self.uniform(PROJ_TRANS_UNIFORM) {
            Some(Uniform::Matrix(m)) => Some(m),
            _ => None,
        }
    }
}

impl Shader for HeadlessShader {
    fn begin(&mut self) {
        self.active = true;
        self.begin_count += 1;
    }

    fn end(&mut self) {
        self.active = false;
    }

    fn set_uniform_matrix(&mut self, name: &str, value: &Mat4) {
        self.uniforms.insert(name.to_owned(), Uniform::Matrix(*value));
    }

    fn set_uniform_int(&mut self, name: &str, value: i32) {
        self.uniforms.insert(name.to_owned(), Uniform::Int(value));
    }

    fn set_uniform_color(&mut self, name: &str, color: Color) {
        self.uniforms.insert(name.to_owned(), Uniform::Color(color));
    }

    fn is_compiled(&self) -> bool {
        self.compiled
    }

    fn log(&self) -> &str {
        &self.log
    }

    fn dispose(&mut self) {
        self.disposed = true;
        self.active = false;
    }
}

/// One recorded draw call.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    pub texture: TextureId,
    pub blend: BlendFunc,
    pub shader: u32,
    pub projection: Option<Mat4>,
    pub vertices: Vec<SpriteVertex>,
    pub index_count: usize,
}

impl DrawCall {
    #[inline]
    pub fn quad_count(&self) -> usize {
        self.index_count / 6
    }
}

/// Every state change seen by the context, in call order.
#[derive(Debug, Clone, PartialEq)]
pub enum GpuEvent {
    BindTexture { unit: u32, texture: TextureId },
    SetBlend(BlendFunc),
    DepthMask(bool),
    Draw(DrawCall),
}

/// GPU context with no device behind it.
///
/// Records calls for inspection; useful for tests, tooling and running the
/// batch on machines without an adapter.
#[derive(Debug, Default)]
pub struct HeadlessGpu {
    events: Vec<GpuEvent>,
    bound: Option<TextureId>,
    blend: BlendFunc,
    depth_write: bool,
    next_shader_id: u32,
    default_shader_error: Option<String>,
    fail_next_draw: Option<String>,
}

impl HeadlessGpu {
    pub fn new() -> Self {
        Self {
            depth_write: true,
            ..Self::default()
        }
    }

    /// Makes the next `create_default_shader` return an uncompiled program.
    pub fn fail_default_shader(&mut self, log: impl Into<String>) {
        self.default_shader_error = Some(log.into());
    }

    /// Makes the next draw call fail with `message`.
    pub fn fail_next_draw(&mut self, message: impl Into<String>) {
        self.fail_next_draw = Some(message.into());
    }

    /// Compiles a caller-owned program with a fresh id.
    pub fn create_shader(&mut self) -> HeadlessShader {
        self.next_shader_id += 1;
        HeadlessShader::new(self.next_shader_id)
    }

    pub fn events(&self) -> &[GpuEvent] {
        &self.events
    }

    pub fn draws(&self) -> impl Iterator<Item = &DrawCall> {
        self.events.iter().filter_map(|e| match e {
            GpuEvent::Draw(d) => Some(d),
            _ => None,
        })
    }

    pub fn draw_count(&self) -> usize {
        self.draws().count()
    }

    pub fn texture_binds(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, GpuEvent::BindTexture { .. }))
            .count()
    }

    pub fn bound_texture(&self) -> Option<TextureId> {
        self.bound
    }

    pub fn depth_write(&self) -> bool {
        self.depth_write
    }

    /// Forgets recorded events; bound state is kept.
    pub fn clear_events(&mut self) {
        self.events.clear();
    }
}

impl GpuContext for HeadlessGpu {
    type Shader = HeadlessShader;

    fn create_default_shader(&mut self) -> HeadlessShader {
        self.next_shader_id += 1;
        match self.default_shader_error.take() {
            Some(log) => HeadlessShader::failed(self.next_shader_id, log),
            None => HeadlessShader::new(self.next_shader_id),
        }
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureId) {
        if unit == 0 {
            self.bound = Some(texture);
        }
        self.events.push(GpuEvent::BindTexture { unit, texture });
    }

    fn blend_function(&self) -> BlendFunc {
        self.blend
    }

    fn set_blend_function(&mut self, func: BlendFunc) {
        self.blend = func;
        self.events.push(GpuEvent::SetBlend(func));
    }

    fn depth_mask(&mut self, write: bool) {
        self.depth_write = write;
        self.events.push(GpuEvent::DepthMask(write));
    }

    fn draw_indexed(
        &mut self,
        shader: &HeadlessShader,
        vertices: &[SpriteVertex],
        indices: &[u16],
    ) -> Result<(), DrawError> {
        if let Some(message) = self.fail_next_draw.take() {
            return Err(DrawError::Backend(message));
        }
        let texture = self.bound.ok_or(DrawError::NoTexture)?;
        if let Some(&index) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
            return Err(DrawError::IndexOutOfRange { index, vertices: vertices.len() });
        }

        self.events.push(GpuEvent::Draw(DrawCall {
            texture,
            blend: self.blend,
            shader: shader.id,
            projection: shader.projection(),
            vertices: vertices.to_vec(),
            index_count: indices.len(),
        }));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paint::PackedColor;

    fn quad() -> Vec<SpriteVertex> {
        vec![SpriteVertex::new(0.0, 0.0, PackedColor::WHITE, 0.0, 0.0); 4]
    }

    #[test]
    fn draw_without_bound_texture_fails() {
        let mut gpu = HeadlessGpu::new();
        let shader = gpu.create_shader();
        let err = gpu.draw_indexed(&shader, &quad(), &[0, 1, 2, 2, 3, 0]).unwrap_err();
        assert_eq!(err, DrawError::NoTexture);
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let mut gpu = HeadlessGpu::new();
        let shader = gpu.create_shader();
        gpu.bind_texture(0, TextureId(1));
        let err = gpu.draw_indexed(&shader, &quad(), &[0, 1, 4]).unwrap_err();
        assert_eq!(err, DrawError::IndexOutOfRange { index: 4, vertices: 4 });
    }

    #[test]
    fn injected_failure_fires_once() {
        let mut gpu = HeadlessGpu::new();
        let shader = gpu.create_shader();
        gpu.bind_texture(0, TextureId(1));
        gpu.fail_next_draw("lost device");

        assert!(gpu.draw_indexed(&shader, &quad(), &[0, 1, 2]).is_err());
        assert!(gpu.draw_indexed(&shader, &quad(), &[0, 1, 2]).is_ok());
        assert_eq!(gpu.draw_count(), 1);
    }

    #[test]
    fn shaders_get_distinct_ids() {
        let mut gpu = HeadlessGpu::new();
        let a = gpu.create_default_shader();
        let b = gpu.create_shader();
        assert_ne!(a.id(), b.id());
    }
}
