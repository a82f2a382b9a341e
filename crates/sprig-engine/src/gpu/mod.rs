//! GPU capabilities consumed by the batch.
//!
//! The batch is written against these traits instead of a global device:
//! - [`GpuContext`]: texture binding, blend state, depth mask, indexed draws
//! - [`Shader`]: program binding and uniform upload
//!
//! Two implementations ship with the crate: [`HeadlessGpu`], which records
//! every call, and the wgpu backend in [`crate::render`].

mod headless;

pub use headless::{DrawCall, GpuEvent, HeadlessGpu, HeadlessShader, Uniform};

use glam::Mat4;

use crate::batch::{BlendFunc, SpriteVertex, TextureId};
use crate::paint::Color;

/// Uniform receiving the combined projection * transform matrix.
pub const PROJ_TRANS_UNIFORM: &str = "u_projTrans";

/// Sampler uniform; the batch always binds texture unit 0.
pub const TEXTURE_UNIFORM: &str = "u_texture";

/// Error returned by a failed draw call. Never transient.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DrawError {
    #[error("backend rejected draw: {0}")]
    Backend(String),
    #[error("index {index} addresses past the {vertices} submitted vertices")]
    IndexOutOfRange { index: u16, vertices: usize },
    #[error("no texture bound to unit 0")]
    NoTexture,
}

/// Shader program capability.
pub trait Shader {
    /// Makes this program current.
    fn begin(&mut self);

    /// Releases this program as current.
    fn end(&mut self);

    fn set_uniform_matrix(&mut self, name: &str, value: &Mat4);

    fn set_uniform_int(&mut self, name: &str, value: i32);

    fn set_uniform_color(&mut self, name: &str, color: Color);

    fn is_compiled(&self) -> bool;

    /// Compiler diagnostics; empty when there were none.
    fn log(&self) -> &str;

    /// Releases GPU resources held by the program.
    fn dispose(&mut self);
}

/// Rendering context capability.
///
/// Calls are immediate from the batch's point of view: each either completes
/// or fails before returning.
pub trait GpuContext {
    type Shader: Shader;

    /// Builds the stock sprite program. Compile failures are reported via
    /// [`Shader::is_compiled`] and [`Shader::log`].
    fn create_default_shader(&mut self) -> Self::Shader;

    fn bind_texture(&mut self, unit: u32, texture: TextureId);

    /// Currently active native blend function.
    fn blend_function(&self) -> BlendFunc;

    fn set_blend_function(&mut self, func: BlendFunc);

    fn depth_mask(&mut self, write: bool);

    /// Issues one indexed triangle-list draw over `vertices` with `shader`.
    fn draw_indexed(
        &mut self,
        shader: &Self::Shader,
        vertices: &[SpriteVertex],
        indices: &[u16],
    ) -> Result<(), DrawError>;
}
