use glam::Mat4;

use crate::gpu::{Shader, PROJ_TRANS_UNIFORM, TEXTURE_UNIFORM};
use crate::paint::Color;

/// Uniform multiplied into every vertex color by the stock shader.
pub const TINT_UNIFORM: &str = "u_tint";

/// Stock sprite program.
///
/// Custom programs must expose the same interface: `vs_main`/`fs_main`,
/// globals at group 0 and texture + sampler at group 1.
pub const SPRITE_WGSL: &str = include_str!("shaders/sprite.wgsl");

/// Uniform block as laid out in WGSL (`Globals`).
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct Globals {
    pub proj_trans: [[f32; 4]; 4],
    pub tint: [f32; 4],
}

/// A WGSL program plus the uniform values the batch uploaded to it.
///
/// Uniforms are captured on the CPU and copied into the frame's uniform
/// buffer with each recorded draw.
#[derive(Debug)]
pub struct WgpuShader {
    id: u32,
    module: Option<wgpu::ShaderModule>,
    log: String,
    proj_trans: Mat4,
    tint: Color,
    active: bool,
}

impl WgpuShader {
    pub(crate) fn new(id: u32, module: Option<wgpu::ShaderModule>, log: String) -> Self {
        Self {
            id,
            module,
            log,
            proj_trans: Mat4::IDENTITY,
            tint: Color::WHITE,
            active: false,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub(crate) fn module(&self) -> Option<&wgpu::ShaderModule> {
        self.module.as_ref()
    }

    pub(crate) fn globals(&self) -> Globals {
        let c = self.tint;
        Globals {
            proj_trans: self.proj_trans.to_cols_array_2d(),
            tint: [c.r, c.g, c.b, c.a],
        }
    }
}

impl Shader for WgpuShader {
    fn begin(&mut self) {
        self.active = true;
    }

    fn end(&mut self) {
        self.active = false;
    }

    fn set_uniform_matrix(&mut self, name: &str, value: &Mat4) {
        if name == PROJ_TRANS_UNIFORM {
            self.proj_trans = *value;
        } else {
            log::trace!("wgpu shader {}: no matrix uniform `{name}`", self.id);
        }
    }

    fn set_uniform_int(&mut self, name: &str, value: i32) {
        // The sampler is always bound at group 1; only unit 0 exists.
        if name != TEXTURE_UNIFORM || value != 0 {
            log::trace!("wgpu shader {}: ignoring int uniform `{name}` = {value}", self.id);
        }
    }

    fn set_uniform_color(&mut self, name: &str, color: Color) {
        if name == TINT_UNIFORM {
            self.tint = color;
        } else {
            log::trace!("wgpu shader {}: no color uniform `{name}`", self.id);
        }
    }

    fn is_compiled(&self) -> bool {
        self.module.is_some()
    }

    fn log(&self) -> &str {
        &self.log
    }

    fn dispose(&mut self) {
        self.module = None;
        self.active = false;
    }
}

/// Compiles `source`, capturing validation errors instead of letting them
/// reach the device's uncaptured-error handler.
pub(crate) fn compile(device: &wgpu::Device, id: u32, label: &str, source: &str) -> WgpuShader {
    let (module, error) = with_validation_scope(device, || {
        device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        })
    });

    match error {
        Some(err) => {
            let log = err.to_string();
            log::warn!("wgpu shader {label}: compilation failed");
            WgpuShader::new(id, None, log)
        }
        None => WgpuShader::new(id, Some(module), String::new()),
    }
}

/// Runs `f` inside a validation error scope and returns the first captured error.
pub(crate) fn with_validation_scope<T>(device: &wgpu::Device, f: impl FnOnce() -> T) -> (T, Option<wgpu::Error>) {
    let scope = device.push_error_scope(wgpu::ErrorFilter::Validation);
    let out = f();
    let error = pollster::block_on(scope.pop());
    (out, error)
}
