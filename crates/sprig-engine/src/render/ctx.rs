use crate::paint::Color;

use super::device::GpuDevice;

/// Backend-facing context (device/queue + target format).
pub struct RenderCtx<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    /// Format of the color attachment the batch renders into.
    pub surface_format: wgpu::TextureFormat,
}

impl<'a> RenderCtx<'a> {
    #[inline]
    pub fn new(
        device: &'a wgpu::Device,
        queue: &'a wgpu::Queue,
        surface_format: wgpu::TextureFormat,
    ) -> Self {
        Self {
            device,
            queue,
            surface_format,
        }
    }

    #[inline]
    pub fn from_device(gpu: &'a GpuDevice, surface_format: wgpu::TextureFormat) -> Self {
        Self::new(&gpu.device, &gpu.queue, surface_format)
    }
}

/// Target for drawing (encoder + color view).
pub struct RenderTarget<'a> {
    pub encoder: &'a mut wgpu::CommandEncoder,
    pub color_view: &'a wgpu::TextureView,
    /// Clear color for the pass; `None` loads existing contents.
    pub clear: Option<Color>,
}

impl<'a> RenderTarget<'a> {
    #[inline]
    pub fn new(encoder: &'a mut wgpu::CommandEncoder, color_view: &'a wgpu::TextureView) -> Self {
        Self {
            encoder,
            color_view,
            clear: None,
        }
    }

    #[inline]
    pub fn with_clear(mut self, color: Color) -> Self {
        self.clear = Some(color);
        self
    }

    pub(crate) fn load_op(&self) -> wgpu::LoadOp<wgpu::Color> {
        match self.clear {
            Some(c) => wgpu::LoadOp::Clear(wgpu::Color {
                r: c.r as f64,
                g: c.g as f64,
                b: c.b as f64,
                a: c.a as f64,
            }),
            None => wgpu::LoadOp::Load,
        }
    }
}
