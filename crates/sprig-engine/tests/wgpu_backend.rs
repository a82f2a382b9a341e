//! Runs the batch against a real wgpu device. Skipped when no adapter is available.

use sprig_engine::batch::{BatchConfig, BlendMode, SpriteBatch};
use sprig_engine::coords::{Rect, Viewport};
use sprig_engine::gpu::Shader;
use sprig_engine::logging::{init_logging, LoggingConfig};
use sprig_engine::paint::Color;
use sprig_engine::render::{DeviceInit, GpuDevice, RenderCtx, RenderTarget, WgpuBatchContext, WgpuInit};

const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

fn device() -> Option<GpuDevice> {
    init_logging(LoggingConfig::for_tests());
    match GpuDevice::request(DeviceInit {
        force_fallback_adapter: true,
        ..DeviceInit::default()
    })
    .or_else(|_| GpuDevice::request(DeviceInit::default()))
    {
        Ok(gpu) => Some(gpu),
        Err(err) => {
            log::warn!("skipping wgpu test: {err:#}");
            None
        }
    }
}

fn context(gpu: &GpuDevice) -> WgpuBatchContext {
    let ctx = RenderCtx::from_device(gpu, FORMAT);
    WgpuBatchContext::new(&ctx, WgpuInit::default()).unwrap()
}

#[test]
fn frame_records_and_encodes_flushes() {
    let Some(gpu) = device() else { return };
    let mut wgpu_ctx = context(&gpu);

    let sprite = wgpu_ctx.upload_rgba8(2, 2, &[255; 16]).unwrap();
    let solid = wgpu_ctx.solid_texture().unwrap();

    let mut batch = SpriteBatch::new(wgpu_ctx, BatchConfig::for_viewport(Viewport::new(64.0, 64.0))).unwrap();
    batch.begin().unwrap();
    batch.draw_sized(&sprite, 0.0, 0.0, 16.0, 16.0).unwrap();
    batch.fill_rect(&solid, Rect::new(16.0, 16.0, 8.0, 8.0), Color::BLACK).unwrap();
    batch.set_blend_mode(BlendMode::Additive);
    batch.draw_sized(&sprite, 32.0, 32.0, 16.0, 16.0).unwrap();
    batch.end().unwrap();

    assert_eq!(batch.gpu().pending_draws(), 3);

    let target = gpu.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("test target"),
        size: wgpu::Extent3d {
            width: 64,
            height: 64,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let view = target.create_view(&wgpu::TextureViewDescriptor::default());
    let mut encoder = gpu
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("test encoder") });

    {
        let mut rt = RenderTarget::new(&mut encoder, &view).with_clear(Color::TRANSPARENT);
        batch.gpu_mut().encode(&mut rt);
    }
    gpu.queue.submit(std::iter::once(encoder.finish()));

    assert_eq!(batch.gpu().pending_draws(), 0);
}

#[test]
fn invalid_wgsl_reports_compile_log() {
    let Some(gpu) = device() else { return };
    let mut wgpu_ctx = context(&gpu);

    let shader = wgpu_ctx.create_shader("broken", "@vertex fn vs_main( -> {}");
    assert!(!shader.is_compiled());
    assert!(!shader.log().is_empty());
}

#[test]
fn upload_rejects_mismatched_pixel_data() {
    let Some(gpu) = device() else { return };
    let mut wgpu_ctx = context(&gpu);

    assert!(wgpu_ctx.upload_rgba8(4, 4, &[0; 8]).is_err());
    assert!(wgpu_ctx.upload_rgba8(0, 4, &[]).is_err());
}
