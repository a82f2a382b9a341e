use anyhow::{Context, Result};

/// Parameters for acquiring a device without a window.
#[derive(Debug, Clone)]
pub struct DeviceInit {
    pub power_preference: wgpu::PowerPreference,

    /// Use the software fallback adapter (CI machines without a GPU).
    pub force_fallback_adapter: bool,

    /// Favor an empty set for portability unless a feature is strictly necessary.
    pub required_features: wgpu::Features,

    pub required_limits: wgpu::Limits,
}

impl Default for DeviceInit {
    fn default() -> Self {
        Self {
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
        }
    }
}

/// Device and queue for offscreen rendering.
///
/// Applications that already own a device (window surface, editor host)
/// pass it to [`WgpuBatchContext`](super::WgpuBatchContext) directly instead.
pub struct GpuDevice {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl GpuDevice {
    /// Acquires an adapter and device, blocking on wgpu's async requests.
    pub fn request(init: DeviceInit) -> Result<Self> {
        pollster::block_on(Self::request_async(init))
    }

    pub async fn request_async(init: DeviceInit) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: init.power_preference,
                compatible_surface: None,
                force_fallback_adapter: init.force_fallback_adapter,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        log::debug!("sprig device: using adapter {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("sprig-engine device"),
                required_features: init.required_features,
                required_limits: init.required_limits,
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        Ok(Self { device, queue })
    }
}
