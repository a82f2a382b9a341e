//! wgpu backend for the sprite batch.
//!
//! [`WgpuBatchContext`] implements [`GpuContext`](crate::gpu::GpuContext):
//! batch flushes are recorded during the frame and encoded into one render
//! pass with [`WgpuBatchContext::encode`].
//!
//! Convention:
//! - CPU geometry is in logical pixels (top-left origin, +Y down).
//! - The vertex shader maps to clip space with the batch's `u_projTrans`.

mod batch_ctx;
mod ctx;
mod device;
mod shader;

pub use batch_ctx::{WgpuBatchContext, WgpuInit};
pub use ctx::{RenderCtx, RenderTarget};
pub use device::{DeviceInit, GpuDevice};
pub use shader::{WgpuShader, SPRITE_WGSL, TINT_UNIFORM};
