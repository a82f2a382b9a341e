//! Sprig engine crate.
//!
//! Quad batching for 2D sprites: draw requests are accumulated into one
//! vertex buffer and submitted with as few draw calls as texture, blend and
//! shader changes allow.
//!
//! - [`batch`]: the batcher, geometry and draw operations
//! - [`gpu`]: capabilities the batch consumes, plus a recording headless context
//! - [`render`]: wgpu implementation of those capabilities

pub mod batch;
pub mod coords;
pub mod gpu;
pub mod logging;
pub mod paint;
pub mod render;

pub use batch::{BatchConfig, BatchError, BlendMode, SpriteBatch, SpriteDraw, Texture, TextureId, TextureRegion};
pub use paint::Color;
