//! Sprite batching.
//!
//! Pipeline per draw:
//! - lifecycle check
//! - texture switch check (may flush)
//! - quad generation
//! - append to the vertex buffer
//!
//! `end()` performs the final flush.

mod blend;
mod config;
mod draw;
mod error;
mod geometry;
mod sprite_batch;
mod stats;
mod text;
mod texture;
mod vertex;

pub use blend::{BlendFunc, BlendMode};
pub use config::BatchConfig;
pub use draw::{SpriteDraw, SpriteEffects};
pub use error::{BatchError, BatchState};
pub use geometry::{build_quad, quad_corners, Pivot, QuadTransform, UvRect};
pub use sprite_batch::SpriteBatch;
pub use stats::BatchStats;
pub use text::{GlyphLayout, TextTransform};
pub use texture::{inverse_size, resolve, Texture, TextureId, TextureRegion};
pub use vertex::{
    quad_indices, SpriteVertex, VertexBuffer, INDICES_PER_QUAD, MAX_QUADS, QUAD_FIELDS, VERTEX_FIELDS,
    VERTICES_PER_QUAD,
};
