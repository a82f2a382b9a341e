//! Coordinate and geometry types used by the batch.
//!
//! Canonical CPU space:
//! - Logical pixels
//! - Origin top-left
//! - +X right, +Y down
//!
//! The projection matrix uploaded at `begin()` maps this space to clip space.

mod rect;
mod vec2;
mod viewport;

pub use rect::Rect;
pub use vec2::Vec2;
pub use viewport::Viewport;
