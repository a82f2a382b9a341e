//! Color model for the batch.
//!
//! Colors are kept as explicit straight-alpha RGBA and only packed into the
//! four-byte vertex representation when a vertex is written.

pub mod color;

pub use color::{Color, PackedColor};
