use crate::coords::Viewport;

use super::blend::BlendMode;
use super::vertex::MAX_QUADS;

/// Construction parameters for a [`SpriteBatch`](super::SpriteBatch).
#[derive(Debug, Clone, PartialEq)]
pub struct BatchConfig {
    /// Maximum quads buffered before a flush. At most [`MAX_QUADS`].
    pub capacity: usize,

    /// Drawable area in logical pixels; source of the default projection.
    pub viewport: Viewport,

    /// Blend mode used by implicit flushes.
    pub blend_mode: BlendMode,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            viewport: Viewport::default(),
            blend_mode: BlendMode::default(),
        }
    }
}

impl BatchConfig {
    pub fn with_capacity(capacity: usize) -> Self {
        Self { capacity, ..Self::default() }
    }

    pub fn for_viewport(viewport: Viewport) -> Self {
        Self { viewport, ..Self::default() }
    }

    #[inline]
    pub fn capacity_is_valid(&self) -> bool {
        (1..=MAX_QUADS).contains(&self.capacity)
    }
}
