//! Logical blend modes and the native blend-function pairs they map to.

/// Logical blend mode applied to a flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    /// Source replaces destination.
    Opaque,
    /// Premultiplied alpha: `src + dst * (1 - src.a)`.
    AlphaBlend,
    /// `src * src.a + dst`. Glow, particles.
    Additive,
    /// Straight alpha: `src * src.a + dst * (1 - src.a)`.
    #[default]
    NonPremultiplied,
}

impl BlendMode {
    /// Native blend-function pair for this mode.
    pub const fn blend_func(self) -> BlendFunc {
        match self {
            BlendMode::Opaque => BlendFunc::REPLACE,
            BlendMode::AlphaBlend => BlendFunc::PREMULTIPLIED,
            BlendMode::Additive => BlendFunc::ADDITIVE,
            BlendMode::NonPremultiplied => BlendFunc::STRAIGHT_ALPHA,
        }
    }
}

/// Source/destination factor pair, applied to color and alpha alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendFunc {
    pub src: wgpu::BlendFactor,
    pub dst: wgpu::BlendFactor,
}

impl Default for BlendFunc {
    fn default() -> Self {
        Self::STRAIGHT_ALPHA
    }
}

impl BlendFunc {
    pub const REPLACE: BlendFunc = BlendFunc::new(wgpu::BlendFactor::One, wgpu::BlendFactor::Zero);
    pub const PREMULTIPLIED: BlendFunc =
        BlendFunc::new(wgpu::BlendFactor::One, wgpu::BlendFactor::OneMinusSrcAlpha);
    pub const ADDITIVE: BlendFunc = BlendFunc::new(wgpu::BlendFactor::SrcAlpha, wgpu::BlendFactor::One);
    pub const STRAIGHT_ALPHA: BlendFunc =
        BlendFunc::new(wgpu::BlendFactor::SrcAlpha, wgpu::BlendFactor::OneMinusSrcAlpha);

    #[inline]
    pub const fn new(src: wgpu::BlendFactor, dst: wgpu::BlendFactor) -> Self {
        Self { src, dst }
    }

    /// Pipeline blend state for this pair.
    pub fn to_blend_state(self) -> wgpu::BlendState {
        let component = wgpu::BlendComponent {
            src_factor: self.src,
            dst_factor: self.dst,
            operation: wgpu::BlendOperation::Add,
        };
        wgpu::BlendState {
            color: component,
            alpha: component,
        }
    }
}
