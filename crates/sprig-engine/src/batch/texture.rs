use std::fmt;

use crate::coords::{Rect, Vec2};

/// Opaque identifier of a GPU-resident texture.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u64);

impl fmt::Display for TextureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tex#{}", self.0)
    }
}

/// Texture capability consumed by the batch.
///
/// Implementors describe either a whole GPU texture or a sub-region of an
/// atlas. The batch never owns textures; it only compares identities and
/// reads sizes.
pub trait Texture {
    fn id(&self) -> TextureId;

    /// Logical width in texels.
    fn width(&self) -> f32;

    /// Logical height in texels.
    fn height(&self) -> f32;

    /// Normalized top-left of the region inside its GPU texture.
    fn uv_offset(&self) -> Vec2 {
        Vec2::zero()
    }

    /// Normalized bottom-right of the region inside its GPU texture.
    fn uv_ratio(&self) -> Vec2 {
        Vec2::one()
    }

    /// GPU-resident atlas this region lives in, if any.
    fn parent(&self) -> Option<TextureId> {
        None
    }

    /// `true` when the logical size equals the GPU size, so UVs need no ratio correction.
    fn is_scale(&self) -> bool {
        true
    }

    fn is_loaded(&self) -> bool {
        true
    }

    /// Load trigger, called by the batch before first use of an unloaded texture.
    fn load(&self) {}
}

/// The texture that actually gets bound: the atlas for sub-regions, itself otherwise.
#[inline]
pub fn resolve<T: Texture + ?Sized>(texture: &T) -> TextureId {
    texture.parent().unwrap_or_else(|| texture.id())
}

/// Inverse texture size used to normalize source rectangles.
#[inline]
pub fn inverse_size<T: Texture + ?Sized>(texture: &T) -> Vec2 {
    let inv = Vec2::new(1.0 / texture.width(), 1.0 / texture.height());
    if texture.is_scale() {
        inv
    } else {
        let ratio = texture.uv_ratio();
        Vec2::new(inv.x * ratio.x, inv.y * ratio.y)
    }
}

/// Plain texture descriptor.
///
/// Covers the common cases: a whole texture ([`TextureRegion::new`]), a
/// texture padded inside a larger allocation ([`TextureRegion::padded`]) and
/// an atlas sub-region ([`TextureRegion::sub_region`]).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TextureRegion {
    pub id: TextureId,
    pub width: f32,
    pub height: f32,
    pub offset: Vec2,
    pub ratio: Vec2,
    pub parent: Option<TextureId>,
    pub scale: bool,
}

impl TextureRegion {
    /// Whole texture whose logical and GPU sizes match.
    pub const fn new(id: TextureId, width: f32, height: f32) -> Self {
        Self {
            id,
            width,
            height,
            offset: Vec2::zero(),
            ratio: Vec2::one(),
            parent: None,
            scale: true,
        }
    }

    /// Texture of logical size `width` x `height` stored in a larger
    /// `gpu_width` x `gpu_height` allocation (e.g. padded to a power of two).
    pub fn padded(id: TextureId, width: f32, height: f32, gpu_width: f32, gpu_height: f32) -> Self {
        Self {
            ratio: Vec2::new(width / gpu_width, height / gpu_height),
            scale: false,
            ..Self::new(id, width, height)
        }
    }

    /// Region `src` (texels) of `atlas`, addressed as its own texture `id`.
    pub fn sub_region<T: Texture + ?Sized>(atlas: &T, id: TextureId, src: Rect) -> Self {
        let aw = atlas.width();
        let ah = atlas.height();
        let max = src.max();
        Self {
            id,
            width: src.size.x,
            height: src.size.y,
            offset: Vec2::new(src.origin.x / aw, src.origin.y / ah),
            ratio: Vec2::new(max.x / aw, max.y / ah),
            parent: Some(resolve(atlas)),
            scale: false,
        }
    }

    #[inline]
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }
}

impl Texture for TextureRegion {
    fn id(&self) -> TextureId {
        self.id
    }

    fn width(&self) -> f32 {
        self.width
    }

    fn height(&self) -> f32 {
        self.height
    }

    fn uv_offset(&self) -> Vec2 {
        self.offset
    }

    fn uv_ratio(&self) -> Vec2 {
        self.ratio
    }

    fn parent(&self) -> Option<TextureId> {
        self.parent
    }

    fn is_scale(&self) -> bool {
        self.scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_texture_resolves_to_itself() {
        let t = TextureRegion::new(TextureId(7), 64.0, 32.0);
        assert_eq!(resolve(&t), TextureId(7));
        assert_eq!(inverse_size(&t), Vec2::new(1.0 / 64.0, 1.0 / 32.0));
    }

    #[test]
    fn sub_region_resolves_to_atlas() {
        let atlas = TextureRegion::new(TextureId(1), 256.0, 256.0);
        let region = TextureRegion::sub_region(&atlas, TextureId(2), Rect::new(64.0, 128.0, 32.0, 64.0));

        assert_eq!(resolve(&region), TextureId(1));
        assert_eq!(region.uv_offset(), Vec2::new(0.25, 0.5));
        assert_eq!(region.uv_ratio(), Vec2::new(0.375, 0.75));
        assert!(!region.is_scale());
    }

    #[test]
    fn nested_region_resolves_to_root_atlas() {
        let atlas = TextureRegion::new(TextureId(1), 256.0, 256.0);
        let a = TextureRegion::sub_region(&atlas, TextureId(2), Rect::new(0.0, 0.0, 128.0, 128.0));
        let b = TextureRegion::sub_region(&a, TextureId(3), Rect::new(0.0, 0.0, 16.0, 16.0));
        assert_eq!(resolve(&b), TextureId(1));
    }

    #[test]
    fn padded_texture_corrects_inverse_size_by_ratio() {
        let t = TextureRegion::padded(TextureId(3), 100.0, 50.0, 128.0, 64.0);
        let inv = inverse_size(&t);
        assert!((inv.x - 1.0 / 128.0).abs() < 1e-7);
        assert!((inv.y - 1.0 / 64.0).abs() < 1e-7);
    }
}
