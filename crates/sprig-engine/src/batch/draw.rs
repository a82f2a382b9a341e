//! Draw operations.
//!
//! Every entry point funnels into [`SpriteBatch::draw_with`] (transformed
//! quads) or [`SpriteBatch::draw_uv_quad`] (pre-normalized UVs).

use std::ops::Range;

use crate::coords::{Rect, Vec2};
use crate::gpu::GpuContext;
use crate::paint::Color;

use super::geometry::{quad_corners, Pivot, QuadTransform, UvRect};
use super::sprite_batch::SpriteBatch;
use super::texture::Texture;
use super::vertex::{SpriteVertex, VERTICES_PER_QUAD};
use super::BatchError;

/// Mirroring applied to a sprite's texture coordinates.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum SpriteEffects {
    #[default]
    None,
    FlipHorizontally,
    FlipVertically,
}

/// Full description of one transformed quad.
///
/// ```ignore
/// batch.draw_with(&tex, &SpriteDraw::at(10.0, 20.0).rotation(45.0).origin(8.0, 8.0))?;
/// ```
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SpriteDraw {
    pub position: Vec2,
    pub origin: Vec2,
    /// Destination size; the texture's natural size when `None`.
    pub size: Option<Vec2>,
    pub scale: Vec2,
    /// Degrees.
    pub rotation: f32,
    /// Source rectangle in texels; the whole (sub-)texture when `None`.
    pub source: Option<Rect>,
    pub flip_x: bool,
    pub flip_y: bool,
    pub pivot: Pivot,
    /// The region is packed rotated 90 degrees clockwise in its atlas.
    /// Ignored when `source` is set.
    pub clockwise: bool,
    /// Per-draw color; the ambient color when `None`.
    pub color: Option<Color>,
}

impl Default for SpriteDraw {
    fn default() -> Self {
        Self {
            position: Vec2::zero(),
            origin: Vec2::zero(),
            size: None,
            scale: Vec2::one(),
            rotation: 0.0,
            source: None,
            flip_x: false,
            flip_y: false,
            pivot: Pivot::Offset,
            clockwise: false,
            color: None,
        }
    }
}

impl SpriteDraw {
    pub fn at(x: f32, y: f32) -> Self {
        Self {
            position: Vec2::new(x, y),
            ..Self::default()
        }
    }

    pub fn size(mut self, width: f32, height: f32) -> Self {
        self.size = Some(Vec2::new(width, height));
        self
    }

    pub fn origin(mut self, x: f32, y: f32) -> Self {
        self.origin = Vec2::new(x, y);
        self
    }

    pub fn scale(mut self, sx: f32, sy: f32) -> Self {
        self.scale = Vec2::new(sx, sy);
        self
    }

    pub fn rotation(mut self, degrees: f32) -> Self {
        self.rotation = degrees;
        self
    }

    pub fn source(mut self, src: Rect) -> Self {
        self.source = Some(src);
        self
    }

    pub fn flip(mut self, flip_x: bool, flip_y: bool) -> Self {
        self.flip_x = flip_x;
        self.flip_y = flip_y;
        self
    }

    pub fn effects(mut self, effects: SpriteEffects) -> Self {
        self.flip_x = effects == SpriteEffects::FlipHorizontally;
        self.flip_y = effects == SpriteEffects::FlipVertically;
        self
    }

    pub fn pivot(mut self, pivot: Pivot) -> Self {
        self.pivot = pivot;
        self
    }

    pub fn clockwise(mut self, clockwise: bool) -> Self {
        self.clockwise = clockwise;
        self
    }

    pub fn color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }
}

impl<G: GpuContext> SpriteBatch<G> {
    // ── canonical ─────────────────────────────────────────────────────────

    /// Draws one transformed quad.
    ///
    /// The texture check runs first and may flush; the quad is then generated
    /// and appended in the sprite's color (ambient color if unset).
    pub fn draw_with<T: Texture + ?Sized>(&mut self, texture: &T, sprite: &SpriteDraw) -> Result<(), BatchError> {
        if !self.check_texture(texture)? {
            return Ok(());
        }

        let size = sprite
            .size
            .unwrap_or_else(|| Vec2::new(texture.width(), texture.height()));
        let corners = quad_corners(&QuadTransform {
            position: sprite.position,
            origin: sprite.origin,
            size,
            scale: sprite.scale,
            rotation: sprite.rotation,
            pivot: sprite.pivot,
        });

        let uv = match sprite.source {
            Some(src) => UvRect::from_source(src, self.inv_tex_size(), texture.uv_offset()),
            None => UvRect::from_region(texture.uv_offset(), texture.uv_ratio()),
        }
        .flipped(sprite.flip_x, sprite.flip_y);
        let uvs = if sprite.clockwise && sprite.source.is_none() {
            uv.corners_clockwise()
        } else {
            uv.corners()
        };

        self.push_quad_colored(corners, uvs, sprite.color);
        Ok(())
    }

    /// Draws an axis-aligned quad with explicit per-corner UVs.
    pub fn draw_uv_quad<T: Texture + ?Sized>(
        &mut self,
        texture: &T,
        dst: Rect,
        uvs: [[f32; 2]; 4],
        color: Option<Color>,
    ) -> Result<(), BatchError> {
        if !self.check_texture(texture)? {
            return Ok(());
        }
        let corners = quad_corners(&QuadTransform::axis_aligned(dst.origin, dst.size));
        self.push_quad_colored(corners, uvs, color);
        Ok(())
    }

    fn push_quad_colored(&mut self, corners: [Vec2; 4], uvs: [[f32; 2]; 4], color: Option<Color>) {
        match color {
            Some(color) => self.with_color(color, |batch| batch.push_quad(corners, uvs)),
            None => self.push_quad(corners, uvs),
        }
    }

    // ── wrappers ──────────────────────────────────────────────────────────

    /// Draws `texture` at its natural size.
    pub fn draw<T: Texture + ?Sized>(&mut self, texture: &T, x: f32, y: f32) -> Result<(), BatchError> {
        self.draw_with(texture, &SpriteDraw::at(x, y))
    }

    pub fn draw_sized<T: Texture + ?Sized>(
        &mut self,
        texture: &T,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    ) -> Result<(), BatchError> {
        self.draw_with(texture, &SpriteDraw::at(x, y).size(width, height))
    }

    /// Draws `texture` at its natural size rotated about its centre.
    pub fn draw_rotated<T: Texture + ?Sized>(
        &mut self,
        texture: &T,
        x: f32,
        y: f32,
        rotation: f32,
    ) -> Result<(), BatchError> {
        if rotation == 0.0 {
            return self.draw(texture, x, y);
        }
        let sprite = SpriteDraw::at(x, y)
            .origin(texture.width() / 2.0, texture.height() / 2.0)
            .rotation(rotation);
        self.draw_with(texture, &sprite)
    }

    /// Draws the texel rectangle `src` of `texture` into `dst`.
    pub fn draw_region<T: Texture + ?Sized>(&mut self, texture: &T, dst: Rect, src: Rect) -> Result<(), BatchError> {
        let sprite = SpriteDraw::at(dst.x(), dst.y())
            .size(dst.width(), dst.height())
            .source(src);
        self.draw_with(texture, &sprite)
    }

    pub fn draw_flip_x<T: Texture + ?Sized>(&mut self, texture: &T, dst: Rect) -> Result<(), BatchError> {
        let sprite = SpriteDraw::at(dst.x(), dst.y())
            .size(dst.width(), dst.height())
            .effects(SpriteEffects::FlipHorizontally);
        self.draw_with(texture, &sprite)
    }

    pub fn draw_flip_y<T: Texture + ?Sized>(&mut self, texture: &T, dst: Rect) -> Result<(), BatchError> {
        let sprite = SpriteDraw::at(dst.x(), dst.y())
            .size(dst.width(), dst.height())
            .effects(SpriteEffects::FlipVertically);
        self.draw_with(texture, &sprite)
    }

    /// Draws with `color` for this quad only; the ambient color is untouched.
    pub fn draw_tinted<T: Texture + ?Sized>(&mut self, texture: &T, dst: Rect, color: Color) -> Result<(), BatchError> {
        let sprite = SpriteDraw::at(dst.x(), dst.y())
            .size(dst.width(), dst.height())
            .color(color);
        self.draw_with(texture, &sprite)
    }

    /// Draws a whole atlas region using its pre-normalized offset and ratio as UVs.
    ///
    /// `clockwise` handles regions the packer stored rotated by 90 degrees.
    pub fn draw_atlas_region<T: Texture + ?Sized>(
        &mut self,
        region: &T,
        dst: Rect,
        clockwise: bool,
    ) -> Result<(), BatchError> {
        let sprite = SpriteDraw::at(dst.x(), dst.y())
            .size(dst.width(), dst.height())
            .clockwise(clockwise);
        self.draw_with(region, &sprite)
    }

    // ── solids ────────────────────────────────────────────────────────────

    /// Fills `rect` with `color` using a caller-supplied solid (usually 1x1 white) texture.
    pub fn fill_rect<T: Texture + ?Sized>(&mut self, solid: &T, rect: Rect, color: Color) -> Result<(), BatchError> {
        let uvs = UvRect::from_region(solid.uv_offset(), solid.uv_ratio()).corners();
        self.draw_uv_quad(solid, rect.normalized(), uvs, Some(color))
    }

    /// One-pixel quad at `(x, y)`.
    pub fn draw_point<T: Texture + ?Sized>(&mut self, solid: &T, x: f32, y: f32, color: Color) -> Result<(), BatchError> {
        self.fill_rect(solid, Rect::new(x, y, 1.0, 1.0), color)
    }

    // ── bulk ──────────────────────────────────────────────────────────────

    /// Appends pre-built vertices `vertices[range]` textured with `texture`.
    ///
    /// Copied in capacity-sized chunks, flushing whenever the buffer fills.
    /// Vertices are taken as-is: their colors are not replaced by the ambient
    /// color. A trailing partial quad is never drawn.
    pub fn draw_vertices<T: Texture + ?Sized>(
        &mut self,
        texture: &T,
        vertices: &[SpriteVertex],
        range: Range<usize>,
    ) -> Result<(), BatchError> {
        let Some(slice) = vertices.get(range.clone()) else {
            log::warn!(
                "sprite batch: vertex range {range:?} out of bounds for {} vertices",
                vertices.len()
            );
            return Ok(());
        };
        if slice.is_empty() || !self.check_texture(texture)? {
            return Ok(());
        }

        let whole = slice.len() - slice.len() % VERTICES_PER_QUAD;
        if whole != slice.len() {
            log::warn!(
                "sprite batch: bulk append of {} vertices ends in a partial quad; {} dropped",
                slice.len(),
                slice.len() - whole
            );
        }
        self.append_vertices(&slice[..whole])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{BatchConfig, TextureId, TextureRegion};
    use crate::gpu::HeadlessGpu;
    use crate::paint::PackedColor;

    fn drawing_batch() -> SpriteBatch<HeadlessGpu> {
        let mut batch = SpriteBatch::new(HeadlessGpu::new(), BatchConfig::with_capacity(8)).unwrap();
        batch.begin().unwrap();
        batch
    }

    #[test]
    fn natural_size_uses_texture_dimensions() {
        let tex = TextureRegion::new(TextureId(1), 16.0, 8.0);
        let mut batch = drawing_batch();
        batch.draw(&tex, 2.0, 3.0).unwrap();
        batch.end().unwrap();

        let draw = batch.gpu().draws().next().unwrap().clone();
        assert_eq!(draw.vertices[2].pos, [18.0, 11.0]);
        assert_eq!(draw.vertices[0].uv, [0.0, 0.0]);
        assert_eq!(draw.vertices[2].uv, [1.0, 1.0]);
    }

    #[test]
    fn zero_rotation_takes_the_unrotated_path() {
        let tex = TextureRegion::new(TextureId(1), 10.0, 10.0);
        let mut a = drawing_batch();
        let mut b = drawing_batch();
        a.draw_rotated(&tex, 5.0, 5.0, 0.0).unwrap();
        b.draw(&tex, 5.0, 5.0).unwrap();
        a.end().unwrap();
        b.end().unwrap();

        let va = &a.gpu().draws().next().unwrap().vertices;
        let vb = &b.gpu().draws().next().unwrap().vertices;
        assert_eq!(va, vb);
    }

    #[test]
    fn effects_map_to_flip_flags() {
        let s = SpriteDraw::default().effects(SpriteEffects::FlipHorizontally);
        assert!(s.flip_x && !s.flip_y);
        let s = s.effects(SpriteEffects::None);
        assert!(!s.flip_x && !s.flip_y);
    }

    #[test]
    fn atlas_region_uses_offset_and_ratio() {
        let atlas = TextureRegion::new(TextureId(1), 128.0, 128.0);
        let region = TextureRegion::sub_region(&atlas, TextureId(2), Rect::new(32.0, 0.0, 32.0, 64.0));
        let mut batch = drawing_batch();
        batch.draw_atlas_region(&region, Rect::new(0.0, 0.0, 32.0, 64.0), true).unwrap();
        batch.end().unwrap();

        let draw = batch.gpu().draws().next().unwrap().clone();
        assert_eq!(draw.texture, TextureId(1));
        assert_eq!(draw.vertices[0].uv, [0.5, 0.5]);
        assert_eq!(draw.vertices[2].uv, [0.25, 0.0]);
    }

    #[test]
    fn clockwise_region_keeps_full_transform() {
        let atlas = TextureRegion::new(TextureId(1), 128.0, 128.0);
        let region = TextureRegion::sub_region(&atlas, TextureId(2), Rect::new(32.0, 0.0, 32.0, 64.0));
        let mut batch = drawing_batch();
        let sprite = SpriteDraw::at(10.0, 10.0)
            .origin(16.0, 32.0)
            .scale(2.0, 2.0)
            .rotation(90.0)
            .clockwise(true);
        batch.draw_with(&region, &sprite).unwrap();
        batch.end().unwrap();

        let draw = batch.gpu().draws().next().unwrap().clone();
        let expected_uv = UvRect::from_region(region.uv_offset(), region.uv_ratio()).corners_clockwise();
        let uvs: Vec<[f32; 2]> = draw.vertices.iter().map(|v| v.uv).collect();
        assert_eq!(uvs, expected_uv.to_vec());

        let corners = quad_corners(&QuadTransform {
            position: Vec2::new(10.0, 10.0),
            origin: Vec2::new(16.0, 32.0),
            size: Vec2::new(32.0, 64.0),
            scale: Vec2::new(2.0, 2.0),
            rotation: 90.0,
            pivot: Pivot::Offset,
        });
        for (v, c) in draw.vertices.iter().zip(corners) {
            assert_eq!(v.pos, [c.x, c.y]);
        }
    }

    #[test]
    fn clockwise_is_ignored_with_a_source_rect() {
        let tex = TextureRegion::new(TextureId(1), 64.0, 64.0);
        let mut a = drawing_batch();
        let mut b = drawing_batch();
        let sprite = SpriteDraw::at(0.0, 0.0).source(Rect::new(0.0, 0.0, 32.0, 32.0));
        a.draw_with(&tex, &sprite.clockwise(true)).unwrap();
        b.draw_with(&tex, &sprite).unwrap();
        a.end().unwrap();
        b.end().unwrap();

        let va = &a.gpu().draws().next().unwrap().vertices;
        let vb = &b.gpu().draws().next().unwrap().vertices;
        assert_eq!(va, vb);
    }

    #[test]
    fn fill_rect_carries_fill_color_only() {
        let solid = TextureRegion::new(TextureId(9), 1.0, 1.0);
        let mut batch = drawing_batch();
        batch.fill_rect(&solid, Rect::new(0.0, 0.0, 4.0, 4.0), Color::BLACK).unwrap();
        assert_eq!(batch.color(), Color::WHITE);
        batch.end().unwrap();

        let draw = batch.gpu().draws().next().unwrap().clone();
        assert!(draw.vertices.iter().all(|v| v.color == Color::BLACK.pack()));
    }

    #[test]
    fn bulk_append_drops_trailing_partial_quad() {
        let tex = TextureRegion::new(TextureId(1), 1.0, 1.0);
        let verts = vec![SpriteVertex::new(0.0, 0.0, PackedColor::WHITE, 0.0, 0.0); 10];
        let mut batch = drawing_batch();
        batch.draw_vertices(&tex, &verts, 0..10).unwrap();
        assert_eq!(batch.pending_quads(), 2);
        assert_eq!(batch.cursor(), 40);
    }

    #[test]
    fn bulk_append_ignores_out_of_range() {
        let tex = TextureRegion::new(TextureId(1), 1.0, 1.0);
        let verts = vec![SpriteVertex::default(); 4];
        let mut batch = drawing_batch();
        batch.draw_vertices(&tex, &verts, 2..8).unwrap();
        assert_eq!(batch.pending_quads(), 0);
    }
}
