//! Quad geometry generation.
//!
//! Pure functions: corner positions from a transform, UV rectangles from a
//! source rectangle. Vertex order everywhere is TL, BL, BR, TR.

use crate::coords::{Rect, Vec2};
use crate::paint::PackedColor;

use super::vertex::SpriteVertex;

/// Where the rotation/scale pivot lands in world space.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum Pivot {
    /// World pivot is `position + origin`; the quad's top-left sits at `position`
    /// when unrotated and unscaled.
    #[default]
    Offset,
    /// World pivot is `position` itself; the quad is placed around it.
    Position,
}

/// Placement of one quad.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct QuadTransform {
    pub position: Vec2,
    /// Pivot relative to the quad's top-left corner, before scaling.
    pub origin: Vec2,
    pub size: Vec2,
    pub scale: Vec2,
    /// Degrees, clockwise in +Y-down space.
    pub rotation: f32,
    pub pivot: Pivot,
}

impl QuadTransform {
    /// Axis-aligned quad at `position` with no pivot, scale or rotation.
    pub const fn axis_aligned(position: Vec2, size: Vec2) -> Self {
        Self {
            position,
            origin: Vec2::zero(),
            size,
            scale: Vec2::one(),
            rotation: 0.0,
            pivot: Pivot::Offset,
        }
    }
}

/// Computes the four corners in world space.
///
/// The fourth corner is completed from the first three (`p1 + (p3 - p2)`)
/// rather than rotated on its own; output must match that formula exactly.
pub fn quad_corners(t: &QuadTransform) -> [Vec2; 4] {
    let (world_x, world_y) = match t.pivot {
        Pivot::Offset => (t.position.x + t.origin.x, t.position.y + t.origin.y),
        Pivot::Position => (t.position.x, t.position.y),
    };

    let mut fx = -t.origin.x;
    let mut fy = -t.origin.y;
    let mut fx2 = t.size.x - t.origin.x;
    let mut fy2 = t.size.y - t.origin.y;

    if t.scale.x != 1.0 || t.scale.y != 1.0 {
        fx *= t.scale.x;
        fy *= t.scale.y;
        fx2 *= t.scale.x;
        fy2 *= t.scale.y;
    }

    let (p1x, p1y) = (fx, fy);
    let (p2x, p2y) = (fx, fy2);
    let (p3x, p3y) = (fx2, fy2);
    let (p4x, p4y) = (fx2, fy);

    let [(x1, y1), (x2, y2), (x3, y3), (x4, y4)] = if t.rotation != 0.0 {
        let (sin, cos) = t.rotation.to_radians().sin_cos();

        let x1 = cos * p1x - sin * p1y;
        let y1 = sin * p1x + cos * p1y;

        let x2 = cos * p2x - sin * p2y;
        let y2 = sin * p2x + cos * p2y;

        let x3 = cos * p3x - sin * p3y;
        let y3 = sin * p3x + cos * p3y;

        [(x1, y1), (x2, y2), (x3, y3), (x1 + (x3 - x2), y3 - (y2 - y1))]
    } else {
        [(p1x, p1y), (p2x, p2y), (p3x, p3y), (p4x, p4y)]
    };

    [
        Vec2::new(x1 + world_x, y1 + world_y),
        Vec2::new(x2 + world_x, y2 + world_y),
        Vec2::new(x3 + world_x, y3 + world_y),
        Vec2::new(x4 + world_x, y4 + world_y),
    ]
}

/// Normalized texture coordinates of a quad: `(u, v)` top-left, `(u2, v2)` bottom-right.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct UvRect {
    pub u: f32,
    pub v: f32,
    pub u2: f32,
    pub v2: f32,
}

impl UvRect {
    #[inline]
    pub const fn new(u: f32, v: f32, u2: f32, v2: f32) -> Self {
        Self { u, v, u2, v2 }
    }

    /// UVs for a source rectangle in texels.
    ///
    /// `inv_size` is the inverse texture size (already ratio-corrected for
    /// padded textures). The atlas offset is added to the near edge only; the
    /// far edge relies on `inv_size` carrying the ratio.
    #[inline]
    pub fn from_source(src: Rect, inv_size: Vec2, offset: Vec2) -> Self {
        Self {
            u: src.origin.x * inv_size.x + offset.x,
            v: src.origin.y * inv_size.y + offset.y,
            u2: (src.origin.x + src.size.x) * inv_size.x,
            v2: (src.origin.y + src.size.y) * inv_size.y,
        }
    }

    /// UVs spanning a whole (sub-)texture given its normalized offset and ratio.
    #[inline]
    pub fn from_region(offset: Vec2, ratio: Vec2) -> Self {
        Self::new(offset.x, offset.y, ratio.x, ratio.y)
    }

    /// Swaps the U pair and/or the V pair.
    #[inline]
    pub fn flipped(self, flip_x: bool, flip_y: bool) -> Self {
        let (u, u2) = if flip_x { (self.u2, self.u) } else { (self.u, self.u2) };
        let (v, v2) = if flip_y { (self.v2, self.v) } else { (self.v, self.v2) };
        Self { u, v, u2, v2 }
    }

    /// Per-corner UVs in TL, BL, BR, TR order.
    #[inline]
    pub fn corners(self) -> [[f32; 2]; 4] {
        [
            [self.u, self.v],
            [self.u, self.v2],
            [self.u2, self.v2],
            [self.u2, self.v],
        ]
    }

    /// Per-corner UVs for a region packed rotated by 90 degrees clockwise in its atlas.
    #[inline]
    pub fn corners_clockwise(self) -> [[f32; 2]; 4] {
        [
            [self.u2, self.v2],
            [self.u, self.v2],
            [self.u, self.v],
            [self.u2, self.v],
        ]
    }
}

/// Interleaves corners, UVs and color into four vertices.
#[inline]
pub fn build_quad(corners: [Vec2; 4], uvs: [[f32; 2]; 4], color: PackedColor) -> [SpriteVertex; 4] {
    let vertex = |i: usize| SpriteVertex {
        pos: [corners[i].x, corners[i].y],
        color,
        uv: uvs[i],
    };
    [vertex(0), vertex(1), vertex(2), vertex(3)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn transform(x: f32, y: f32, w: f32, h: f32) -> QuadTransform {
        QuadTransform::axis_aligned(Vec2::new(x, y), Vec2::new(w, h))
    }

    #[test]
    fn unrotated_quad_is_exact() {
        let c = quad_corners(&transform(10.0, 20.0, 32.0, 16.0));
        assert_eq!(c[0], Vec2::new(10.0, 20.0));
        assert_eq!(c[1], Vec2::new(10.0, 36.0));
        assert_eq!(c[2], Vec2::new(42.0, 36.0));
        assert_eq!(c[3], Vec2::new(42.0, 20.0));
    }

    #[test]
    fn origin_without_rotation_keeps_top_left_at_position() {
        let mut t = transform(5.0, 5.0, 10.0, 10.0);
        t.origin = Vec2::new(5.0, 5.0);
        let c = quad_corners(&t);
        assert_eq!(c[0], Vec2::new(5.0, 5.0));
        assert_eq!(c[2], Vec2::new(15.0, 15.0));
    }

    #[test]
    fn position_pivot_centres_quad_on_position() {
        let mut t = transform(100.0, 100.0, 10.0, 20.0);
        t.origin = Vec2::new(5.0, 10.0);
        t.pivot = Pivot::Position;
        let c = quad_corners(&t);
        assert_eq!(c[0], Vec2::new(95.0, 90.0));
        assert_eq!(c[2], Vec2::new(105.0, 110.0));
    }

    #[test]
    fn scale_grows_around_origin() {
        let mut t = transform(0.0, 0.0, 10.0, 10.0);
        t.origin = Vec2::new(5.0, 5.0);
        t.scale = Vec2::new(2.0, 3.0);
        let c = quad_corners(&t);
        assert_eq!(c[0], Vec2::new(-5.0, -10.0));
        assert_eq!(c[2], Vec2::new(15.0, 20.0));
    }

    #[test]
    fn rotated_fourth_corner_uses_parallelogram_completion() {
        let mut t = transform(0.0, 0.0, 32.0, 32.0);
        t.origin = Vec2::new(16.0, 16.0);
        t.rotation = 90.0;
        let c = quad_corners(&t);

        // Re-derive with the same operation order; results must match bit for bit.
        let (sin, cos) = 90.0f32.to_radians().sin_cos();
        let rot = |x: f32, y: f32| (cos * x - sin * y, sin * x + cos * y);
        let (x1, y1) = rot(-16.0, -16.0);
        let (x2, y2) = rot(-16.0, 16.0);
        let (x3, y3) = rot(16.0, 16.0);
        let x4 = x1 + (x3 - x2);
        let y4 = y3 - (y2 - y1);

        assert_eq!(c[3].x.to_bits(), (x4 + 16.0).to_bits());
        assert_eq!(c[3].y.to_bits(), (y4 + 16.0).to_bits());

        // Geometrically: TL rotated 90 degrees clockwise lands at top-right.
        assert_relative_eq!(c[0].x, 32.0, epsilon = 1e-4);
        assert_relative_eq!(c[0].y, 0.0, epsilon = 1e-4);
        assert_relative_eq!(c[3].x, 32.0, epsilon = 1e-4);
        assert_relative_eq!(c[3].y, 32.0, epsilon = 1e-4);
    }

    #[test]
    fn degenerate_size_is_accepted() {
        let c = quad_corners(&transform(3.0, 4.0, 0.0, 0.0));
        assert!(c.iter().all(|p| *p == Vec2::new(3.0, 4.0)));
    }

    #[test]
    fn source_uvs_use_inverse_size_and_offset() {
        let uv = UvRect::from_source(
            Rect::new(32.0, 16.0, 64.0, 32.0),
            Vec2::new(1.0 / 256.0, 1.0 / 128.0),
            Vec2::zero(),
        );
        assert_eq!(uv, UvRect::new(0.125, 0.125, 0.375, 0.375));
    }

    #[test]
    fn flips_swap_pairs_independently() {
        let uv = UvRect::new(0.1, 0.2, 0.3, 0.4);
        assert_eq!(uv.flipped(true, false), UvRect::new(0.3, 0.2, 0.1, 0.4));
        assert_eq!(uv.flipped(false, true), UvRect::new(0.1, 0.4, 0.3, 0.2));
        assert_eq!(uv.flipped(true, true), UvRect::new(0.3, 0.4, 0.1, 0.2));
    }

    #[test]
    fn clockwise_corners_rotate_uv_assignment() {
        let uv = UvRect::new(0.0, 0.0, 1.0, 1.0);
        assert_eq!(uv.corners(), [[0.0, 0.0], [0.0, 1.0], [1.0, 1.0], [1.0, 0.0]]);
        assert_eq!(uv.corners_clockwise(), [[1.0, 1.0], [0.0, 1.0], [0.0, 0.0], [1.0, 0.0]]);
    }
}
