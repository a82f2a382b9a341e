use bytemuck::{Pod, Zeroable};

use crate::paint::PackedColor;

/// Number of scalar fields per vertex: x, y, packed color, u, v.
pub const VERTEX_FIELDS: usize = 5;

/// Vertices emitted per quad (TL, BL, BR, TR).
pub const VERTICES_PER_QUAD: usize = 4;

/// Indices per quad: two triangles sharing the TL-BR diagonal.
pub const INDICES_PER_QUAD: usize = 6;

/// Scalar fields per quad; the write cursor always lands on a multiple of this.
pub const QUAD_FIELDS: usize = VERTEX_FIELDS * VERTICES_PER_QUAD;

/// Largest quad count addressable by a 16-bit index buffer
/// (`6 * 5460 = 32760` indices, `4 * 5460 = 21840` vertices).
pub const MAX_QUADS: usize = 5460;

/// Interleaved sprite vertex (20 bytes).
///
///  offset  0  pos    [f32; 2]   loc 0
///  offset  8  color  u32        loc 1 (unorm8x4)
///  offset 12  uv     [f32; 2]   loc 2
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct SpriteVertex {
    pub pos: [f32; 2],
    pub color: PackedColor,
    pub uv: [f32; 2],
}

impl SpriteVertex {
    #[inline]
    pub const fn new(x: f32, y: f32, color: PackedColor, u: f32, v: f32) -> Self {
        Self { pos: [x, y], color, uv: [u, v] }
    }
}

/// Fixed-capacity accumulator of quad vertices.
///
/// Storage is reserved once for `capacity` quads and never grows; callers
/// must flush when [`is_full`](Self::is_full) reports true.
#[derive(Debug)]
pub struct VertexBuffer {
    vertices: Vec<SpriteVertex>,
    max_vertices: usize,
}

impl VertexBuffer {
    pub fn with_quad_capacity(quads: usize) -> Self {
        let max_vertices = quads * VERTICES_PER_QUAD;
        Self {
            vertices: Vec::with_capacity(max_vertices),
            max_vertices,
        }
    }

    /// Capacity in quads.
    #[inline]
    pub fn quad_capacity(&self) -> usize {
        self.max_vertices / VERTICES_PER_QUAD
    }

    /// Number of vertices written since the last flush.
    #[inline]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.vertices.len() >= self.max_vertices
    }

    /// Complete quads pending. A trailing partial quad (bulk appends only) is not counted.
    #[inline]
    pub fn quad_count(&self) -> usize {
        self.vertices.len() / VERTICES_PER_QUAD
    }

    /// Write cursor expressed in scalar fields.
    #[inline]
    pub fn cursor(&self) -> usize {
        self.vertices.len() * VERTEX_FIELDS
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.max_vertices - self.vertices.len()
    }

    #[inline]
    pub fn as_slice(&self) -> &[SpriteVertex] {
        &self.vertices
    }

    /// Appends one quad. The buffer must not be full.
    #[inline]
    pub fn push_quad(&mut self, quad: [SpriteVertex; VERTICES_PER_QUAD]) {
        debug_assert!(self.remaining() >= VERTICES_PER_QUAD, "push_quad on a full vertex buffer");
        self.vertices.extend_from_slice(&quad);
    }

    /// Copies as many vertices from `src` as fit; returns how many were taken.
    pub fn extend_from(&mut self, src: &[SpriteVertex]) -> usize {
        let n = src.len().min(self.remaining());
        self.vertices.extend_from_slice(&src[..n]);
        n
    }

    /// Resets the write cursor, keeping the allocation.
    #[inline]
    pub fn clear(&mut self) {
        self.vertices.clear();
    }
}

/// Builds the shared index pattern for `quads` quads:
/// `[j, j+1, j+2, j+2, j+3, j]` per quad with `j = 4 * quad`.
pub fn quad_indices(quads: usize) -> Vec<u16> {
    let mut indices = Vec::with_capacity(quads * INDICES_PER_QUAD);
    for quad in 0..quads {
        let j = (quad * VERTICES_PER_QUAD) as u16;
        indices.extend_from_slice(&[j, j + 1, j + 2, j + 2, j + 3, j]);
    }
    indices
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad(tag: f32) -> [SpriteVertex; 4] {
        [SpriteVertex::new(tag, 0.0, PackedColor::WHITE, 0.0, 0.0); 4]
    }

    #[test]
    fn vertex_is_twenty_bytes() {
        assert_eq!(std::mem::size_of::<SpriteVertex>(), VERTEX_FIELDS * 4);
    }

    #[test]
    fn cursor_advances_by_quad_fields() {
        let mut buf = VertexBuffer::with_quad_capacity(3);
        assert_eq!(buf.cursor(), 0);
        buf.push_quad(quad(1.0));
        assert_eq!(buf.cursor(), QUAD_FIELDS);
        buf.push_quad(quad(2.0));
        assert_eq!(buf.cursor(), 2 * QUAD_FIELDS);
        assert_eq!(buf.quad_count(), 2);
        assert!(!buf.is_full());
    }

    #[test]
    fn full_after_capacity_quads() {
        let mut buf = VertexBuffer::with_quad_capacity(2);
        buf.push_quad(quad(1.0));
        buf.push_quad(quad(2.0));
        assert!(buf.is_full());
        assert_eq!(buf.remaining(), 0);

        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.quad_capacity(), 2);
    }

    #[test]
    fn extend_from_stops_at_capacity() {
        let mut buf = VertexBuffer::with_quad_capacity(1);
        let src = [SpriteVertex::default(); 6];
        assert_eq!(buf.extend_from(&src), 4);
        assert!(buf.is_full());
        assert_eq!(buf.extend_from(&src), 0);
    }

    #[test]
    fn index_pattern_shares_diagonal() {
        let idx = quad_indices(2);
        assert_eq!(idx, vec![0, 1, 2, 2, 3, 0, 4, 5, 6, 6, 7, 4]);
    }

    #[test]
    fn max_quads_fit_in_u16_indices() {
        let idx = quad_indices(MAX_QUADS);
        assert_eq!(idx.len(), MAX_QUADS * INDICES_PER_QUAD);
        assert_eq!(idx.iter().copied().max(), Some((MAX_QUADS * 4 - 1) as u16));
    }
}
