use glam::Mat4;

/// Viewport size in logical pixels.
///
/// The batch derives its default projection from this: top-left origin,
/// +Y down, depth range [-1, 1].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(480.0, 320.0)
    }
}

impl Viewport {
    #[inline]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Orthographic projection mapping logical pixels to clip space.
    ///
    /// Degenerate sizes are clamped to one pixel so the matrix stays invertible.
    pub fn projection(self) -> Mat4 {
        let w = self.width.max(1.0);
        let h = self.height.max(1.0);
        Mat4::orthographic_rh(0.0, w, h, 0.0, -1.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    #[test]
    fn projection_maps_corners_to_clip_space() {
        let p = Viewport::new(200.0, 100.0).projection();

        let tl = p * Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert!((tl.x + 1.0).abs() < 1e-6);
        assert!((tl.y - 1.0).abs() < 1e-6);

        let br = p * Vec4::new(200.0, 100.0, 0.0, 1.0);
        assert!((br.x - 1.0).abs() < 1e-6);
        assert!((br.y + 1.0).abs() < 1e-6);
    }

    #[test]
    fn zero_size_still_projects() {
        let v = Viewport::new(0.0, 0.0);
        assert!(v.projection().is_finite());
    }
}
