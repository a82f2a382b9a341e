/// Straight-alpha RGBA color, channels in `[0, 1]`.
///
/// This is the batch-facing representation. It is converted to a
/// [`PackedColor`] only at the vertex-buffer write boundary.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl Color {
    pub const WHITE: Color = Color::new(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::new(0.0, 0.0, 0.0, 1.0);
    pub const TRANSPARENT: Color = Color::new(0.0, 0.0, 0.0, 0.0);

    #[inline]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Returns the same color with alpha replaced.
    #[inline]
    pub const fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    #[inline]
    pub fn pack(self) -> PackedColor {
        PackedColor::from_color(self)
    }
}

/// Four 8-bit channels in one 32-bit scalar.
///
/// Byte order in memory (little endian) is R, G, B, A, so the value can be
/// read directly by a `unorm8x4` vertex attribute.
#[repr(transparent)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PackedColor(pub u32);

impl PackedColor {
    pub const WHITE: PackedColor = PackedColor(0xffff_ffff);

    /// Packs straight-alpha channels; each is clamped to `[0, 1]` and
    /// truncated to 8 bits.
    #[inline]
    pub fn from_color(c: Color) -> Self {
        Self::from_rgba8(to_u8(c.r), to_u8(c.g), to_u8(c.b), to_u8(c.a))
    }

    #[inline]
    pub const fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        PackedColor((a as u32) << 24 | (b as u32) << 16 | (g as u32) << 8 | r as u32)
    }

    /// Returns `[r, g, b, a]` bytes.
    #[inline]
    pub const fn to_rgba8(self) -> [u8; 4] {
        self.0.to_le_bytes()
    }
}

impl From<Color> for PackedColor {
    #[inline]
    fn from(c: Color) -> Self {
        c.pack()
    }
}

#[inline]
fn to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn white_packs_to_all_ones() {
        assert_eq!(Color::WHITE.pack(), PackedColor::WHITE);
    }

    #[test]
    fn byte_order_is_rgba_in_memory() {
        let p = PackedColor::from_rgba8(1, 2, 3, 4);
        assert_eq!(p.to_rgba8(), [1, 2, 3, 4]);
        assert_eq!(p.0, 0x0403_0201);
    }

    #[test]
    fn out_of_range_channels_clamp() {
        let p = Color::new(2.0, -1.0, 0.5, 1.0).pack();
        assert_eq!(p.to_rgba8(), [255, 0, 127, 255]);
    }
}
