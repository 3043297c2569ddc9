use crate::error::MatchError;

/// Number of bits per channel, and therefore the maximum octree depth.
pub const CHANNEL_BITS: u8 = 8;

/// An 8-bit-per-channel RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Self = Self::new(0, 0, 0);
    pub const WHITE: Self = Self::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Build a color from shading output in `[0, 1]` per channel.
    ///
    /// Out-of-range values, including the infinities, are clamped to the
    /// nearest valid intensity. `NaN` is an error.
    pub fn from_unit_f32(r: f32, g: f32, b: f32) -> Result<Self, MatchError> {
        Ok(Self {
            r: unit_to_u8(r, 'r')?,
            g: unit_to_u8(g, 'g')?,
            b: unit_to_u8(b, 'b')?,
        })
    }

    /// Build a color from integer channels, clamping each to `0..=255`.
    pub fn from_rgb_clamped(r: i32, g: i32, b: i32) -> Self {
        Self {
            r: r.clamp(0, 255) as u8,
            g: g.clamp(0, 255) as u8,
            b: b.clamp(0, 255) as u8,
        }
    }

    pub const fn to_array(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    /// Squared Euclidean distance in RGB space.
    ///
    /// At most `3 * 255^2`, so it always fits in a `u32`.
    #[inline]
    pub fn distance_sq(self, other: Self) -> u32 {
        let dr = self.r as i32 - other.r as i32;
        let dg = self.g as i32 - other.g as i32;
        let db = self.b as i32 - other.b as i32;
        (dr * dr + dg * dg + db * db) as u32
    }

    /// Child octant selected at `depth`: bit `7 - depth` of each channel,
    /// packed as `r << 2 | g << 1 | b`.
    #[inline]
    pub(crate) fn octant(self, depth: u8) -> usize {
        debug_assert!(depth < CHANNEL_BITS);
        let shift = CHANNEL_BITS - 1 - depth;
        let r = (self.r >> shift) & 1;
        let g = (self.g >> shift) & 1;
        let b = (self.b >> shift) & 1;
        ((r << 2) | (g << 1) | b) as usize
    }
}

fn unit_to_u8(v: f32, channel: char) -> Result<u8, MatchError> {
    if v.is_nan() {
        return Err(MatchError::InvalidColor { channel });
    }
    Ok((v.clamp(0.0, 1.0) * 255.0).round() as u8)
}

impl From<[u8; 3]> for Color {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self { r, g, b }
    }
}

impl From<Color> for [u8; 3] {
    fn from(c: Color) -> Self {
        c.to_array()
    }
}

impl From<rgb::RGB8> for Color {
    fn from(p: rgb::RGB8) -> Self {
        Self::new(p.r, p.g, p.b)
    }
}

impl From<Color> for rgb::RGB8 {
    fn from(c: Color) -> Self {
        rgb::RGB8::new(c.r, c.g, c.b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_sum_of_squares() {
        let a = Color::new(10, 20, 30);
        let b = Color::new(13, 16, 30);
        assert_eq!(a.distance_sq(b), 9 + 16);
        assert_eq!(b.distance_sq(a), 25);
        assert_eq!(Color::BLACK.distance_sq(Color::WHITE), 3 * 255 * 255);
    }

    #[test]
    fn octant_uses_most_significant_bit_first() {
        let c = Color::new(0b1000_0000, 0b0000_0000, 0b1000_0001);
        assert_eq!(c.octant(0), 0b101);
        assert_eq!(c.octant(7), 0b001);
        assert_eq!(Color::WHITE.octant(3), 7);
        assert_eq!(Color::BLACK.octant(3), 0);
    }

    #[test]
    fn unit_floats_are_clamped() {
        let c = Color::from_unit_f32(1.0001, -0.00001, 0.5).unwrap();
        assert_eq!(c, Color::new(255, 0, 128));

        let c = Color::from_unit_f32(f32::INFINITY, f32::NEG_INFINITY, 0.0).unwrap();
        assert_eq!(c, Color::new(255, 0, 0));
    }

    #[test]
    fn nan_channel_is_rejected() {
        assert_eq!(
            Color::from_unit_f32(0.2, f32::NAN, 0.1),
            Err(MatchError::InvalidColor { channel: 'g' })
        );
    }

    #[test]
    fn integer_channels_are_clamped() {
        assert_eq!(Color::from_rgb_clamped(-3, 256, 17), Color::new(0, 255, 17));
    }

    #[test]
    fn rgb_interop() {
        let c: Color = rgb::RGB8::new(1, 2, 3).into();
        assert_eq!(c, Color::new(1, 2, 3));
        let back: rgb::RGB8 = c.into();
        assert_eq!(back, rgb::RGB8::new(1, 2, 3));
        assert_eq!(<[u8; 3]>::from(c), [1, 2, 3]);
    }
}
