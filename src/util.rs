use nalgebra::Vector4;

/// Packs a clamped linear color into a 32-bit `0xAABBGGRR` word: alpha in the
/// most significant byte, red in the least. In memory that is the R, G, B, A
/// byte order the presentation texture expects.
pub fn pack_rgba(color: &Vector4<f32>) -> u32 {
    let r = (color.x * 255.0) as u32;
    let g = (color.y * 255.0) as u32;
    let b = (color.z * 255.0) as u32;
    let a = (color.w * 255.0) as u32;

    (a << 24) | (b << 16) | (g << 8) | r
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_channel_order() {
        assert_eq!(pack_rgba(&Vector4::new(1.0, 0.0, 0.0, 1.0)), 0xFF00_00FF);
        assert_eq!(pack_rgba(&Vector4::new(0.0, 1.0, 0.0, 1.0)), 0xFF00_FF00);
        assert_eq!(pack_rgba(&Vector4::new(0.0, 0.0, 1.0, 1.0)), 0xFFFF_0000);
        assert_eq!(pack_rgba(&Vector4::new(1.0, 1.0, 1.0, 1.0)), 0xFFFF_FFFF);
        assert_eq!(pack_rgba(&Vector4::new(0.0, 0.0, 0.0, 0.0)), 0x0000_0000);
    }

    #[test]
    fn bytes_land_rgba_in_memory() {
        let packed = pack_rgba(&Vector4::new(1.0, 0.5, 0.0, 1.0));
        let bytes = packed.to_le_bytes();
        assert_eq!(bytes[0], 255);
        assert_eq!(bytes[1], 127);
        assert_eq!(bytes[2], 0);
        assert_eq!(bytes[3], 255);
    }
}
