//! 24-bit fixed ⇄ 32-bit float sample conversion at the PCM I/O boundary
//! (§6): "the stream semantically carries 24-bit fixed-point values;
//! conversion uses the `int24/2³¹` convention."

const FULL_SCALE: f32 = 2_147_483_648.0;

/// Widens a 24-bit two's-complement sample (carried in the low 24 bits of
/// `raw`, as `dcsync_core::sync_packet` produces) to a normalized float:
/// sign-extend to 32 bits, shift left 8 so the sample occupies the high
/// 24 bits of the word, then divide by full scale.
#[must_use]
pub fn int24_to_f32(raw: u32) -> f32 {
    let mut value = (raw & 0x00FF_FFFF) as i32;
    if value & 0x0080_0000 != 0 {
        value |= !0x00FF_FFFFu32 as i32;
    }
    let widened = value << 8;
    widened as f32 / FULL_SCALE
}

/// Inverse of [`int24_to_f32`]: narrows a float sample back to a 24-bit
/// two's-complement value in the low 24 bits of a `u32`.
#[must_use]
pub fn f32_to_int24(sample: f32) -> u32 {
    let clamped = sample.clamp(-1.0, 1.0);
    let widened = (clamped * FULL_SCALE) as i32;
    ((widened >> 8) as u32) & 0x00FF_FFFF
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_round_trips_exactly() {
        assert_eq!(int24_to_f32(0), 0.0);
        assert_eq!(f32_to_int24(0.0), 0);
    }

    #[test]
    fn max_positive_is_just_under_one() {
        let f = int24_to_f32(0x007F_FFFF);
        assert!(f > 0.0 && f < 1.0);
    }

    #[test]
    fn min_negative_is_close_to_minus_one() {
        let f = int24_to_f32(0x0080_0000);
        assert!(f < 0.0 && f >= -1.0);
    }

    #[test]
    fn f32_to_int24_clamps_out_of_range_input() {
        assert_eq!(f32_to_int24(2.0), f32_to_int24(1.0));
        assert_eq!(f32_to_int24(-2.0), f32_to_int24(-1.0));
    }
}
