// Quality (0-100) to codec level mapping.

/// Highest flate2 (gzip/deflate) level.
pub const FLATE_MAX_LEVEL: u32 = 9;
/// Highest Zstandard level.
pub const ZSTD_MAX_LEVEL: u32 = 22;
/// Lowest level used for any codec.
pub const MIN_LEVEL: u32 = 1;

/// Linear map of `quality` onto `min..=max`, rounded to nearest.
///
/// Quality above 100 is clamped.
pub fn level_from_quality(quality: u32, max: u32, min: u32) -> u32 {
    let q = quality.min(100) as f32 / 100.0;
    (q * max.saturating_sub(min) as f32 + min as f32).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_and_midpoints() {
        assert_eq!(level_from_quality(0, ZSTD_MAX_LEVEL, MIN_LEVEL), 1);
        assert_eq!(level_from_quality(100, ZSTD_MAX_LEVEL, MIN_LEVEL), 22);
        assert_eq!(level_from_quality(50, ZSTD_MAX_LEVEL, MIN_LEVEL), 12);
        assert_eq!(level_from_quality(50, FLATE_MAX_LEVEL, MIN_LEVEL), 5);
        assert_eq!(level_from_quality(250, FLATE_MAX_LEVEL, MIN_LEVEL), 9);
    }
}
