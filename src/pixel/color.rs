// Color samples and the similarity metric used to gate run emission.
//
// The metric is a plain Manhattan distance over R, G and B scaled to a
// percentage. It is a cheap proxy for perceptual closeness, not a real
// color-difference model. Alpha never participates.

/// Similarity (percent) at or above which two samples count as unchanged.
pub const SIMILARITY_THRESHOLD: f32 = 90.0;

/// Divisor for the summed channel distance.
const DISTANCE_SCALE: f32 = 768.0;

/// One pixel's channel values. `a` is only meaningful for 32-bit buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorSample {
    pub a: u8,
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl ColorSample {
    /// Opaque color from red, green and blue.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { a: 255, r, g, b }
    }

    /// Color with explicit alpha.
    pub const fn argb(a: u8, r: u8, g: u8, b: u8) -> Self {
        Self { a, r, g, b }
    }

    /// Opaque gray with all three channels set to `v`.
    pub const fn gray(v: u8) -> Self {
        Self::rgb(v, v, v)
    }
}

impl Default for ColorSample {
    fn default() -> Self {
        Self::rgb(0, 0, 0)
    }
}

/// Similarity of `a` and `b` as a percentage in `[0, 100]`.
///
/// `100 * (1 - (|dR| + |dG| + |dB|) / 768)`. Identical colors score 100;
/// black against white scores just under 0.4.
#[inline]
pub fn similarity(a: ColorSample, b: ColorSample) -> f32 {
    let distance = u32::from(a.r.abs_diff(b.r))
        + u32::from(a.g.abs_diff(b.g))
        + u32::from(a.b.abs_diff(b.b));
    100.0 * (1.0 - distance as f32 / DISTANCE_SCALE)
}

/// Whether `a` and `b` are similar enough to extend a run at `threshold`.
#[inline]
pub fn is_similar(a: ColorSample, b: ColorSample, threshold: f32) -> bool {
    similarity(a, b) >= threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_colors_are_fully_similar() {
        let c = ColorSample::rgb(12, 200, 99);
        assert_eq!(similarity(c, c), 100.0);
    }

    #[test]
    fn black_white_is_near_zero() {
        let s = similarity(ColorSample::gray(0), ColorSample::gray(255));
        assert!(s > 0.0 && s < 1.0, "got {s}");
    }

    #[test]
    fn alpha_is_ignored() {
        let a = ColorSample::argb(0, 10, 20, 30);
        let b = ColorSample::argb(255, 10, 20, 30);
        assert_eq!(similarity(a, b), 100.0);
    }

    #[test]
    fn symmetric() {
        let a = ColorSample::rgb(1, 50, 250);
        let b = ColorSample::rgb(90, 3, 7);
        assert_eq!(similarity(a, b), similarity(b, a));
    }

    #[test]
    fn threshold_boundary() {
        // 76 total distance -> 90.104..%, 77 -> 89.97..%
        let base = ColorSample::gray(100);
        assert!(is_similar(base, ColorSample::rgb(176, 100, 100), SIMILARITY_THRESHOLD));
        assert!(!is_similar(base, ColorSample::rgb(177, 100, 100), SIMILARITY_THRESHOLD));
    }
}
