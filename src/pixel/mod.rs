// Pixel access layer.
//
// - `color`  — ColorSample and the Manhattan-distance similarity metric
// - `source` — ImageSource trait (lockable native pixel memory) + RawImage
// - `buffer` — PixelBuffer: owned, stride-aware copy of a locked source

pub mod buffer;
pub mod color;
pub mod source;

pub use buffer::PixelBuffer;
pub use color::{ColorSample, SIMILARITY_THRESHOLD, similarity};
pub use source::{ImageSource, NativeRegion, PixelDepth, RawImage};

/// Errors raised by pixel-level operations.
///
/// All of these are contract violations: nothing is retried internally.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PixelError {
    /// Source depth is not one of 8, 24 or 32 bits per pixel.
    #[error("unsupported pixel format: {bits} bpp (only 8, 24 and 32 are supported)")]
    UnsupportedPixelFormat { bits: u16 },
    /// Operation attempted on a buffer that was already released.
    #[error("pixel buffer used after release")]
    BufferDisposed,
    /// Coordinate maps outside the owned buffer.
    #[error("pixel ({x}, {y}) is out of bounds")]
    IndexOutOfBounds { x: u32, y: u32 },
    /// Two buffers with different dimensions were compared.
    #[error("size mismatch: reference {}x{}, candidate {}x{}", reference.0, reference.1, candidate.0, candidate.1)]
    SizeMismatch {
        reference: (u32, u32),
        candidate: (u32, u32),
    },
    /// The source is already locked by another buffer.
    #[error("image source is already locked")]
    AlreadyLocked,
    /// Unlock requested on a source that is not locked.
    #[error("image source is not locked")]
    NotLocked,
    /// The native region reported by the source does not cover its rows.
    #[error("native region out of range: {0}")]
    InvalidRegion(String),
}
