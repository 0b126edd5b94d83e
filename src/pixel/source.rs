// Lockable image sources.
//
// An `ImageSource` owns native pixel memory laid out in rows of `|stride|`
// bytes. A positive stride means row 0 (the top row) starts at `scan0` and
// later rows follow it in memory. A negative stride means the image is stored
// bottom-up: `scan0` points at the top row, which is the *last* row in memory.
//
// `RawImage` is the in-memory implementation used by the loader, the CLI and
// the tests.

use super::PixelError;

// ---------------------------------------------------------------------------
// Pixel depth
// ---------------------------------------------------------------------------

/// Supported pixel layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelDepth {
    /// One gray byte per pixel.
    Gray8,
    /// B, G, R.
    Bgr24,
    /// B, G, R, A.
    Bgra32,
}

impl PixelDepth {
    /// Map a bits-per-pixel value to a supported depth.
    pub fn from_bits(bits: u16) -> Result<Self, PixelError> {
        match bits {
            8 => Ok(Self::Gray8),
            24 => Ok(Self::Bgr24),
            32 => Ok(Self::Bgra32),
            _ => Err(PixelError::UnsupportedPixelFormat { bits }),
        }
    }

    pub const fn bits(self) -> u16 {
        match self {
            Self::Gray8 => 8,
            Self::Bgr24 => 24,
            Self::Bgra32 => 32,
        }
    }

    pub const fn bytes_per_pixel(self) -> usize {
        self.bits() as usize / 8
    }

    /// Bytes of color written per delta token (alpha is never emitted).
    pub const fn token_sample_len(self) -> usize {
        match self {
            Self::Gray8 => 1,
            Self::Bgr24 | Self::Bgra32 => 3,
        }
    }
}

// ---------------------------------------------------------------------------
// Native region
// ---------------------------------------------------------------------------

/// Location of row 0 and the signed row pitch inside a source's memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeRegion {
    /// Byte offset of the top row.
    pub scan0: usize,
    /// Signed bytes between consecutive logical rows.
    pub stride: isize,
}

impl NativeRegion {
    /// Bytes per row, ignoring direction.
    pub fn row_size(&self) -> usize {
        self.stride.unsigned_abs()
    }

    /// Memory offset of logical row `y`, or `None` if it would be negative.
    pub fn row_start(&self, y: usize) -> Option<usize> {
        let delta = isize::try_from(y).ok()?.checked_mul(self.stride)?;
        self.scan0.checked_add_signed(delta)
    }
}

// ---------------------------------------------------------------------------
// ImageSource trait
// ---------------------------------------------------------------------------

/// An image whose pixel memory can be locked for direct row access.
///
/// Implementations track their own lock state: a second `lock()` before
/// `unlock()` must fail with [`PixelError::AlreadyLocked`], and `unlock()`
/// without a lock must fail with [`PixelError::NotLocked`]. Lock state is a
/// plain flag; sharing one source between threads is not supported.
pub trait ImageSource {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Native bits per pixel. May be a depth the pixel layer rejects.
    fn bits_per_pixel(&self) -> u16;

    /// Lock the pixel memory and describe its row layout.
    fn lock(&mut self) -> Result<NativeRegion, PixelError>;

    /// Release a lock taken by [`lock`](Self::lock).
    fn unlock(&mut self) -> Result<(), PixelError>;

    fn is_locked(&self) -> bool;

    /// Raw native memory.
    fn memory(&self) -> &[u8];

    /// Raw native memory, writable.
    fn memory_mut(&mut self) -> &mut [u8];
}

// ---------------------------------------------------------------------------
// RawImage
// ---------------------------------------------------------------------------

/// Heap-backed image with 4-byte aligned rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImage {
    width: u32,
    height: u32,
    bits: u16,
    stride: isize,
    data: Vec<u8>,
    locked: bool,
}

impl RawImage {
    /// Zeroed top-down image.
    pub fn new(width: u32, height: u32, bits: u16) -> Self {
        Self::with_direction(width, height, bits, false)
    }

    /// Zeroed bottom-up image (negative stride).
    pub fn bottom_up(width: u32, height: u32, bits: u16) -> Self {
        Self::with_direction(width, height, bits, true)
    }

    fn with_direction(width: u32, height: u32, bits: u16, bottom_up: bool) -> Self {
        let row = Self::aligned_stride(width, bits);
        let stride = row as isize;
        Self {
            width,
            height,
            bits,
            stride: if bottom_up { -stride } else { stride },
            data: vec![0; row * height as usize],
            locked: false,
        }
    }

    /// Row size rounded up to a multiple of four bytes.
    pub fn aligned_stride(width: u32, bits: u16) -> usize {
        (width as usize * bits as usize).div_ceil(32) * 4
    }

    /// Signed stride (negative for bottom-up images).
    pub fn stride(&self) -> isize {
        self.stride
    }

    pub fn is_bottom_up(&self) -> bool {
        self.stride < 0
    }

    /// Offset of the top row in memory.
    pub fn scan0(&self) -> usize {
        if self.is_bottom_up() {
            self.height.saturating_sub(1) as usize * self.stride.unsigned_abs()
        } else {
            0
        }
    }

    /// Whole backing memory in storage order.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Logical row `y` (top row is 0), including padding.
    pub fn row(&self, y: u32) -> &[u8] {
        let start = self.row_offset(y);
        &self.data[start..start + self.stride.unsigned_abs()]
    }

    /// Logical row `y`, writable.
    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let start = self.row_offset(y);
        let len = self.stride.unsigned_abs();
        &mut self.data[start..start + len]
    }

    fn row_offset(&self, y: u32) -> usize {
        assert!(y < self.height, "row {y} out of range (height {})", self.height);
        let row = self.stride.unsigned_abs();
        if self.is_bottom_up() {
            (self.height - 1 - y) as usize * row
        } else {
            y as usize * row
        }
    }

    /// Fill every pixel by calling `f(x, y)`, writing native byte order.
    ///
    /// `f` returns B, G, R, A; only the leading `bits / 8` bytes are stored
    /// (the gray byte for 8-bit images is the first one). Pixels wider than
    /// four bytes get the four values in their first bytes, the rest stays
    /// untouched.
    pub fn fill_with(&mut self, mut f: impl FnMut(u32, u32) -> [u8; 4]) {
        let bpp = (self.bits / 8) as usize;
        let copied = bpp.min(4);
        for y in 0..self.height {
            let width = self.width;
            let row = self.row_mut(y);
            for x in 0..width {
                let px = f(x, y);
                let start = x as usize * bpp;
                row[start..start + copied].copy_from_slice(&px[..copied]);
            }
        }
    }
}

impl ImageSource for RawImage {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn bits_per_pixel(&self) -> u16 {
        self.bits
    }

    fn lock(&mut self) -> Result<NativeRegion, PixelError> {
        if self.locked {
            return Err(PixelError::AlreadyLocked);
        }
        self.locked = true;
        Ok(NativeRegion {
            scan0: self.scan0(),
            stride: self.stride,
        })
    }

    fn unlock(&mut self) -> Result<(), PixelError> {
        if !self.locked {
            return Err(PixelError::NotLocked);
        }
        self.locked = false;
        Ok(())
    }

    fn is_locked(&self) -> bool {
        self.locked
    }

    fn memory(&self) -> &[u8] {
        &self.data
    }

    fn memory_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_mapping() {
        assert_eq!(PixelDepth::from_bits(8).unwrap(), PixelDepth::Gray8);
        assert_eq!(PixelDepth::from_bits(24).unwrap().bytes_per_pixel(), 3);
        assert_eq!(PixelDepth::from_bits(32).unwrap().token_sample_len(), 3);
        assert_eq!(
            PixelDepth::from_bits(16),
            Err(PixelError::UnsupportedPixelFormat { bits: 16 })
        );
    }

    #[test]
    fn stride_is_dword_aligned() {
        assert_eq!(RawImage::aligned_stride(3, 24), 12);
        assert_eq!(RawImage::aligned_stride(4, 24), 12);
        assert_eq!(RawImage::aligned_stride(5, 8), 8);
        assert_eq!(RawImage::aligned_stride(5, 32), 20);
    }

    #[test]
    fn bottom_up_rows_are_reversed_in_memory() {
        let mut img = RawImage::bottom_up(2, 3, 8);
        img.row_mut(0)[0] = 0xAA;
        img.row_mut(2)[0] = 0xCC;
        // stride is 4; top row lives in the last memory row
        assert_eq!(img.stride(), -4);
        assert_eq!(img.scan0(), 8);
        assert_eq!(img.data()[8], 0xAA);
        assert_eq!(img.data()[0], 0xCC);
    }

    #[test]
    fn region_row_start_follows_sign() {
        let region = NativeRegion { scan0: 8, stride: -4 };
        assert_eq!(region.row_start(0), Some(8));
        assert_eq!(region.row_start(2), Some(0));
        assert_eq!(region.row_start(3), None);
        assert_eq!(region.row_size(), 4);
    }

    #[test]
    fn fill_with_wide_pixels_writes_leading_bytes() {
        let mut img = RawImage::new(2, 2, 64);
        img.fill_with(|x, y| [x as u8, y as u8, 7, 9]);
        assert_eq!(img.stride(), 16);
        assert_eq!(&img.row(1)[8..16], &[1, 1, 7, 9, 0, 0, 0, 0]);
    }

    #[test]
    fn lock_state_is_enforced() {
        let mut img = RawImage::new(1, 1, 24);
        assert_eq!(img.unlock(), Err(PixelError::NotLocked));
        img.lock().unwrap();
        assert!(img.is_locked());
        assert_eq!(img.lock(), Err(PixelError::AlreadyLocked));
        img.unlock().unwrap();
        assert!(!img.is_locked());
    }
}
