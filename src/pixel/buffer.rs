// Scoped, stride-aware pixel access.
//
// `PixelBuffer::acquire` locks a source and copies every native row into an
// owned buffer in logical (top-to-bottom) order, whatever the sign of the
// native stride. Pixels are then addressed as `y * stride + x * bpp`.
// `release` copies the rows back and unlocks the source; dropping an
// unreleased buffer does the same, so the source is unlocked on every exit
// path, including early returns and abandoned iteration.
//
// A second `release` is rejected with `BufferDisposed`, as is any pixel
// access after release.

use log::{debug, warn};

use super::color::ColorSample;
use super::source::{ImageSource, NativeRegion, PixelDepth};
use super::PixelError;

/// Exclusive, owned copy of a locked image's pixels.
///
/// Holds the source mutably borrowed for its whole lifetime, so no second
/// buffer can lock the same source concurrently. Not meant for use from
/// several threads at once.
pub struct PixelBuffer<'a, S: ImageSource + ?Sized> {
    source: &'a mut S,
    region: NativeRegion,
    depth: PixelDepth,
    width: u32,
    height: u32,
    stride: usize,
    pixels: Vec<u8>,
    released: bool,
}

impl<'a, S: ImageSource + ?Sized> PixelBuffer<'a, S> {
    /// Lock `source` and copy its pixels into a new buffer.
    ///
    /// Fails with [`PixelError::UnsupportedPixelFormat`] before touching the
    /// lock when the depth is not 8, 24 or 32 bits. If copying fails after
    /// the lock was taken, the source is unlocked again before returning.
    pub fn acquire(source: &'a mut S) -> Result<Self, PixelError> {
        let depth = PixelDepth::from_bits(source.bits_per_pixel())?;
        let width = source.width();
        let height = source.height();

        let region = source.lock()?;
        let pixels = match copy_rows_in(&*source, region, width, height, depth) {
            Ok(pixels) => pixels,
            Err(e) => {
                if let Err(unlock_err) = source.unlock() {
                    warn!("unlock after failed acquire: {unlock_err}");
                }
                return Err(e);
            }
        };

        debug!(
            "acquired {width}x{height} {} bpp buffer (native stride {})",
            depth.bits(),
            region.stride
        );

        Ok(Self {
            source,
            region,
            depth,
            width,
            height,
            stride: region.row_size(),
            pixels,
            released: false,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn depth(&self) -> PixelDepth {
        self.depth
    }

    /// Bytes per owned row, padding included.
    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Owned pixel bytes in top-to-bottom row order.
    pub fn as_bytes(&self) -> Result<&[u8], PixelError> {
        self.ensure_live()?;
        Ok(&self.pixels)
    }

    /// Read the pixel at `(x, y)`.
    ///
    /// 8-bit gray values are replicated into R, G and B. Alpha is 255 unless
    /// the buffer is 32-bit.
    pub fn get_pixel(&self, x: u32, y: u32) -> Result<ColorSample, PixelError> {
        self.ensure_live()?;
        let i = self.offset(x, y)?;
        Ok(self.decode_at(i))
    }

    /// Write the pixel at `(x, y)` in native B, G, R[, A] order.
    ///
    /// 8-bit buffers store only the blue channel.
    pub fn set_pixel(&mut self, x: u32, y: u32, color: ColorSample) -> Result<(), PixelError> {
        self.ensure_live()?;
        let i = self.offset(x, y)?;
        let px = &mut self.pixels[i..i + self.depth.bytes_per_pixel()];
        match self.depth {
            PixelDepth::Bgra32 => px.copy_from_slice(&[color.b, color.g, color.r, color.a]),
            PixelDepth::Bgr24 => px.copy_from_slice(&[color.b, color.g, color.r]),
            PixelDepth::Gray8 => px[0] = color.b,
        }
        Ok(())
    }

    /// Copy the pixels back into the source and unlock it.
    ///
    /// The buffer is disposed even if the write-back fails; the unlock is
    /// still attempted. Calling this twice yields `BufferDisposed`.
    pub fn release(&mut self) -> Result<(), PixelError> {
        self.ensure_live()?;
        self.released = true;

        let written = copy_rows_out(&mut *self.source, self.region, &self.pixels, self.height);
        let unlocked = self.source.unlock();
        self.pixels = Vec::new();

        debug!("released {}x{} buffer", self.width, self.height);
        written.and(unlocked)
    }

    /// Decode the sample at coordinates already known to be in range.
    ///
    /// Callers must have checked `x < width`, `y < height` and liveness.
    #[inline]
    pub(crate) fn sample_at(&self, x: u32, y: u32) -> ColorSample {
        let i = y as usize * self.stride + x as usize * self.depth.bytes_per_pixel();
        self.decode_at(i)
    }

    #[inline]
    fn decode_at(&self, i: usize) -> ColorSample {
        let p = &self.pixels;
        match self.depth {
            PixelDepth::Bgra32 => ColorSample::argb(p[i + 3], p[i + 2], p[i + 1], p[i]),
            PixelDepth::Bgr24 => ColorSample::rgb(p[i + 2], p[i + 1], p[i]),
            PixelDepth::Gray8 => ColorSample::gray(p[i]),
        }
    }

    fn offset(&self, x: u32, y: u32) -> Result<usize, PixelError> {
        let bpp = self.depth.bytes_per_pixel();
        if x >= self.width || y >= self.height {
            return Err(PixelError::IndexOutOfBounds { x, y });
        }
        let i = y as usize * self.stride + x as usize * bpp;
        if i + bpp > self.pixels.len() {
            return Err(PixelError::IndexOutOfBounds { x, y });
        }
        Ok(i)
    }

    pub(crate) fn ensure_live(&self) -> Result<(), PixelError> {
        if self.released {
            Err(PixelError::BufferDisposed)
        } else {
            Ok(())
        }
    }
}

impl<S: ImageSource + ?Sized> Drop for PixelBuffer<'_, S> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        warn!(
            "pixel buffer {}x{} dropped without release; releasing now",
            self.width, self.height
        );
        if let Err(e) = self.release() {
            warn!("release on drop failed: {e}");
        }
    }
}

impl<S: ImageSource + ?Sized> std::fmt::Debug for PixelBuffer<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("depth", &self.depth)
            .field("stride", &self.stride)
            .field("released", &self.released)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Row copies
// ---------------------------------------------------------------------------

fn row_range(region: NativeRegion, y: u32, mem_len: usize) -> Result<std::ops::Range<usize>, PixelError> {
    let start = region
        .row_start(y as usize)
        .ok_or_else(|| PixelError::InvalidRegion(format!("row {y} starts before memory")))?;
    let end = start + region.row_size();
    if end > mem_len {
        return Err(PixelError::InvalidRegion(format!(
            "row {y} ends at {end}, memory is {mem_len} bytes"
        )));
    }
    Ok(start..end)
}

fn copy_rows_in<S: ImageSource + ?Sized>(
    source: &S,
    region: NativeRegion,
    width: u32,
    height: u32,
    depth: PixelDepth,
) -> Result<Vec<u8>, PixelError> {
    let row_size = region.row_size();
    let min_row = width as usize * depth.bytes_per_pixel();
    if row_size < min_row {
        return Err(PixelError::InvalidRegion(format!(
            "stride {row_size} is smaller than {min_row} bytes of pixels"
        )));
    }

    let memory = source.memory();
    let mut pixels = vec![0u8; height as usize * row_size];
    for (y, dst) in (0..height).zip(pixels.chunks_exact_mut(row_size.max(1))) {
        let src = row_range(region, y, memory.len())?;
        dst.copy_from_slice(&memory[src]);
    }
    Ok(pixels)
}

fn copy_rows_out<S: ImageSource + ?Sized>(
    source: &mut S,
    region: NativeRegion,
    pixels: &[u8],
    height: u32,
) -> Result<(), PixelError> {
    let row_size = region.row_size();
    let memory = source.memory_mut();
    for (y, src) in (0..height).zip(pixels.chunks_exact(row_size.max(1))) {
        let dst = row_range(region, y, memory.len())?;
        memory[dst].copy_from_slice(src);
    }
    Ok(())
}
