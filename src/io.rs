// Image file helpers.
//
// Decodes PNG/BMP files into `RawImage` (native B, G, R[, A] order with
// 4-byte aligned rows) and encodes them back. Gray images stay 8-bit, RGB
// becomes 24-bit, anything with alpha becomes 32-bit; other layouts are
// converted to the nearest of those.

use std::path::Path;

use image::{DynamicImage, GrayImage, RgbImage, RgbaImage};
use log::debug;

use crate::pixel::{ImageSource, PixelDepth, RawImage};

/// Error type for image loading and saving.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("{path}: {source}")]
    Image {
        path: String,
        #[source]
        source: image::ImageError,
    },
    #[error("cannot encode {0} bpp images")]
    UnsupportedDepth(u16),
}

/// Read and decode an image file.
pub fn load_image(path: impl AsRef<Path>) -> Result<RawImage, LoadError> {
    let path = path.as_ref();
    let img = image::open(path).map_err(|source| LoadError::Image {
        path: path.display().to_string(),
        source,
    })?;
    let raw = from_dynamic(&img);
    debug!(
        "loaded {}: {}x{} {} bpp",
        path.display(),
        raw.width(),
        raw.height(),
        raw.bits_per_pixel()
    );
    Ok(raw)
}

/// Convert a decoded image into native layout.
pub fn from_dynamic(img: &DynamicImage) -> RawImage {
    match img {
        DynamicImage::ImageLuma8(gray) => {
            let mut raw = RawImage::new(gray.width(), gray.height(), 8);
            raw.fill_with(|x, y| {
                let v = gray.get_pixel(x, y).0[0];
                [v, 0, 0, 0]
            });
            raw
        }
        DynamicImage::ImageRgb8(rgb) => from_rgb(rgb),
        other if other.color().has_alpha() => from_rgba(&other.to_rgba8()),
        other => from_rgb(&other.to_rgb8()),
    }
}

fn from_rgb(rgb: &RgbImage) -> RawImage {
    let mut raw = RawImage::new(rgb.width(), rgb.height(), 24);
    raw.fill_with(|x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        [b, g, r, 0]
    });
    raw
}

fn from_rgba(rgba: &RgbaImage) -> RawImage {
    let mut raw = RawImage::new(rgba.width(), rgba.height(), 32);
    raw.fill_with(|x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        [b, g, r, a]
    });
    raw
}

/// Convert native layout back into a decoded image.
pub fn to_dynamic(raw: &RawImage) -> Result<DynamicImage, LoadError> {
    let depth = PixelDepth::from_bits(raw.bits_per_pixel())
        .map_err(|_| LoadError::UnsupportedDepth(raw.bits_per_pixel()))?;
    let bpp = depth.bytes_per_pixel();
    let (w, h) = (raw.width(), raw.height());
    let px = |x: u32, y: u32| {
        let start = x as usize * bpp;
        &raw.row(y)[start..start + bpp]
    };

    Ok(match depth {
        PixelDepth::Gray8 => DynamicImage::ImageLuma8(GrayImage::from_fn(w, h, |x, y| {
            image::Luma([px(x, y)[0]])
        })),
        PixelDepth::Bgr24 => DynamicImage::ImageRgb8(RgbImage::from_fn(w, h, |x, y| {
            let p = px(x, y);
            image::Rgb([p[2], p[1], p[0]])
        })),
        PixelDepth::Bgra32 => DynamicImage::ImageRgba8(RgbaImage::from_fn(w, h, |x, y| {
            let p = px(x, y);
            image::Rgba([p[2], p[1], p[0], p[3]])
        })),
    })
}

/// Encode `raw` to `path`; the format follows the file extension.
pub fn save_image(raw: &RawImage, path: impl AsRef<Path>) -> Result<(), LoadError> {
    let path = path.as_ref();
    to_dynamic(raw)?
        .save(path)
        .map_err(|source| LoadError::Image {
            path: path.display().to_string(),
            source,
        })
}
