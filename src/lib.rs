//! Pixdelta: stride-aware pixel buffers and run-based delta encoding.
//!
//! The crate provides:
//! - Exclusive, scoped pixel access over 8/24/32-bit images (`pixel`)
//! - A similarity-gated run encoder for image pairs and a sparse byte diff (`delta`)
//! - Pluggable general-purpose compressors and size/timing reports (`compress`)
//! - Image file loading (`io`, `image-io` feature)
//! - An optional CLI (`cli` feature)
//!
//! # Quick Start
//!
//! ```no_run
//! use pixdelta::delta::DeltaMapper;
//! use pixdelta::pixel::{PixelBuffer, RawImage};
//!
//! let mut before = RawImage::new(64, 64, 24);
//! let mut after = RawImage::new(64, 64, 24);
//!
//! let reference = PixelBuffer::acquire(&mut before).unwrap();
//! let candidate = PixelBuffer::acquire(&mut after).unwrap();
//! let stream: Vec<u8> = DeltaMapper::new(&reference, &candidate).unwrap().collect();
//! assert!(stream.len() < 64 * 64 * 3);
//! ```

pub mod compress;
pub mod delta;
pub mod pixel;

#[cfg(feature = "image-io")]
pub mod io;

#[cfg(feature = "cli")]
pub mod cli;
