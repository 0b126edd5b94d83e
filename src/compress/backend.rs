// General-purpose compressors behind one trait.
//
// Provides a pluggable `CompressBackend` trait with built-in implementations:
//   - Gzip and raw Deflate (via flate2, feature-gated `gzip`)
//   - LZMA (via lzma-rs, feature-gated `lzma`)
//   - LZ4 block format with prepended size (via lz4_flex, feature-gated `lz4`)
//   - Zstandard with optional dictionary (via zstd, feature-gated `zstd`)
//   - External/custom compressors via the trait
//
// Backends are configured once with a level and, for Zstandard, a raw
// content dictionary. LZMA and LZ4 have no level knob and ignore it.

use std::fmt;
use std::io;

use bitflags::bitflags;

use super::level::{self, FLATE_MAX_LEVEL, MIN_LEVEL, ZSTD_MAX_LEVEL};

// ---------------------------------------------------------------------------
// CompressBackend trait
// ---------------------------------------------------------------------------

/// A byte-in, byte-out compressor.
///
/// # Implementing a custom backend
///
/// ```no_run
/// use pixdelta::compress::CompressBackend;
///
/// struct MyCompressor;
///
/// impl CompressBackend for MyCompressor {
///     fn name(&self) -> &str { "mine" }
///     fn compress(&self, data: &[u8]) -> std::io::Result<Vec<u8>> {
///         Ok(data.to_vec()) // placeholder
///     }
///     fn decompress(&self, data: &[u8]) -> std::io::Result<Vec<u8>> {
///         Ok(data.to_vec()) // placeholder
///     }
/// }
/// ```
pub trait CompressBackend: Send + Sync {
    /// Short label used in reports.
    fn name(&self) -> &str;

    /// Compress `data` in one shot.
    fn compress(&self, data: &[u8]) -> io::Result<Vec<u8>>;

    /// Invert [`compress`](Self::compress).
    fn decompress(&self, data: &[u8]) -> io::Result<Vec<u8>>;
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Settings shared by every backend built for one comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressOptions {
    /// Quality 0-100, mapped onto each codec's level range.
    pub quality: u32,
    /// Raw content dictionary (Zstandard only).
    pub dictionary: Option<Vec<u8>>,
}

impl Default for CompressOptions {
    fn default() -> Self {
        Self {
            quality: 50,
            dictionary: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Gzip / Deflate backends
// ---------------------------------------------------------------------------

/// Gzip container (deflate + header + CRC32).
#[cfg(feature = "gzip")]
#[derive(Debug, Clone, Copy)]
pub struct GzipBackend {
    level: flate2::Compression,
}

#[cfg(feature = "gzip")]
impl GzipBackend {
    /// Create a Gzip backend with the given compression level (0-9).
    pub fn new(level: u32) -> Self {
        Self {
            level: flate2::Compression::new(level),
        }
    }
}

#[cfg(feature = "gzip")]
impl Default for GzipBackend {
    fn default() -> Self {
        Self::new(6)
    }
}

#[cfg(feature = "gzip")]
impl CompressBackend for GzipBackend {
    fn name(&self) -> &str {
        "gzip"
    }

    fn compress(&self, data: &[u8]) -> io::Result<Vec<u8>> {
        use flate2::write::GzEncoder;
        use io::Write;

        let mut encoder = GzEncoder::new(Vec::new(), self.level);
        encoder.write_all(data)?;
        encoder.finish()
    }

    fn decompress(&self, data: &[u8]) -> io::Result<Vec<u8>> {
        use flate2::read::GzDecoder;
        use io::Read;

        let mut output = Vec::new();
        GzDecoder::new(data).read_to_end(&mut output)?;
        Ok(output)
    }
}

/// Raw deflate stream, no container.
#[cfg(feature = "gzip")]
#[derive(Debug, Clone, Copy)]
pub struct DeflateBackend {
    level: flate2::Compression,
}

#[cfg(feature = "gzip")]
impl DeflateBackend {
    pub fn new(level: u32) -> Self {
        Self {
            level: flate2::Compression::new(level),
        }
    }
}

#[cfg(feature = "gzip")]
impl CompressBackend for DeflateBackend {
    fn name(&self) -> &str {
        "deflate"
    }

    fn compress(&self, data: &[u8]) -> io::Result<Vec<u8>> {
        use flate2::write::DeflateEncoder;
        use io::Write;

        let mut encoder = DeflateEncoder::new(Vec::new(), self.level);
        encoder.write_all(data)?;
        encoder.finish()
    }

    fn decompress(&self, data: &[u8]) -> io::Result<Vec<u8>> {
        use flate2::read::DeflateDecoder;
        use io::Read;

        let mut output = Vec::new();
        DeflateDecoder::new(data).read_to_end(&mut output)?;
        Ok(output)
    }
}

// ---------------------------------------------------------------------------
// LZMA backend
// ---------------------------------------------------------------------------

/// LZMA "alone" format with default properties.
#[cfg(feature = "lzma")]
#[derive(Debug, Clone, Copy, Default)]
pub struct LzmaBackend;

#[cfg(feature = "lzma")]
impl CompressBackend for LzmaBackend {
    fn name(&self) -> &str {
        "lzma"
    }

    fn compress(&self, data: &[u8]) -> io::Result<Vec<u8>> {
        let mut input = io::Cursor::new(data);
        let mut output = Vec::new();
        lzma_rs::lzma_compress(&mut input, &mut output)?;
        Ok(output)
    }

    fn decompress(&self, data: &[u8]) -> io::Result<Vec<u8>> {
        let mut input = io::BufReader::new(io::Cursor::new(data));
        let mut output = Vec::new();
        lzma_rs::lzma_decompress(&mut input, &mut output)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("LZMA: {e}")))?;
        Ok(output)
    }
}

// ---------------------------------------------------------------------------
// LZ4 backend
// ---------------------------------------------------------------------------

/// LZ4 block with the uncompressed size prepended (little-endian u32).
#[cfg(feature = "lz4")]
#[derive(Debug, Clone, Copy, Default)]
pub struct Lz4Backend;

#[cfg(feature = "lz4")]
impl CompressBackend for Lz4Backend {
    fn name(&self) -> &str {
        "lz4"
    }

    fn compress(&self, data: &[u8]) -> io::Result<Vec<u8>> {
        Ok(lz4_flex::block::compress_prepend_size(data))
    }

    fn decompress(&self, data: &[u8]) -> io::Result<Vec<u8>> {
        lz4_flex::block::decompress_size_prepended(data)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("LZ4: {e}")))
    }
}

// ---------------------------------------------------------------------------
// Zstandard backend
// ---------------------------------------------------------------------------

/// Zstandard frame, optionally primed with a raw content dictionary.
///
/// The same dictionary must be supplied to decompress.
#[cfg(feature = "zstd")]
#[derive(Debug, Clone)]
pub struct ZstdBackend {
    level: i32,
    dictionary: Option<Vec<u8>>,
}

#[cfg(feature = "zstd")]
impl ZstdBackend {
    pub fn new(level: i32) -> Self {
        Self {
            level,
            dictionary: None,
        }
    }

    pub fn with_dictionary(level: i32, dictionary: Vec<u8>) -> Self {
        Self {
            level,
            dictionary: Some(dictionary),
        }
    }
}

#[cfg(feature = "zstd")]
impl CompressBackend for ZstdBackend {
    fn name(&self) -> &str {
        "zstd"
    }

    fn compress(&self, data: &[u8]) -> io::Result<Vec<u8>> {
        match &self.dictionary {
            Some(dict) => zstd::bulk::Compressor::with_dictionary(self.level, dict)?.compress(data),
            None => zstd::bulk::compress(data, self.level),
        }
    }

    fn decompress(&self, data: &[u8]) -> io::Result<Vec<u8>> {
        use io::Read;

        match &self.dictionary {
            Some(dict) => {
                let mut decoder = zstd::stream::read::Decoder::with_dictionary(data, dict)?;
                let mut output = Vec::new();
                decoder.read_to_end(&mut output)?;
                Ok(output)
            }
            None => zstd::stream::decode_all(data),
        }
    }
}

// ---------------------------------------------------------------------------
// Backend selection
// ---------------------------------------------------------------------------

/// One built-in backend family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Gzip,
    Deflate,
    Lzma,
    Lz4,
    Zstd,
}

impl BackendKind {
    pub const ALL: [BackendKind; 5] = [
        BackendKind::Gzip,
        BackendKind::Deflate,
        BackendKind::Lzma,
        BackendKind::Lz4,
        BackendKind::Zstd,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Gzip => "gzip",
            Self::Deflate => "deflate",
            Self::Lzma => "lzma",
            Self::Lz4 => "lz4",
            Self::Zstd => "zstd",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(name.trim()))
    }

    /// Whether support for this backend was compiled in.
    pub const fn is_available(self) -> bool {
        match self {
            Self::Gzip | Self::Deflate => cfg!(feature = "gzip"),
            Self::Lzma => cfg!(feature = "lzma"),
            Self::Lz4 => cfg!(feature = "lz4"),
            Self::Zstd => cfg!(feature = "zstd"),
        }
    }

    /// Instantiate the backend for `opts`.
    ///
    /// Fails with `ErrorKind::Unsupported` when the feature is disabled.
    pub fn build(self, opts: &CompressOptions) -> io::Result<Box<dyn CompressBackend>> {
        let flate_level = || level::level_from_quality(opts.quality, FLATE_MAX_LEVEL, MIN_LEVEL);
        let zstd_level = || level::level_from_quality(opts.quality, ZSTD_MAX_LEVEL, MIN_LEVEL) as i32;

        match self {
            #[cfg(feature = "gzip")]
            Self::Gzip => Ok(Box::new(GzipBackend::new(flate_level()))),
            #[cfg(feature = "gzip")]
            Self::Deflate => Ok(Box::new(DeflateBackend::new(flate_level()))),
            #[cfg(feature = "lzma")]
            Self::Lzma => Ok(Box::new(LzmaBackend)),
            #[cfg(feature = "lz4")]
            Self::Lz4 => Ok(Box::new(Lz4Backend)),
            #[cfg(feature = "zstd")]
            Self::Zstd => Ok(Box::new(match &opts.dictionary {
                Some(dict) => ZstdBackend::with_dictionary(zstd_level(), dict.clone()),
                None => ZstdBackend::new(zstd_level()),
            })),
            #[allow(unreachable_patterns)]
            other => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!("backend '{}' was not compiled in", other.name()),
            )),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

bitflags! {
    /// A set of backends to run in one comparison.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BackendSet: u8 {
        const GZIP = 1 << 0;
        const DEFLATE = 1 << 1;
        const LZMA = 1 << 2;
        const LZ4 = 1 << 3;
        const ZSTD = 1 << 4;
    }
}

impl BackendSet {
    pub const fn of(kind: BackendKind) -> Self {
        match kind {
            BackendKind::Gzip => Self::GZIP,
            BackendKind::Deflate => Self::DEFLATE,
            BackendKind::Lzma => Self::LZMA,
            BackendKind::Lz4 => Self::LZ4,
            BackendKind::Zstd => Self::ZSTD,
        }
    }

    /// Every backend compiled into this build.
    pub fn available() -> Self {
        BackendKind::ALL
            .into_iter()
            .filter(|k| k.is_available())
            .fold(Self::empty(), |set, k| set | Self::of(k))
    }

    /// Members in a fixed order.
    pub fn kinds(self) -> impl Iterator<Item = BackendKind> {
        BackendKind::ALL
            .into_iter()
            .filter(move |&k| self.contains(Self::of(k)))
    }

    /// Parse a comma-separated list such as `"gzip,zstd"`. `"all"` selects
    /// every available backend.
    pub fn parse_list(list: &str) -> Result<Self, String> {
        if list.trim().eq_ignore_ascii_case("all") {
            return Ok(Self::available());
        }
        list.split(',')
            .filter(|s| !s.trim().is_empty())
            .try_fold(Self::empty(), |set, name| {
                BackendKind::from_name(name)
                    .map(|k| set | Self::of(k))
                    .ok_or_else(|| format!("unknown backend '{}'", name.trim()))
            })
    }

    /// Build every member, failing on the first one not compiled in.
    pub fn build(self, opts: &CompressOptions) -> io::Result<Vec<Box<dyn CompressBackend>>> {
        self.kinds().map(|k| k.build(opts)).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<u8> {
        b"Hello, world! This is test data. "
            .iter()
            .copied()
            .cycle()
            .take(1024)
            .collect()
    }

    #[test]
    fn every_available_backend_roundtrips() {
        let data = sample();
        for backend in BackendSet::available()
            .build(&CompressOptions::default())
            .unwrap()
        {
            let compressed = backend.compress(&data).unwrap();
            assert!(
                compressed.len() < data.len(),
                "{} did not shrink repetitive data",
                backend.name()
            );
            assert_eq!(backend.decompress(&compressed).unwrap(), data, "{}", backend.name());
        }
    }

    #[cfg(feature = "zstd")]
    #[test]
    fn zstd_dictionary_roundtrip() {
        let dict: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
        let data: Vec<u8> = (0..=255u8).cycle().skip(17).take(2048).collect();
        let backend = ZstdBackend::with_dictionary(3, dict.clone());
        let compressed = backend.compress(&data).unwrap();
        assert_eq!(backend.decompress(&compressed).unwrap(), data);

        // a decoder without the dictionary must not silently produce the input
        let plain = ZstdBackend::new(3);
        assert_ne!(plain.decompress(&compressed).ok(), Some(data));
    }

    #[cfg(feature = "lz4")]
    #[test]
    fn lz4_rejects_garbage() {
        // claims 8 bytes, then a token whose literal length extension is missing
        assert!(Lz4Backend.decompress(&[8, 0, 0, 0, 0xF0]).is_err());
    }

    #[cfg(feature = "gzip")]
    #[test]
    fn gzip_has_magic_header() {
        let out = GzipBackend::default().compress(b"abc").unwrap();
        assert_eq!(&out[..2], &[0x1F, 0x8B]);
    }

    #[test]
    fn kind_names_roundtrip() {
        for kind in BackendKind::ALL {
            assert_eq!(BackendKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(BackendKind::from_name(" ZSTD "), Some(BackendKind::Zstd));
        assert_eq!(BackendKind::from_name("brotli"), None);
    }

    #[test]
    fn set_parsing_and_order() {
        let set = BackendSet::parse_list("zstd, gzip").unwrap();
        assert_eq!(set, BackendSet::GZIP | BackendSet::ZSTD);
        let kinds: Vec<_> = set.kinds().collect();
        assert_eq!(kinds, vec![BackendKind::Gzip, BackendKind::Zstd]);
        assert!(BackendSet::parse_list("gzip,brotli").is_err());
        assert_eq!(BackendSet::parse_list("all").unwrap(), BackendSet::available());
    }

    #[test]
    fn custom_backend() {
        struct Reverse;
        impl CompressBackend for Reverse {
            fn name(&self) -> &str {
                "reverse"
            }
            fn compress(&self, data: &[u8]) -> io::Result<Vec<u8>> {
                Ok(data.iter().rev().copied().collect())
            }
            fn decompress(&self, data: &[u8]) -> io::Result<Vec<u8>> {
                Ok(data.iter().rev().copied().collect())
            }
        }

        let backend: Box<dyn CompressBackend> = Box::new(Reverse);
        let compressed = backend.compress(b"hello world").unwrap();
        assert_eq!(backend.decompress(&compressed).unwrap(), b"hello world");
        assert_eq!(backend.name(), "reverse");
    }
}
