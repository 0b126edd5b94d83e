// Similarity-gated run encoder for image pairs.
//
// A single raster-order pass compares each candidate pixel against the
// reference pixel at the same coordinate. Similar pixels extend a one-byte
// run counter; a dissimilar pixel, or a pixel arriving while the counter is
// saturated at 255, emits a token:
//
//   run_length (1 byte) | candidate sample (1 byte gray, or R G B)
//
// and resets the counter. Alpha is never emitted. A trailing run that never
// triggers a flush is not emitted either, so the stream is a compressibility
// proxy rather than a reconstruction format.
//
// The output is pull-based: bytes are produced as the consumer iterates.
// `DeltaMapper` borrows two live buffers; `DeltaStream` owns them, so
// dropping the stream (consumed or not) releases both sources.

use log::{debug, trace};

use crate::pixel::color::{self, ColorSample, SIMILARITY_THRESHOLD};
use crate::pixel::{ImageSource, PixelBuffer, PixelDepth, PixelError};

/// Largest run a single token can carry.
pub const MAX_RUN: u8 = u8::MAX;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Configuration for the run encoder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapperOptions {
    /// Similarity percentage at or above which a pixel counts as unchanged.
    pub threshold: f32,
}

impl Default for MapperOptions {
    fn default() -> Self {
        Self {
            threshold: SIMILARITY_THRESHOLD,
        }
    }
}

// ---------------------------------------------------------------------------
// Scanner state (shared by the borrowing and owning iterators)
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct RunScanner {
    width: u32,
    total: u64,
    index: u64,
    depth: PixelDepth,
    threshold: f32,
    run: u8,
    pending: [u8; 4],
    pending_len: u8,
    pending_pos: u8,
    tokens: u64,
    finished: bool,
}

impl RunScanner {
    fn new<R, C>(
        reference: &PixelBuffer<'_, R>,
        candidate: &PixelBuffer<'_, C>,
        opts: MapperOptions,
    ) -> Result<Self, PixelError>
    where
        R: ImageSource + ?Sized,
        C: ImageSource + ?Sized,
    {
        reference.ensure_live()?;
        candidate.ensure_live()?;

        let ref_dims = (reference.width(), reference.height());
        let cand_dims = (candidate.width(), candidate.height());
        if ref_dims != cand_dims {
            return Err(PixelError::SizeMismatch {
                reference: ref_dims,
                candidate: cand_dims,
            });
        }

        debug!(
            "delta scan over {}x{} pixels (threshold {})",
            ref_dims.0, ref_dims.1, opts.threshold
        );

        Ok(Self {
            width: ref_dims.0,
            total: u64::from(ref_dims.0) * u64::from(ref_dims.1),
            index: 0,
            depth: candidate.depth(),
            threshold: opts.threshold,
            run: 0,
            pending: [0; 4],
            pending_len: 0,
            pending_pos: 0,
            tokens: 0,
            finished: false,
        })
    }

    fn next_byte<R, C>(
        &mut self,
        reference: &PixelBuffer<'_, R>,
        candidate: &PixelBuffer<'_, C>,
    ) -> Option<u8>
    where
        R: ImageSource + ?Sized,
        C: ImageSource + ?Sized,
    {
        if self.pending_pos < self.pending_len {
            let b = self.pending[self.pending_pos as usize];
            self.pending_pos += 1;
            return Some(b);
        }

        while self.index < self.total {
            let x = (self.index % u64::from(self.width)) as u32;
            let y = (self.index / u64::from(self.width)) as u32;
            self.index += 1;

            let cand = candidate.sample_at(x, y);
            let refr = reference.sample_at(x, y);

            if self.run == MAX_RUN || !color::is_similar(cand, refr, self.threshold) {
                self.load_token(cand);
                self.run = 0;
                self.pending_pos = 1;
                return Some(self.pending[0]);
            }
            self.run += 1;
        }

        if !self.finished {
            self.finished = true;
            trace!(
                "delta scan finished: {} tokens, {} trailing pixels dropped",
                self.tokens, self.run
            );
        }
        None
    }

    fn load_token(&mut self, sample: ColorSample) {
        self.pending[0] = self.run;
        match self.depth {
            PixelDepth::Gray8 => {
                self.pending[1] = sample.b;
                self.pending_len = 2;
            }
            PixelDepth::Bgr24 | PixelDepth::Bgra32 => {
                self.pending[1] = sample.r;
                self.pending[2] = sample.g;
                self.pending[3] = sample.b;
                self.pending_len = 4;
            }
        }
        self.tokens += 1;
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let pending = usize::from(self.pending_len - self.pending_pos);
        let token_len = 1 + self.depth.token_sample_len() as u64;
        let upper = (self.total - self.index)
            .checked_mul(token_len)
            .and_then(|n| usize::try_from(n).ok())
            .and_then(|n| n.checked_add(pending));
        (pending, upper)
    }
}

// ---------------------------------------------------------------------------
// Borrowing iterator
// ---------------------------------------------------------------------------

/// Lazy token byte stream over two borrowed buffers.
///
/// The buffers stay borrowed for as long as the mapper lives, so they cannot
/// be released mid-scan. Re-scanning requires a new mapper.
pub struct DeltaMapper<'b, 'a, R, C>
where
    R: ImageSource + ?Sized,
    C: ImageSource + ?Sized,
{
    reference: &'b PixelBuffer<'a, R>,
    candidate: &'b PixelBuffer<'a, C>,
    scanner: RunScanner,
}

impl<'b, 'a, R, C> DeltaMapper<'b, 'a, R, C>
where
    R: ImageSource + ?Sized,
    C: ImageSource + ?Sized,
{
    /// Map `candidate` against `reference` with the default threshold.
    pub fn new(
        reference: &'b PixelBuffer<'a, R>,
        candidate: &'b PixelBuffer<'a, C>,
    ) -> Result<Self, PixelError> {
        Self::with_options(reference, candidate, MapperOptions::default())
    }

    /// Fails with `SizeMismatch` if the dimensions differ and with
    /// `BufferDisposed` if either buffer was released.
    pub fn with_options(
        reference: &'b PixelBuffer<'a, R>,
        candidate: &'b PixelBuffer<'a, C>,
        opts: MapperOptions,
    ) -> Result<Self, PixelError> {
        let scanner = RunScanner::new(reference, candidate, opts)?;
        Ok(Self {
            reference,
            candidate,
            scanner,
        })
    }

    /// Tokens emitted so far.
    pub fn tokens_emitted(&self) -> u64 {
        self.scanner.tokens
    }
}

impl<R, C> Iterator for DeltaMapper<'_, '_, R, C>
where
    R: ImageSource + ?Sized,
    C: ImageSource + ?Sized,
{
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        self.scanner.next_byte(self.reference, self.candidate)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.scanner.size_hint()
    }
}

// ---------------------------------------------------------------------------
// Owning iterator
// ---------------------------------------------------------------------------

/// Lazy token byte stream that owns both locked buffers.
///
/// Both sources are unlocked when the stream is dropped, whether or not it
/// was consumed; [`finish`](Self::finish) does the same and reports
/// write-back errors.
pub struct DeltaStream<'a, R, C>
where
    R: ImageSource + ?Sized,
    C: ImageSource + ?Sized,
{
    reference: PixelBuffer<'a, R>,
    candidate: PixelBuffer<'a, C>,
    scanner: RunScanner,
}

impl<'a, R, C> DeltaStream<'a, R, C>
where
    R: ImageSource + ?Sized,
    C: ImageSource + ?Sized,
{
    /// Lock both sources and prepare a scan.
    ///
    /// If anything fails, every source locked so far is unlocked again.
    pub fn open(
        reference: &'a mut R,
        candidate: &'a mut C,
        opts: MapperOptions,
    ) -> Result<Self, PixelError> {
        let reference = PixelBuffer::acquire(reference)?;
        let candidate = PixelBuffer::acquire(candidate)?;
        let scanner = RunScanner::new(&reference, &candidate, opts)?;
        Ok(Self {
            reference,
            candidate,
            scanner,
        })
    }

    pub fn tokens_emitted(&self) -> u64 {
        self.scanner.tokens
    }

    /// Release both buffers, returning the first error.
    pub fn finish(mut self) -> Result<(), PixelError> {
        let reference = self.reference.release();
        let candidate = self.candidate.release();
        reference.and(candidate)
    }
}

impl<R, C> Iterator for DeltaStream<'_, R, C>
where
    R: ImageSource + ?Sized,
    C: ImageSource + ?Sized,
{
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        self.scanner.next_byte(&self.reference, &self.candidate)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.scanner.size_hint()
    }
}

/// Lock both sources, collect the full token stream and unlock them.
pub fn map_images<R, C>(
    reference: &mut R,
    candidate: &mut C,
    opts: MapperOptions,
) -> Result<Vec<u8>, PixelError>
where
    R: ImageSource + ?Sized,
    C: ImageSource + ?Sized,
{
    let mut stream = DeltaStream::open(reference, candidate, opts)?;
    let bytes: Vec<u8> = stream.by_ref().collect();
    stream.finish()?;
    Ok(bytes)
}

// ---------------------------------------------------------------------------
// Token decoding
// ---------------------------------------------------------------------------

/// One `(run_length, sample)` unit of a delta stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    /// Similar pixels preceding the emitting pixel.
    pub run_length: u8,
    /// Candidate color at the emitting pixel (alpha always 255).
    pub sample: ColorSample,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("truncated token: expected {expected} bytes, got {got}")]
    Truncated { expected: usize, got: usize },
}

/// Parses a delta byte stream back into tokens, in emission order.
#[derive(Debug)]
pub struct TokenReader<I> {
    bytes: I,
    depth: PixelDepth,
    failed: bool,
}

impl<I: Iterator<Item = u8>> TokenReader<I> {
    pub fn new(bytes: impl IntoIterator<IntoIter = I>, depth: PixelDepth) -> Self {
        Self {
            bytes: bytes.into_iter(),
            depth,
            failed: false,
        }
    }
}

impl<I: Iterator<Item = u8>> Iterator for TokenReader<I> {
    type Item = Result<Token, TokenError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let run_length = self.bytes.next()?;

        let want = self.depth.token_sample_len();
        let mut buf = [0u8; 3];
        for (got, slot) in buf[..want].iter_mut().enumerate() {
            match self.bytes.next() {
                Some(b) => *slot = b,
                None => {
                    self.failed = true;
                    return Some(Err(TokenError::Truncated {
                        expected: 1 + want,
                        got: 1 + got,
                    }));
                }
            }
        }

        let sample = match self.depth {
            PixelDepth::Gray8 => ColorSample::gray(buf[0]),
            PixelDepth::Bgr24 | PixelDepth::Bgra32 => ColorSample::rgb(buf[0], buf[1], buf[2]),
        };
        Some(Ok(Token { run_length, sample }))
    }
}

/// Pixels accounted for by `tokens`: each covers its run plus the emitting pixel.
pub fn covered_pixels<'t>(tokens: impl IntoIterator<Item = &'t Token>) -> u64 {
    tokens
        .into_iter()
        .map(|t| u64::from(t.run_length) + 1)
        .sum()
}
