// Sparse byte-level diff between two sequences.
//
// The shorter input is compared position by position against the longer
// one (the candidate on equal lengths). Every maximal run of mismatching
// positions becomes one span keyed by its start offset, holding the longer
// input's bytes for that run. Disjoint runs always get distinct keys.
//
// Bytes of the longer input past the shorter input's end are kept as a
// separate tail starting at `base_len`. The diff is a "how much changed"
// measure, not a minimal edit script: insertions shift everything after
// them and show up as long mismatching spans.

use std::collections::BTreeMap;

use super::varint::{self, VarIntError};

// ---------------------------------------------------------------------------
// Lazy span iterator
// ---------------------------------------------------------------------------

/// One contiguous mismatching region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffSpan<'a> {
    pub offset: usize,
    /// Replacement bytes, taken from the longer input.
    pub bytes: &'a [u8],
}

/// Yields mismatching spans in offset order without allocating.
#[derive(Debug, Clone)]
pub struct SpanIter<'a> {
    small: &'a [u8],
    big: &'a [u8],
    pos: usize,
}

impl<'a> Iterator for SpanIter<'a> {
    type Item = DiffSpan<'a>;

    fn next(&mut self) -> Option<DiffSpan<'a>> {
        let n = self.small.len();
        while self.pos < n && self.small[self.pos] == self.big[self.pos] {
            self.pos += 1;
        }
        if self.pos >= n {
            return None;
        }
        let start = self.pos;
        while self.pos < n && self.small[self.pos] != self.big[self.pos] {
            self.pos += 1;
        }
        Some(DiffSpan {
            offset: start,
            bytes: &self.big[start..self.pos],
        })
    }
}

/// Order the inputs as `(shorter, longer)`; ties keep `candidate` as longer.
fn order<'a>(reference: &'a [u8], candidate: &'a [u8]) -> (&'a [u8], &'a [u8]) {
    if candidate.len() >= reference.len() {
        (reference, candidate)
    } else {
        (candidate, reference)
    }
}

/// Lazily walk the mismatching spans of the overlapping prefix.
pub fn spans<'a>(reference: &'a [u8], candidate: &'a [u8]) -> SpanIter<'a> {
    let (small, big) = order(reference, candidate);
    SpanIter { small, big, pos: 0 }
}

/// Compute the full diff, tail included.
pub fn encode(reference: &[u8], candidate: &[u8]) -> ByteDiff {
    let (small, big) = order(reference, candidate);
    let spans = spans(reference, candidate)
        .map(|s| (s.offset, s.bytes.to_vec()))
        .collect();
    let tail = (big.len() > small.len()).then(|| big[small.len()..].to_vec());
    log::trace!(
        "byte diff: base {} bytes, longer {} bytes",
        small.len(),
        big.len()
    );
    ByteDiff {
        base_len: small.len(),
        spans,
        tail,
    }
}

// ---------------------------------------------------------------------------
// ByteDiff
// ---------------------------------------------------------------------------

/// Offset-keyed replacement bytes plus an optional trailing extension.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ByteDiff {
    base_len: usize,
    spans: BTreeMap<usize, Vec<u8>>,
    tail: Option<Vec<u8>>,
}

impl ByteDiff {
    /// Length of the shorter input the spans apply to.
    pub fn base_len(&self) -> usize {
        self.base_len
    }

    /// Spans keyed by start offset.
    pub fn spans(&self) -> &BTreeMap<usize, Vec<u8>> {
        &self.spans
    }

    /// Bytes past `base_len` in the longer input, if it was longer.
    pub fn tail(&self) -> Option<&[u8]> {
        self.tail.as_deref()
    }

    /// No mismatches and equal lengths.
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty() && self.tail.is_none()
    }

    /// Total bytes recorded across all spans and the tail.
    pub fn count_changed_bytes(&self) -> usize {
        self.spans.values().map(Vec::len).sum::<usize>() + self.tail.as_ref().map_or(0, Vec::len)
    }

    /// Rebuild the longer input from the shorter one.
    pub fn apply(&self, base: &[u8]) -> Result<Vec<u8>, ByteDiffError> {
        if base.len() != self.base_len {
            return Err(ByteDiffError::BaseLength {
                expected: self.base_len,
                actual: base.len(),
            });
        }
        let mut out = Vec::with_capacity(base.len() + self.tail.as_ref().map_or(0, Vec::len));
        out.extend_from_slice(base);
        for (&offset, bytes) in &self.spans {
            out[offset..offset + bytes.len()].copy_from_slice(bytes);
        }
        if let Some(tail) = &self.tail {
            out.extend_from_slice(tail);
        }
        Ok(out)
    }

    /// Serialize as varints: base length, span count, then
    /// `(offset, len, bytes)` per span, then tail length and bytes.
    /// A tail length of zero means no tail.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        varint::push_usize(&mut out, self.base_len);
        varint::push_usize(&mut out, self.spans.len());
        for (&offset, bytes) in &self.spans {
            varint::push_usize(&mut out, offset);
            varint::push_usize(&mut out, bytes.len());
            out.extend_from_slice(bytes);
        }
        let tail = self.tail.as_deref().unwrap_or_default();
        varint::push_usize(&mut out, tail.len());
        out.extend_from_slice(tail);
        out
    }

    fn encoded_len(&self) -> usize {
        let spans: usize = self
            .spans
            .iter()
            .map(|(&o, b)| varint::encoded_len(o) + varint::encoded_len(b.len()) + b.len())
            .sum();
        let tail = self.tail.as_ref().map_or(0, Vec::len);
        varint::encoded_len(self.base_len)
            + varint::encoded_len(self.spans.len())
            + spans
            + varint::encoded_len(tail)
            + tail
    }

    /// Parse the format written by [`to_bytes`](Self::to_bytes).
    pub fn from_bytes(data: &[u8]) -> Result<Self, ByteDiffError> {
        let mut r = Reader { data, pos: 0 };
        let base_len = r.usize()?;
        let count = r.usize()?;

        let mut spans = BTreeMap::new();
        let mut min_offset = 0usize;
        for _ in 0..count {
            let offset = r.usize()?;
            let len = r.usize()?;
            let end = offset
                .checked_add(len)
                .filter(|&end| offset >= min_offset && len > 0 && end <= base_len)
                .ok_or(ByteDiffError::InvalidSpan { offset, len })?;
            spans.insert(offset, r.take(len)?.to_vec());
            min_offset = end;
        }

        let tail_len = r.usize()?;
        let tail = (tail_len > 0).then(|| r.take(tail_len).map(<[u8]>::to_vec)).transpose()?;

        if r.pos != data.len() {
            return Err(ByteDiffError::TrailingData(data.len() - r.pos));
        }
        Ok(Self {
            base_len,
            spans,
            tail,
        })
    }
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn usize(&mut self) -> Result<usize, ByteDiffError> {
        let (val, used) = varint::read_usize(&self.data[self.pos..])?;
        self.pos += used;
        Ok(val)
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], ByteDiffError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or(ByteDiffError::Truncated)?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ByteDiffError {
    #[error("invalid length: {0}")]
    VarInt(#[from] VarIntError),
    #[error("serialized diff is truncated")]
    Truncated,
    #[error("span at {offset} (len {len}) overlaps, is empty, or exceeds the base")]
    InvalidSpan { offset: usize, len: usize },
    #[error("{0} unexpected trailing bytes")]
    TrailingData(usize),
    #[error("base is {actual} bytes, diff expects {expected}")]
    BaseLength { expected: usize, actual: usize },
}
