// Variable-length integers for serialized byte diffs.
//
// LEB128: seven value bits per byte, least-significant group first, bit 7
// set on every byte except the last.

/// Append `num` to `out`.
#[inline]
pub fn push_usize(out: &mut Vec<u8>, mut num: usize) {
    while num >= 0x80 {
        out.push(num as u8 | 0x80);
        num >>= 7;
    }
    out.push(num as u8);
}

/// Decode a `usize` from the front of `data`. Returns `(value, bytes_consumed)`.
pub fn read_usize(data: &[u8]) -> Result<(usize, usize), VarIntError> {
    let mut value: u64 = 0;
    for (i, &byte) in data.iter().enumerate() {
        let shift = 7 * i as u32;
        let group = u64::from(byte & 0x7F);
        if shift >= u64::BITS || (shift > 0 && group >> (u64::BITS - shift) != 0) {
            return Err(VarIntError::Overflow);
        }
        value |= group << shift;
        if byte & 0x80 == 0 {
            let value = usize::try_from(value).map_err(|_| VarIntError::Overflow)?;
            return Ok((value, i + 1));
        }
    }
    Err(VarIntError::Unterminated)
}

/// Number of bytes `num` occupies when encoded.
pub fn encoded_len(num: usize) -> usize {
    let bits = usize::BITS - num.leading_zeros();
    (bits.max(1) as usize).div_ceil(7)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum VarIntError {
    /// Value does not fit in a `usize`.
    #[error("varint overflow")]
    Overflow,
    /// Input ended before a byte with bit 7 clear.
    #[error("unterminated varint")]
    Unterminated,
}
