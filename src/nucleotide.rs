//! 2-bit nucleotide packing for barcodes and UMIs.
//!
//! Each base is stored as two bits (`A = 00`, `C = 01`, `G = 10`, `T = 11`),
//! most significant base first, so a `u64` holds at most 32 bases.

use crate::{BusError, Result};

/// Maximum number of bases that fit in a packed `u64`.
pub const MAX_BASES: usize = 32;

const ALPHABET: [u8; 4] = [b'A', b'C', b'G', b'T'];

#[inline]
fn symbol_bits(symbol: u8) -> Option<u64> {
    match symbol {
        b'A' => Some(0b00),
        b'C' => Some(0b01),
        b'G' => Some(0b10),
        b'T' => Some(0b11),
        _ => None,
    }
}

/// Packs the first `length` bases of `sequence` into an integer.
///
/// # Errors
///
/// - [`BusError::SequenceTooLong`] if `length` exceeds [`MAX_BASES`]
/// - [`BusError::InvalidLength`] if `sequence` has fewer than `length` characters
/// - [`BusError::InvalidSymbol`] if any of the first `length` characters is not `A`, `C`, `G` or `T`
///
/// # Examples
///
/// ```rust
/// use busio::encode;
///
/// assert_eq!(encode("ACGT", 4).unwrap(), 0b00_01_10_11);
/// // only the first `length` bases are used
/// assert_eq!(encode("TTAC", 2).unwrap(), 0b11_11);
/// assert!(encode("ACNT", 4).is_err());
/// ```
pub fn encode(sequence: &str, length: usize) -> Result<u64> {
    if length > MAX_BASES {
        return Err(BusError::SequenceTooLong {
            length,
            max: MAX_BASES,
        });
    }
    let actual = sequence.chars().count();
    if actual < length {
        return Err(BusError::InvalidLength {
            expected: length,
            actual,
        });
    }
    let mut packed = 0u64;
    for (pos, symbol) in sequence.chars().take(length).enumerate() {
        let bits = u8::try_from(symbol)
            .ok()
            .and_then(symbol_bits)
            .ok_or(BusError::InvalidSymbol { symbol, pos })?;
        packed = (packed << 2) | bits;
    }
    Ok(packed)
}

/// Packs the first `length` bases of an ASCII byte sequence.
///
/// Identical to [`encode`] but avoids UTF-8 handling for callers that already
/// hold raw sequence bytes (e.g. from a FASTQ record).
pub fn encode_bytes(sequence: &[u8], length: usize) -> Result<u64> {
    if length > MAX_BASES {
        return Err(BusError::SequenceTooLong {
            length,
            max: MAX_BASES,
        });
    }
    if sequence.len() < length {
        return Err(BusError::InvalidLength {
            expected: length,
            actual: sequence.len(),
        });
    }
    sequence[..length]
        .iter()
        .enumerate()
        .try_fold(0u64, |packed, (pos, &symbol)| {
            symbol_bits(symbol)
                .map(|bits| (packed << 2) | bits)
                .ok_or(BusError::InvalidSymbol {
                    symbol: symbol as char,
                    pos,
                })
        })
}

/// Unpacks `length` bases from `value`.
///
/// Every 2-bit pattern is a valid base so this never fails. Bases beyond the
/// 32 a `u64` can hold are returned as leading `A`s.
///
/// # Examples
///
/// ```rust
/// use busio::decode;
///
/// assert_eq!(decode(0b00_01_10_11, 4), "ACGT");
/// assert_eq!(decode(0b11, 3), "AAT");
/// ```
pub fn decode(value: u64, length: usize) -> String {
    (0..length)
        .map(|i| {
            let shift = 2 * (length - 1 - i);
            let bits = u32::try_from(shift)
                .ok()
                .and_then(|shift| value.checked_shr(shift))
                .unwrap_or(0)
                & 0b11;
            ALPHABET[bits as usize] as char
        })
        .collect()
}
