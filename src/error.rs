//! Error handling for the busio library.
//!
//! This module defines all error types that can occur while encoding nucleotide
//! sequences and reading or writing BUS files, along with the non-fatal
//! [`Advisory`] diagnostics that are reported alongside a successful parse.

use std::error::Error as StdError;
use thiserror::Error;

/// A specialized `Result` type for busio operations.
///
/// This type is used throughout the library for any operation that can fail.
/// It's equivalent to `std::result::Result<T, BusError>`.
///
/// # Examples
///
/// ```rust
/// use busio::{encode, Result};
///
/// fn encode_barcode(seq: &str) -> Result<u64> {
///     let packed = encode(seq, seq.len())?;
///     Ok(packed)
/// }
/// assert_eq!(encode_barcode("ACGT").unwrap(), 0b00_01_10_11);
/// ```
pub type Result<T> = std::result::Result<T, BusError>;

/// Error types for BUS operations.
///
/// Format and version mismatches are not errors; they are reported as
/// [`Advisory`] values.
///
/// # Examples
///
/// ```rust
/// use busio::{BusError, BusFile, Header};
/// use std::io::Cursor;
///
/// # fn main() -> busio::Result<()> {
/// let mut buffer = Vec::new();
/// Header::new(16, 12).write_to(&mut buffer)?;
/// buffer.extend_from_slice(&[0u8; 20]); // not a whole record
///
/// match BusFile::from_bytes(&mut Cursor::new(buffer)) {
///     Err(BusError::TruncatedRecord { pos, index }) => {
///         assert_eq!(pos, 0);
///         assert_eq!(index, 0);
///     }
///     Err(e) => println!("Other error: {}", e),
///     Ok(_) => unreachable!(),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Error, Debug)]
pub enum BusError {
    /// I/O error from the underlying reader or writer.
    #[error("I/O error")]
    Io(#[from] std::io::Error),

    /// Transport decompression error from niffler.
    ///
    /// Raised when a gzip/zstd/bzip2 wrapped BUS stream cannot be opened.
    /// This is unrelated to the `busz` compressed BUS variant, which is not
    /// supported.
    #[cfg(feature = "niffler")]
    #[error("Niffler error")]
    Niffler(#[from] niffler::Error),

    /// The record section ended in the middle of a 32-byte record.
    ///
    /// `pos` is the byte offset of the partial record relative to the start
    /// of the record section and `index` is the index the record would have had.
    #[error("Truncated record {index} at body position {pos}")]
    TruncatedRecord { pos: usize, index: usize },

    /// A character outside the `{A, C, G, T}` alphabet was found.
    #[error("Invalid nucleotide ({symbol:?}) at position {pos}")]
    InvalidSymbol { symbol: char, pos: usize },

    /// The sequence is shorter than the requested encoding length.
    #[error("Invalid sequence length, expected at least ({expected}), found ({actual})")]
    InvalidLength { expected: usize, actual: usize },

    /// The requested encoding length does not fit in a `u64`.
    #[error("Sequence length {length} exceeds the maximum of {max} bases")]
    SequenceTooLong { length: usize, max: usize },

    /// The header text payload is too large for its `u32` length field.
    #[error("Header text of {0} bytes does not fit in a u32 length")]
    TextTooLong(usize),

    /// Array index is out of bounds.
    ///
    /// This occurs when trying to access records beyond the end of a
    /// memory-mapped file or with invalid slice bounds.
    #[error("Invalid index ({idx}) - Must be less than {max}")]
    InvalidIndex { idx: usize, max: usize },

    /// Error occurred during parallel processing.
    ///
    /// This wraps errors raised by user-defined parallel processors.
    #[error("Processing error: {0}")]
    Process(Box<dyn StdError + Send + Sync>),
}

/// Non-fatal diagnostics raised while parsing a header.
///
/// These never abort a parse. They are logged when encountered and retained
/// on [`crate::BusFile::advisories`] for callers that want to act on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Advisory {
    /// The magic tag is not `"BUS\0"`; the body was not parsed.
    UnrecognizedFormat { magic: [u8; 4] },
    /// The header declares a version other than [`crate::VERSION`].
    VersionMismatch { expected: u32, actual: u32 },
}
impl std::fmt::Display for Advisory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnrecognizedFormat { magic } => write!(
                f,
                "Unrecognized file format ({})",
                String::from_utf8_lossy(magic).escape_debug()
            ),
            Self::VersionMismatch { expected, actual } => write!(
                f,
                "BUS version mismatch, expected ({expected}), found ({actual})"
            ),
        }
    }
}

/// Trait for converting errors into `BusError::Process` variants.
///
/// # Examples
///
/// ```rust
/// use busio::{BusError, IntoBusError};
/// use std::fmt;
///
/// #[derive(Debug)]
/// struct CustomError(String);
///
/// impl fmt::Display for CustomError {
///     fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
///         write!(f, "Custom error: {}", self.0)
///     }
/// }
///
/// impl std::error::Error for CustomError {}
///
/// let bus_err = CustomError("something went wrong".to_string()).into_bus_error();
/// assert!(matches!(bus_err, BusError::Process(_)));
/// ```
pub trait IntoBusError {
    /// Converts the error into a `BusError`.
    fn into_bus_error(self) -> BusError;
}

impl<E> IntoBusError for E
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn into_bus_error(self) -> BusError {
        BusError::Process(self.into())
    }
}
