//! # busio - Reading and writing uncompressed BUS files
//!
//! `busio` is a Rust library for the BUS (Barcode-UMI-Set) binary format used by
//! kallisto and bustools to store barcoded single-cell sequencing records. It
//! parses the header, streams fixed-width records into a table grouped by cell
//! barcode, and writes that table back out.
//!
//! See the [BUS format](https://github.com/BUStools/BUS-format) for background.
//! The compressed `busz` variant is not supported.
//!
//! ## Format Specification
//!
//! All integers are little-endian.
//!
//! ### Header (20 bytes + text)
//! - Magic: `"BUS\0"`
//! - Version: format version (currently 1)
//! - Barcode length: length in bases
//! - UMI length: length in bases
//! - Text length: number of bytes of the text payload that follows
//! - Text: opaque payload (e.g. equivalence class metadata)
//!
//! ### Record (32 bytes)
//! - Barcode: `u64` with 2-bit encoding
//! - UMI: `u64` with 2-bit encoding
//! - Equivalence class: `u32`
//! - Count: `u32`
//! - Flag: `u32`
//! - Padding: `u32`, zero on write and ignored on read
//!
//! The record section has no length prefix; it ends at end of file.
//!
//! ## Basic Usage
//!
//! ```rust
//! use busio::{decode, encode, BusFile, Entry, Header, Record};
//! use std::io::Cursor;
//!
//! # fn main() -> busio::Result<()> {
//! let barcode = encode("ACGTACGTACGTACGT", 16)?;
//! let umi = encode("TTGGCCAATTGG", 12)?;
//!
//! let mut bus = BusFile::new(Header::new(16, 12));
//! bus.push(Record::new(barcode, umi, 0, 1, 0));
//! bus.push(Record::new(barcode, umi + 1, 3, 2, 0));
//!
//! let mut buffer = Vec::new();
//! bus.write_bytes(&mut buffer)?;
//!
//! let parsed = BusFile::from_bytes(&mut Cursor::new(buffer))?;
//! assert_eq!(parsed.header.bc_len, 16);
//! assert_eq!(parsed.num_barcodes(), 1);
//! assert_eq!(parsed.get(barcode).unwrap()[1], Entry::new(umi + 1, 3, 2, 0));
//! assert_eq!(decode(barcode, 16), "ACGTACGTACGTACGT");
//! # Ok(())
//! # }
//! ```
//!
//! ## Unrecognized files
//!
//! A file whose magic tag is not `"BUS\0"` is not an error: the header carries
//! [`Format::Unrecognized`] with the raw tag, the body is left unread and an
//! [`Advisory`] is recorded. Version mismatches are reported the same way.
//!
//! ```rust
//! use busio::{Advisory, BusFile, Format};
//! use std::io::Cursor;
//!
//! # fn main() -> busio::Result<()> {
//! let bus = BusFile::from_bytes(&mut Cursor::new(b"XXXX".to_vec()))?;
//! assert_eq!(bus.header.format, Format::Unrecognized(*b"XXXX"));
//! assert_eq!(bus.advisories(), &[Advisory::UnrecognizedFormat { magic: *b"XXXX" }]);
//! # Ok(())
//! # }
//! ```
//!
//! ## Parallel decoding
//!
//! ```rust,no_run
//! use busio::MmapReader;
//!
//! # fn main() -> busio::Result<()> {
//! let reader = MmapReader::new("output.bus")?;
//! let (records, n_entries) = reader.load_grouped(0)?; // 0 = all cores
//! println!("{} records across {} barcodes", n_entries, records.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - `serde` (default): `Serialize`/`Deserialize` for the data types
//! - `niffler` (default): transparent gzip/zstd/bzip2 decompression in
//!   [`Reader::from_path`] and [`Reader::from_stdin`]

mod constructs;
mod error;
mod io;
mod nucleotide;
mod parallel;

pub use constructs::{
    BusFile, Entry, Format, Header, Record, RecordMap, SortKey, HEADER_PREFIX_SIZE, MAGIC,
    RECORD_SIZE, VERSION,
};
pub use error::{Advisory, BusError, IntoBusError, Result};
pub use io::{
    load_to_vec, parse_body, parse_header, read_file, write_body, write_file, write_header,
    BoxedWriter, MmapReader, Reader, Writer,
};
pub use nucleotide::{decode, encode, encode_bytes, MAX_BASES};
pub use parallel::{ParallelProcessor, ParallelReader};
