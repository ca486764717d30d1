use std::io::{Read, Write};

use bytemuck::{Pod, Zeroable};

use crate::{Advisory, BusError};

pub const MAGIC: [u8; 4] = *b"BUS\0";
pub const VERSION: u32 = 1;
pub const HEADER_PREFIX_SIZE: usize = std::mem::size_of::<HeaderPrefix>();

/// Format identified by the 4-byte magic tag.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Format {
    /// `"BUS\0"` - uncompressed BUS
    #[default]
    Bus,
    /// Any other tag, kept verbatim
    Unrecognized([u8; 4]),
}
impl Format {
    pub fn from_magic(magic: [u8; 4]) -> Self {
        if magic == MAGIC {
            Self::Bus
        } else {
            Self::Unrecognized(magic)
        }
    }
    pub fn magic(&self) -> [u8; 4] {
        match self {
            Self::Bus => MAGIC,
            Self::Unrecognized(magic) => *magic,
        }
    }
    pub fn is_bus(&self) -> bool {
        matches!(self, Self::Bus)
    }
}

/// Fixed 20-byte prefix of the header (little-endian on disk)
#[derive(Copy, Clone, Pod, Zeroable, Debug, PartialEq, Eq)]
#[repr(C)]
struct HeaderPrefix {
    magic: [u8; 4],
    version: u32,
    bc_len: u32,
    umi_len: u32,
    text_len: u32,
}
impl HeaderPrefix {
    fn into_native(self) -> Self {
        Self {
            magic: self.magic,
            version: u32::from_le(self.version),
            bc_len: u32::from_le(self.bc_len),
            umi_len: u32::from_le(self.umi_len),
            text_len: u32::from_le(self.text_len),
        }
    }
    fn into_le(self) -> Self {
        Self {
            magic: self.magic,
            version: self.version.to_le(),
            bc_len: self.bc_len.to_le(),
            umi_len: self.umi_len.to_le(),
            text_len: self.text_len.to_le(),
        }
    }
}

/// BUS file header.
///
/// The text payload is opaque to this library (kallisto stores its
/// equivalence class metadata there). Its length is never stored separately:
/// it is always `text.len()` when written.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Header {
    pub format: Format,
    pub version: u32,
    pub bc_len: u32,  // Barcode length in bases
    pub umi_len: u32, // UMI length in bases
    pub text: Vec<u8>,
}
impl Header {
    pub fn new(bc_len: u32, umi_len: u32) -> Self {
        Self {
            format: Format::Bus,
            version: VERSION,
            bc_len,
            umi_len,
            text: Vec::new(),
        }
    }
    pub fn with_text(mut self, text: impl Into<Vec<u8>>) -> Self {
        self.text = text.into();
        self
    }

    /// Number of bytes this header occupies on disk.
    pub fn size(&self) -> usize {
        if self.format.is_bus() {
            HEADER_PREFIX_SIZE + self.text.len()
        } else {
            MAGIC.len()
        }
    }

    /// Non-fatal diagnostics for this header.
    pub fn advisories(&self) -> Vec<Advisory> {
        match self.format {
            Format::Unrecognized(magic) => vec![Advisory::UnrecognizedFormat { magic }],
            Format::Bus if self.version != VERSION => vec![Advisory::VersionMismatch {
                expected: VERSION,
                actual: self.version,
            }],
            Format::Bus => Vec::new(),
        }
    }

    /// Parses a header from the start of a stream.
    ///
    /// If the magic tag is not `"BUS\0"` only the 4 magic bytes are consumed and
    /// the returned header carries [`Format::Unrecognized`]. Callers must check
    /// [`Header::format`] before reading records.
    pub fn read_from<R: Read>(reader: &mut R) -> crate::Result<Self> {
        let mut prefix = HeaderPrefix::zeroed();
        let bytes = bytemuck::bytes_of_mut(&mut prefix);
        reader.read_exact(&mut bytes[..MAGIC.len()])?;

        let format = Format::from_magic(prefix.magic);
        if !format.is_bus() {
            log::warn!("{}", Advisory::UnrecognizedFormat { magic: prefix.magic });
            return Ok(Self {
                format,
                ..Self::default()
            });
        }
        reader.read_exact(&mut bytemuck::bytes_of_mut(&mut prefix)[MAGIC.len()..])?;
        let prefix = prefix.into_native();

        // grows with the bytes actually present, not the declared length
        let mut text = Vec::new();
        reader
            .by_ref()
            .take(u64::from(prefix.text_len))
            .read_to_end(&mut text)?;
        if text.len() != prefix.text_len as usize {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!(
                    "header text ended after {} of {} bytes",
                    text.len(),
                    prefix.text_len
                ),
            )
            .into());
        }

        let header = Self {
            format,
            version: prefix.version,
            bc_len: prefix.bc_len,
            umi_len: prefix.umi_len,
            text,
        };
        for advisory in header.advisories() {
            log::warn!("{}", advisory);
        }
        Ok(header)
    }

    /// Writes the header, always tagged `"BUS\0"`.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> crate::Result<()> {
        let text_len =
            u32::try_from(self.text.len()).map_err(|_| BusError::TextTooLong(self.text.len()))?;
        let prefix = HeaderPrefix {
            magic: MAGIC,
            version: self.version,
            bc_len: self.bc_len,
            umi_len: self.umi_len,
            text_len,
        }
        .into_le();
        writer.write_all(bytemuck::bytes_of(&prefix))?;
        writer.write_all(&self.text)?;
        Ok(())
    }

    pub fn to_bytes(&self) -> crate::Result<Vec<u8>> {
        let mut buffer = Vec::with_capacity(HEADER_PREFIX_SIZE + self.text.len());
        self.write_to(&mut buffer)?;
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn header_bytes(version: u32, bc_len: u32, umi_len: u32, text: &[u8]) -> Vec<u8> {
        let mut bytes = b"BUS\0".to_vec();
        for field in [version, bc_len, umi_len, text.len() as u32] {
            bytes.extend_from_slice(&field.to_le_bytes());
        }
        bytes.extend_from_slice(text);
        bytes
    }

    #[test]
    fn test_prefix_size() {
        assert_eq!(HEADER_PREFIX_SIZE, 20);
    }

    #[test]
    fn test_parse_minimal_header() {
        let bytes = header_bytes(1, 16, 12, b"");
        let header = Header::read_from(&mut Cursor::new(bytes)).unwrap();

        assert_eq!(header.format, Format::Bus);
        assert_eq!(header.version, 1);
        assert_eq!(header.bc_len, 16);
        assert_eq!(header.umi_len, 12);
        assert!(header.text.is_empty());
        assert!(header.advisories().is_empty());
    }

    #[test]
    fn test_parse_header_with_text() {
        let text = b"0\t1,2,3\n1\t4\n";
        let bytes = header_bytes(1, 16, 10, text);
        let mut cursor = Cursor::new(bytes);
        let header = Header::read_from(&mut cursor).unwrap();

        assert_eq!(header.text, text);
        assert_eq!(cursor.position() as usize, HEADER_PREFIX_SIZE + text.len());
        assert_eq!(header.size(), HEADER_PREFIX_SIZE + text.len());
    }

    #[test]
    fn test_parse_unrecognized_magic() {
        let mut bytes = b"XXXX".to_vec();
        bytes.extend_from_slice(&[1u8; 64]);
        let mut cursor = Cursor::new(bytes);
        let header = Header::read_from(&mut cursor).unwrap();

        assert_eq!(header.format, Format::Unrecognized(*b"XXXX"));
        assert_eq!(header.format.magic(), *b"XXXX");
        // nothing past the magic is consumed
        assert_eq!(cursor.position(), 4);
        assert_eq!(
            header.advisories(),
            vec![Advisory::UnrecognizedFormat { magic: *b"XXXX" }]
        );
    }

    #[test]
    fn test_version_mismatch_is_advisory() {
        let bytes = header_bytes(2, 16, 12, b"abc");
        let header = Header::read_from(&mut Cursor::new(bytes)).unwrap();

        assert_eq!(header.version, 2);
        assert_eq!(header.text, b"abc");
        assert_eq!(
            header.advisories(),
            vec![Advisory::VersionMismatch {
                expected: VERSION,
                actual: 2
            }]
        );
    }

    #[test]
    fn test_truncated_text_is_io_error() {
        let mut bytes = header_bytes(1, 16, 12, b"abcdef");
        bytes.truncate(bytes.len() - 2);
        let result = Header::read_from(&mut Cursor::new(bytes));
        assert!(matches!(result, Err(BusError::Io(_))));
    }

    #[test]
    fn test_oversized_text_len_is_io_error() {
        let mut bytes = header_bytes(1, 16, 12, b"");
        bytes[16..20].copy_from_slice(&u32::MAX.to_le_bytes());
        bytes.extend_from_slice(b"short");

        match Header::read_from(&mut Cursor::new(bytes)) {
            Err(BusError::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::UnexpectedEof),
            other => panic!("expected UnexpectedEof, got {:?}", other),
        }
    }

    #[test]
    fn test_write_layout() {
        let header = Header::new(16, 12).with_text("ec");
        let bytes = header.to_bytes().unwrap();
        assert_eq!(bytes, header_bytes(1, 16, 12, b"ec"));
    }

    #[test]
    fn test_write_recomputes_text_length() {
        let mut header = Header::new(16, 12).with_text(vec![7u8; 3]);
        header.text.extend_from_slice(&[8u8; 5]);
        let bytes = header.to_bytes().unwrap();

        assert_eq!(&bytes[16..20], &8u32.to_le_bytes());
        assert_eq!(bytes.len(), HEADER_PREFIX_SIZE + 8);
    }

    #[test]
    fn test_write_unrecognized_is_tagged_bus() {
        let header = Header {
            format: Format::Unrecognized(*b"XXXX"),
            ..Header::new(16, 12)
        };
        let bytes = header.to_bytes().unwrap();
        assert_eq!(&bytes[..4], b"BUS\0");
    }

    #[test]
    fn test_header_roundtrip() {
        let header = Header::new(20, 10).with_text(b"transcripts".to_vec());
        let bytes = header.to_bytes().unwrap();
        let parsed = Header::read_from(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(header, parsed);
    }
}
